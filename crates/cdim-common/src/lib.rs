pub mod errors;
pub mod id;

pub use errors::{ConfigError, RelayError};
pub use id::{new_id, new_message_id, ConnectionId};

pub type Result<T> = std::result::Result<T, RelayError>;
