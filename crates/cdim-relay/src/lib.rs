//! cdim-relay: WebSocket relay for two-person chat pairs.
//!
//! Clients join a pair by id, receive recent history and presence, and
//! exchange chat messages that are fanned out to everyone in the pair.
//! State lives in memory only.

pub mod connection;
pub mod health;
pub mod outbox;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use outbox::Outbox;
pub use protocol::{ChatMessage, ClientEvent, PresenceEntry, ServerEvent};
pub use registry::{HistoryLimits, PairLock, PairRegistry, PairSnapshot, PairState, Participant};
pub use server::RelayServer;
pub use session::{SessionCoordinator, SessionState};
