use rand::Rng;
use std::fmt;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Server-side chat message id: `<unix-millis>_<0..1000>`.
///
/// Not collision-free. Two messages in the same millisecond share a
/// one-in-a-thousand chance of the same id.
pub fn new_message_id(unix_millis: i64) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("{unix_millis}_{suffix}")
}

/// Identifies one accepted transport connection for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(new_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
