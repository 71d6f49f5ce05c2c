//! Send handle for one connection.
//!
//! The registry stores an `Outbox` per participant; the connection task
//! owns the matching receiver and writes each queued frame to its socket.

use cdim_common::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

#[derive(Debug, Clone)]
pub struct Outbox {
    connection: ConnectionId,
    tx: mpsc::Sender<String>,
}

impl Outbox {
    pub fn new(connection: ConnectionId, tx: mpsc::Sender<String>) -> Self {
        Self { connection, tx }
    }

    /// Create an outbox and the receiver the connection writer drains.
    pub fn channel(connection: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(connection, tx), rx)
    }

    pub fn connection(&self) -> &ConnectionId {
        &self.connection
    }

    /// False once the connection's writer has gone away.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a frame without waiting. Returns whether it was queued; a full
    /// or closed outbox drops the frame.
    pub fn send(&self, payload: &str) -> bool {
        match self.tx.try_send(payload.to_owned()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(connection = %self.connection, "Outbox full, dropping frame");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(connection = %self.connection, "Outbox closed, dropping frame");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_queues_frame() {
        let (outbox, mut rx) = Outbox::channel(ConnectionId::new(), 4);
        assert!(outbox.is_open());
        assert!(outbox.send("hello"));
        assert_eq!(rx.try_recv().unwrap(), "hello");
    }

    #[test]
    fn full_outbox_drops_frame() {
        let (outbox, mut rx) = Outbox::channel(ConnectionId::new(), 1);
        assert!(outbox.send("first"));
        assert!(!outbox.send("second"));
        assert_eq!(rx.try_recv().unwrap(), "first");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_outbox_reports_not_open() {
        let (outbox, rx) = Outbox::channel(ConnectionId::new(), 4);
        drop(rx);
        assert!(!outbox.is_open());
        assert!(!outbox.send("lost"));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let (outbox, mut rx) = Outbox::channel(ConnectionId::new(), 0);
        assert!(outbox.send("ok"));
        assert_eq!(rx.try_recv().unwrap(), "ok");
    }
}
