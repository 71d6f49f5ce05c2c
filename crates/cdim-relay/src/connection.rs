//! Per-connection handler: pump frames between the socket and the session.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket};
use cdim_common::ConnectionId;
use futures_util::{SinkExt, StreamExt};

use crate::outbox::Outbox;
use crate::registry::PairRegistry;
use crate::session::SessionCoordinator;

/// Handle a single WebSocket connection until either side closes it.
pub async fn handle_connection(
    socket: WebSocket,
    addr: SocketAddr,
    registry: PairRegistry,
    outbox_capacity: usize,
) {
    let connection = ConnectionId::new();
    let (outbox, mut rx) = Outbox::channel(connection.clone(), outbox_capacity);
    let mut session = SessionCoordinator::new(registry, outbox);
    let (mut sink, mut stream) = socket.split();

    tracing::info!(peer = %addr, connection = %connection, "Client connected");

    loop {
        tokio::select! {
            // Frames queued for this client → its WebSocket
            Some(frame) = rx.recv() => {
                if sink.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }

            // Frames from this client → the session
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        session.handle_text(text.as_str()).await;
                    }
                    Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                        Ok(text) => session.handle_text(text).await,
                        Err(_) => {
                            tracing::warn!(connection = %connection, "Ignoring non-UTF-8 binary frame");
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    session.disconnect().await;
    tracing::info!(peer = %addr, connection = %connection, "Client disconnected");
}
