//! Per-connection protocol state machine.
//!
//! A session starts `Unjoined`, becomes `Joined` after a valid hello, and
//! ends `Closed` on disconnect. Every mutation of a pair happens while its
//! registry lock is held, together with the broadcast it triggers, so a
//! presence list can never lag behind membership.

use cdim_common::new_message_id;
use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::outbox::Outbox;
use crate::protocol::{
    parse_client_event, ChatMessage, ClientEvent, ServerEvent, IMAGE_PLACEHOLDER, IMAGE_PREFIX,
};
use crate::registry::{PairRegistry, PairState, Participant};

const ERR_IDS_REQUIRED: &str = "pairId and userId are required";
const ERR_NOT_JOINED: &str = "not joined";
const ERR_ALREADY_JOINED: &str = "already joined";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unjoined,
    Joined { pair_id: String, user_id: String },
    /// Disconnected; further input and disconnects are ignored.
    Closed,
}

/// Drives one client connection against the shared registry.
pub struct SessionCoordinator {
    registry: PairRegistry,
    outbox: Outbox,
    state: SessionState,
}

impl SessionCoordinator {
    pub fn new(registry: PairRegistry, outbox: Outbox) -> Self {
        Self {
            registry,
            outbox,
            state: SessionState::Unjoined,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_joined(&self) -> bool {
        matches!(self.state, SessionState::Joined { .. })
    }

    /// Handle one inbound text frame. Malformed input is logged and dropped.
    pub async fn handle_text(&mut self, raw: &str) {
        match parse_client_event(raw) {
            Ok(event) => self.dispatch(event).await,
            Err(e) => {
                warn!(
                    connection = %self.outbox.connection(),
                    error = %e,
                    "Ignoring malformed client event"
                );
            }
        }
    }

    pub async fn dispatch(&mut self, event: ClientEvent) {
        if matches!(self.state, SessionState::Closed) {
            debug!(connection = %self.outbox.connection(), "Event after close ignored");
            return;
        }

        match event {
            ClientEvent::Hello {
                pair_id,
                user_id,
                display_name,
            } => {
                if self.is_joined() {
                    self.reply(&ServerEvent::error(ERR_ALREADY_JOINED));
                } else {
                    self.join(pair_id, user_id, display_name).await;
                }
            }
            ClientEvent::Chat {
                text,
                image,
                client_msg_id,
            } => {
                let SessionState::Joined { pair_id, user_id } = self.state.clone() else {
                    self.reply(&ServerEvent::error(ERR_NOT_JOINED));
                    return;
                };
                self.chat(&pair_id, &user_id, text, image, client_msg_id)
                    .await;
            }
            ClientEvent::Unknown => {
                if self.is_joined() {
                    debug!(connection = %self.outbox.connection(), "Ignoring unknown event type");
                } else {
                    self.reply(&ServerEvent::error(ERR_NOT_JOINED));
                }
            }
        }
    }

    async fn join(
        &mut self,
        pair_id: Option<String>,
        user_id: Option<String>,
        display_name: Option<String>,
    ) {
        let pair_id = pair_id.unwrap_or_default().trim().to_string();
        let user_id = user_id.unwrap_or_default().trim().to_string();
        if pair_id.is_empty() || user_id.is_empty() {
            self.reply(&ServerEvent::error(ERR_IDS_REQUIRED));
            return;
        }
        let display_name = match display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => user_id.clone(),
        };

        let mut pair = self.registry.lock(&pair_id).await;
        let replaced = pair.add_participant(Participant {
            identifier: user_id.clone(),
            display_name,
            channel: self.outbox.clone(),
        });
        if let Some(previous) = replaced {
            info!(
                pair = %pair_id,
                user = %user_id,
                previous = %previous.channel.connection(),
                "Participant rejoined, replacing previous connection"
            );
        }
        self.state = SessionState::Joined {
            pair_id: pair_id.clone(),
            user_id: user_id.clone(),
        };

        let snapshot = pair.snapshot();
        info!(
            pair = %pair_id,
            user = %user_id,
            participants = snapshot.participants.len(),
            replay = snapshot.history.len(),
            "Participant joined"
        );

        self.reply(&ServerEvent::Welcome {
            pair_id: pair_id.clone(),
            user_id,
            history: snapshot.history,
            users: snapshot.participants.clone(),
        });
        broadcast(
            &pair,
            &ServerEvent::Presence {
                pair_id,
                users: snapshot.participants,
            },
        );
    }

    async fn chat(
        &self,
        pair_id: &str,
        user_id: &str,
        text: Option<String>,
        image: Option<String>,
        client_msg_id: Option<String>,
    ) {
        let text = text.as_deref().unwrap_or_default().trim();
        let image = image.filter(|data| data.starts_with(IMAGE_PREFIX));
        if text.is_empty() && image.is_none() {
            debug!(pair = %pair_id, user = %user_id, "Dropping empty chat");
            return;
        }

        let now = Utc::now();
        let message = ChatMessage {
            id: client_msg_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| new_message_id(now.timestamp_millis())),
            pair_id: pair_id.to_string(),
            from: user_id.to_string(),
            text: if text.is_empty() {
                IMAGE_PLACEHOLDER.to_string()
            } else {
                text.to_string()
            },
            time: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            image,
        };

        let mut pair = self.registry.lock(pair_id).await;
        pair.append_history(message.clone());
        let delivered = broadcast(&pair, &ServerEvent::Chat { message });
        debug!(pair = %pair_id, user = %user_id, delivered, "Chat relayed");
    }

    /// Tear down the session. Safe to call more than once.
    pub async fn disconnect(&mut self) {
        let previous = std::mem::replace(&mut self.state, SessionState::Closed);
        let SessionState::Joined { pair_id, user_id } = previous else {
            return;
        };
        let Some(mut pair) = self.registry.lock_existing(&pair_id).await else {
            return;
        };

        let owned = pair
            .participant(&user_id)
            .is_some_and(|p| p.channel.connection() == self.outbox.connection());
        if !owned {
            debug!(
                pair = %pair_id,
                user = %user_id,
                "Participant already superseded by a newer connection"
            );
            pair.release().await;
            return;
        }

        pair.remove_participant(&user_id);
        info!(pair = %pair_id, user = %user_id, "Participant left");

        if pair.is_vacant() {
            pair.release().await;
            info!(pair = %pair_id, "Pair removed");
        } else {
            broadcast(
                &pair,
                &ServerEvent::Presence {
                    pair_id: pair_id.clone(),
                    users: pair.presence(),
                },
            );
        }
    }

    fn reply(&self, event: &ServerEvent) {
        if let Some(payload) = encode(event) {
            self.outbox.send(&payload);
        }
    }
}

/// Send `event` to every open participant channel of the pair, in join
/// order. Returns how many channels accepted the frame.
pub fn broadcast(pair: &PairState, event: &ServerEvent) -> usize {
    let Some(payload) = encode(event) else {
        return 0;
    };
    pair.participants()
        .filter(|p| p.channel.is_open())
        .filter(|p| p.channel.send(&payload))
        .count()
}

fn encode(event: &ServerEvent) -> Option<String> {
    match event.encode() {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server event");
            None
        }
    }
}
