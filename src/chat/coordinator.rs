//! Session and message-state coordination.
//!
//! The coordinator owns every piece of shared chat state behind a single
//! mutex. Each operation takes the lock, mutates, and pushes the resulting
//! events into the per-connection outboxes before releasing it, so all
//! connections observe events in the same order the state changed.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};

use super::event::{
    ClientEvent, MessageEditRequest, MessageEdited, NicknameUpdate, OutgoingMessage, Presence,
    ServerEvent, TypingState, UserInfo,
};
use super::filter::ProfanityFilter;
use super::history::{HistoryStore, Message, MessageId};
use super::participant::{ConnectionId, Participant, ParticipantRegistry};
use super::rate_limit::{RateLimitConfig, RateLimitResult, RateLimiter};
use crate::config::ChatConfig;
use crate::Result;

/// Notice sent to a participant whose message was rate limited.
pub const RATE_LIMIT_NOTICE: &str = "You are sending messages too quickly. Please slow down.";

/// Sending half of a connection's outbound event queue.
pub type EventSender = mpsc::Sender<ServerEvent>;

/// Receiving half of a connection's outbound event queue.
pub type EventReceiver = mpsc::Receiver<ServerEvent>;

/// State guarded by the coordinator lock.
#[derive(Debug)]
pub(crate) struct RelayState {
    pub(crate) registry: ParticipantRegistry,
    pub(crate) history: HistoryStore,
    outboxes: HashMap<ConnectionId, EventSender>,
}

impl RelayState {
    pub(crate) fn new(max_history: usize) -> Self {
        Self {
            registry: ParticipantRegistry::new(),
            history: HistoryStore::new(max_history),
            outboxes: HashMap::new(),
        }
    }

    fn send_to(&self, connection: ConnectionId, event: ServerEvent) {
        if let Some(outbox) = self.outboxes.get(&connection) {
            deliver(connection, outbox, event);
        }
    }

    fn broadcast(&self, event: ServerEvent) {
        for (connection, outbox) in &self.outboxes {
            deliver(*connection, outbox, event.clone());
        }
    }

    fn broadcast_except(&self, excluded: ConnectionId, event: ServerEvent) {
        for (connection, outbox) in &self.outboxes {
            if *connection != excluded {
                deliver(*connection, outbox, event.clone());
            }
        }
    }
}

/// Queue an event without waiting; events for a full outbox are dropped.
fn deliver(connection: ConnectionId, outbox: &EventSender, event: ServerEvent) {
    match outbox.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            tracing::warn!(%connection, event = event.name(), "Outbox full, dropping event");
        }
        // The socket is shutting down; disconnect will clean it up.
        Err(TrySendError::Closed(_)) => {}
    }
}

/// Validation limits applied to inbound events.
#[derive(Debug, Clone, Copy)]
struct Limits {
    max_nickname_length: usize,
    max_message_length: usize,
    outbox_capacity: usize,
}

/// Coordinates connection lifecycle and chat events.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct BroadcastCoordinator {
    state: Arc<Mutex<RelayState>>,
    filter: Arc<ProfanityFilter>,
    limiter: RateLimiter,
    limits: Limits,
}

impl BroadcastCoordinator {
    /// Create a coordinator from chat configuration.
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(RelayState::new(config.max_history))),
            filter: Arc::new(ProfanityFilter::new(config.denylist.iter().cloned())),
            limiter: RateLimiter::new(RateLimitConfig::new(
                config.rate_limit_threshold,
                config.rate_limit_decay_secs,
            )),
            limits: Limits {
                max_nickname_length: config.max_nickname_length,
                max_message_length: config.max_message_length,
                outbox_capacity: config.outbox_capacity.max(1),
            },
        }
    }

    /// Replace the rate limiter configuration.
    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.limiter = RateLimiter::new(config);
        self
    }

    /// Create the bounded event queue for a new connection.
    pub fn outbox(&self) -> (EventSender, EventReceiver) {
        mpsc::channel(self.limits.outbox_capacity)
    }

    /// Register a new connection.
    ///
    /// Sends the participant its identity and the current history, then
    /// announces the join to everyone else.
    pub async fn connect(
        &self,
        connection: ConnectionId,
        outbox: EventSender,
    ) -> Result<Participant> {
        let mut state = self.state.lock().await;
        let participant = state.registry.add(connection)?;
        state.outboxes.insert(connection, outbox);

        state.send_to(
            connection,
            ServerEvent::UserInfo(UserInfo {
                id: participant.public_id.clone(),
                color: participant.display_color.clone(),
                nickname: participant.nickname.clone(),
            }),
        );
        state.send_to(
            connection,
            ServerEvent::MessageHistory(state.history.snapshot()),
        );
        state.broadcast(ServerEvent::UserCount(state.registry.count()));
        state.broadcast_except(
            connection,
            ServerEvent::UserJoined(Presence {
                id: participant.public_id.clone(),
                nickname: participant.nickname.clone(),
            }),
        );

        tracing::info!(
            %connection,
            user_id = %participant.public_id,
            nickname = %participant.nickname,
            online = state.registry.count(),
            "Participant connected"
        );
        Ok(participant)
    }

    /// Unregister a connection. Repeated calls are no-ops.
    pub async fn disconnect(&self, connection: ConnectionId) {
        let mut state = self.state.lock().await;
        state.outboxes.remove(&connection);
        let Some(participant) = state.registry.remove(connection) else {
            return;
        };

        state.broadcast_except(
            connection,
            ServerEvent::UserLeft(Presence {
                id: participant.public_id.clone(),
                nickname: participant.nickname.clone(),
            }),
        );
        state.broadcast(ServerEvent::UserCount(state.registry.count()));

        tracing::info!(
            %connection,
            user_id = %participant.public_id,
            online = state.registry.count(),
            "Participant disconnected"
        );
    }

    /// Handle one inbound event.
    ///
    /// A panic inside a handler is logged and swallowed so it cannot take down
    /// the connection or other sessions.
    pub async fn handle(&self, connection: ConnectionId, event: ClientEvent) {
        self.run_isolated(connection, self.dispatch(connection, event)).await;
    }

    async fn run_isolated<F>(&self, connection: ConnectionId, handler: F)
    where
        F: Future<Output = ()>,
    {
        let result = AssertUnwindSafe(handler).catch_unwind().await;
        if let Err(panic) = result {
            tracing::error!(
                %connection,
                panic = %panic_message(&*panic),
                "Event handler panicked"
            );
        }
    }

    async fn dispatch(&self, connection: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::UserMessage(message) => self.send_message(connection, message).await,
            ClientEvent::TypingStart => self.set_typing(connection, true).await,
            ClientEvent::TypingStop => self.set_typing(connection, false).await,
            ClientEvent::ChangeNickname(change) => {
                self.change_nickname(connection, &change.new_nickname).await
            }
            ClientEvent::DeleteMessage(target) => {
                self.delete_message(connection, &target.message_id).await
            }
            ClientEvent::EditMessage(request) => self.edit_message(connection, request).await,
            ClientEvent::RequestUserList => self.request_user_list(connection).await,
            ClientEvent::Ping => self.ping(connection).await,
        }
    }

    /// Accept a chat message and relay it to everyone but the sender.
    pub async fn send_message(&self, connection: ConnectionId, message: OutgoingMessage) {
        let mut state = self.state.lock().await;
        let Some(participant) = state.registry.get_mut(connection) else {
            return;
        };

        if !self.is_valid_text(&message.text) {
            tracing::debug!(%connection, "Dropping empty or oversized message");
            return;
        }

        let attempt = self.limiter.record_attempt(participant);
        self.limiter.schedule_decay(&self.state, connection);
        if let RateLimitResult::Limited { burst_count } = attempt {
            tracing::debug!(%connection, burst_count, "Message rate limited");
            state.send_to(
                connection,
                ServerEvent::RateLimited(RATE_LIMIT_NOTICE.to_string()),
            );
            return;
        }

        let mut extra = message.extra;
        extra.retain(|field, _| !Message::RESERVED_FIELDS.contains(&field.as_str()));

        let message = Message {
            id: message.id.unwrap_or_else(MessageId::generate),
            text: self.filter.filter(&message.text),
            author_id: participant.public_id.clone(),
            author_nickname: participant.nickname.clone(),
            author_color: participant.display_color.clone(),
            created_at: Utc::now(),
            edited_at: None,
            edited: false,
            extra,
        };

        state.history.append(message.clone());
        state.broadcast_except(connection, ServerEvent::Message(message));
    }

    /// Update typing state, announcing only actual transitions.
    pub async fn set_typing(&self, connection: ConnectionId, typing: bool) {
        let mut state = self.state.lock().await;
        let Some(participant) = state.registry.get_mut(connection) else {
            return;
        };
        if participant.is_typing == typing {
            return;
        }
        participant.is_typing = typing;

        let payload = TypingState {
            user_id: participant.public_id.clone(),
            nickname: participant.nickname.clone(),
        };
        let event = if typing {
            ServerEvent::UserTypingStart(payload)
        } else {
            ServerEvent::UserTypingStop(payload)
        };
        state.broadcast_except(connection, event);
    }

    /// Change a participant's nickname.
    pub async fn change_nickname(&self, connection: ConnectionId, requested: &str) {
        let mut state = self.state.lock().await;
        let Some(participant) = state.registry.get_mut(connection) else {
            return;
        };

        let length = requested.chars().count();
        if length == 0 || length > self.limits.max_nickname_length {
            tracing::debug!(%connection, length, "Rejected nickname change");
            return;
        }
        let nickname = self.filter.filter(requested).trim().to_string();
        if nickname.is_empty() {
            return;
        }

        let old_nickname = std::mem::replace(&mut participant.nickname, nickname.clone());
        let user_id = participant.public_id.clone();

        state.send_to(connection, ServerEvent::NicknameChanged(nickname.clone()));
        state.broadcast_except(
            connection,
            ServerEvent::NicknameUpdate(NicknameUpdate {
                user_id,
                old_nickname,
                new_nickname: nickname,
            }),
        );
    }

    /// Delete a message written by this participant.
    pub async fn delete_message(&self, connection: ConnectionId, message_id: &MessageId) {
        let mut state = self.state.lock().await;
        let Some(author_id) = state
            .registry
            .get(connection)
            .map(|p| p.public_id.clone())
        else {
            return;
        };

        if state.history.remove_by_id_and_author(message_id, &author_id) {
            state.broadcast(ServerEvent::MessageDeleted(message_id.clone()));
        } else {
            tracing::debug!(%connection, %message_id, "Delete did not match an own message");
        }
    }

    /// Edit a message written by this participant.
    pub async fn edit_message(&self, connection: ConnectionId, request: MessageEditRequest) {
        let mut state = self.state.lock().await;
        let Some(author_id) = state
            .registry
            .get(connection)
            .map(|p| p.public_id.clone())
        else {
            return;
        };

        if !self.is_valid_text(&request.new_text) {
            return;
        }

        let new_text = self.filter.filter(&request.new_text);
        let edited = state
            .history
            .edit_by_id_and_author(&request.message_id, &author_id, new_text)
            .map(|m| MessageEdited {
                message_id: m.id.clone(),
                new_text: m.text.clone(),
                edited: m.edited,
            });

        match edited {
            Some(edited) => state.broadcast(ServerEvent::MessageEdited(edited)),
            None => tracing::debug!(
                %connection,
                message_id = %request.message_id,
                "Edit did not match an own message"
            ),
        }
    }

    /// Send the presence list to the requesting connection.
    pub async fn request_user_list(&self, connection: ConnectionId) {
        let state = self.state.lock().await;
        state.send_to(connection, ServerEvent::UserList(state.registry.list_snapshot()));
    }

    /// Answer a liveness probe.
    pub async fn ping(&self, connection: ConnectionId) {
        self.state.lock().await.send_to(connection, ServerEvent::Pong);
    }

    /// Number of connected participants.
    pub async fn participant_count(&self) -> usize {
        self.state.lock().await.registry.count()
    }

    /// Number of messages in history.
    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }

    /// Copy of the current history, oldest first.
    pub async fn history_snapshot(&self) -> Vec<Message> {
        self.state.lock().await.history.snapshot()
    }

    /// Look up a participant by connection.
    pub async fn participant(&self, connection: ConnectionId) -> Option<Participant> {
        self.state.lock().await.registry.get(connection).cloned()
    }

    fn is_valid_text(&self, text: &str) -> bool {
        !text.trim().is_empty() && text.chars().count() <= self.limits.max_message_length
    }
}

impl Default for BroadcastCoordinator {
    fn default() -> Self {
        Self::new(&ChatConfig::default())
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
