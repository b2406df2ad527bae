//! Events exchanged between a connection and the coordinator.
//!
//! On the wire every event is a JSON object `{"event": "<name>", "data": ...}`;
//! payload-less events omit `data`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::history::{Message, MessageId};
use super::participant::ParticipantView;

/// Events sent from a connection to the coordinator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Send a chat message.
    UserMessage(OutgoingMessage),
    /// Started typing.
    TypingStart,
    /// Stopped typing.
    TypingStop,
    /// Change own nickname.
    ChangeNickname(NicknameChange),
    /// Delete an own message.
    DeleteMessage(MessageRef),
    /// Edit an own message.
    EditMessage(MessageEditRequest),
    /// Ask for the presence list.
    RequestUserList,
    /// Liveness probe.
    Ping,
}

/// Payload of `user-message`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutgoingMessage {
    /// Client-chosen ID used for later edits and deletes.
    #[serde(default)]
    pub id: Option<MessageId>,
    /// Message text.
    pub text: String,
    /// Any other fields the client attached.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of `change-nickname`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NicknameChange {
    /// Requested nickname.
    pub new_nickname: String,
}

/// Payload of `delete-message`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    /// Target message.
    pub message_id: MessageId,
}

/// Payload of `edit-message`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEditRequest {
    /// Target message.
    pub message_id: MessageId,
    /// Replacement text.
    pub new_text: String,
}

/// Events sent from the coordinator to connections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Own identity, sent on connect.
    UserInfo(UserInfo),
    /// Current history, sent on connect.
    MessageHistory(Vec<Message>),
    /// Number of connected participants.
    UserCount(usize),
    /// Another participant joined.
    UserJoined(Presence),
    /// Another participant left.
    UserLeft(Presence),
    /// Chat message from another participant.
    Message(Message),
    /// Own message was rejected by the rate limiter.
    RateLimited(String),
    /// Another participant started typing.
    UserTypingStart(TypingState),
    /// Another participant stopped typing.
    UserTypingStop(TypingState),
    /// Own nickname change was accepted.
    NicknameChanged(String),
    /// Another participant changed nickname.
    NicknameUpdate(NicknameUpdate),
    /// A message was deleted.
    MessageDeleted(MessageId),
    /// A message was edited.
    MessageEdited(MessageEdited),
    /// Presence list.
    UserList(Vec<ParticipantView>),
    /// Reply to `ping`.
    Pong,
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::UserInfo(_) => "user-info",
            ServerEvent::MessageHistory(_) => "message-history",
            ServerEvent::UserCount(_) => "user-count",
            ServerEvent::UserJoined(_) => "user-joined",
            ServerEvent::UserLeft(_) => "user-left",
            ServerEvent::Message(_) => "message",
            ServerEvent::RateLimited(_) => "rate-limited",
            ServerEvent::UserTypingStart(_) => "user-typing-start",
            ServerEvent::UserTypingStop(_) => "user-typing-stop",
            ServerEvent::NicknameChanged(_) => "nickname-changed",
            ServerEvent::NicknameUpdate(_) => "nickname-update",
            ServerEvent::MessageDeleted(_) => "message-deleted",
            ServerEvent::MessageEdited(_) => "message-edited",
            ServerEvent::UserList(_) => "user-list",
            ServerEvent::Pong => "pong",
        }
    }
}

/// Payload of `user-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    /// Public ID.
    pub id: String,
    /// Display color.
    pub color: String,
    /// Nickname.
    pub nickname: String,
}

/// Payload of `user-joined` and `user-left`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presence {
    /// Public ID.
    pub id: String,
    /// Nickname.
    pub nickname: String,
}

/// Payload of the typing events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingState {
    /// Public ID of the typist.
    pub user_id: String,
    /// Nickname of the typist.
    pub nickname: String,
}

/// Payload of `nickname-update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NicknameUpdate {
    /// Public ID.
    pub user_id: String,
    /// Previous nickname.
    pub old_nickname: String,
    /// New nickname.
    pub new_nickname: String,
}

/// Payload of `message-edited`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEdited {
    /// Edited message.
    pub message_id: MessageId,
    /// Replacement text after filtering.
    pub new_text: String,
    /// Always true.
    pub edited: bool,
}
