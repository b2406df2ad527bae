//! Bounded in-memory message history.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Default number of messages kept in history.
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Client-supplied message identifier.
///
/// Clients may send either a string or an integer; integers are kept in their
/// decimal form so both spellings correlate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Create a message ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a server-side ID for messages that arrive without one.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Signed(n) => Self(n.to_string()),
            RawId::Unsigned(n) => Self(n.to_string()),
        })
    }
}

/// An accepted chat message with denormalized author fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Client-supplied ID.
    pub id: MessageId,
    /// Message text (filtered).
    pub text: String,
    /// Author's public ID at insert time.
    #[serde(rename = "userId")]
    pub author_id: String,
    /// Author's nickname at insert time.
    #[serde(rename = "nickname")]
    pub author_nickname: String,
    /// Author's color at insert time.
    #[serde(rename = "color")]
    pub author_color: String,
    /// When the message was accepted.
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// When the message was last edited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    /// Whether the message has been edited.
    pub edited: bool,
    /// Extra client fields passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// Wire field names owned by the server; client extras never carry these.
    pub const RESERVED_FIELDS: &'static [&'static str] = &[
        "id",
        "text",
        "userId",
        "nickname",
        "color",
        "timestamp",
        "editedAt",
        "edited",
    ];

    /// Check whether this message was written by the given participant.
    pub fn is_authored_by(&self, author_id: &str) -> bool {
        self.author_id == author_id
    }
}

/// Bounded, oldest-first message log.
#[derive(Debug)]
pub struct HistoryStore {
    messages: VecDeque<Message>,
    max_len: usize,
}

impl HistoryStore {
    /// Create a store holding at most `max_len` messages.
    ///
    /// A bound of zero is raised to one.
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            messages: VecDeque::with_capacity(max_len + 1),
            max_len,
        }
    }

    /// Maximum number of stored messages.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Append a message, evicting the oldest entries past the bound.
    pub fn append(&mut self, message: Message) {
        self.messages.push_back(message);
        while self.messages.len() > self.max_len {
            self.messages.pop_front();
        }
    }

    /// Find a message by ID written by the given author.
    pub fn find_by_id_and_author(&self, id: &MessageId, author_id: &str) -> Option<&Message> {
        self.messages
            .iter()
            .find(|m| &m.id == id && m.is_authored_by(author_id))
    }

    /// Remove a message by ID written by the given author.
    ///
    /// Returns true if a message was removed.
    pub fn remove_by_id_and_author(&mut self, id: &MessageId, author_id: &str) -> bool {
        match self.position(id, author_id) {
            Some(index) => self.messages.remove(index).is_some(),
            None => false,
        }
    }

    /// Overwrite the text of a message written by the given author.
    ///
    /// Returns the edited message, or None if no matching message exists.
    pub fn edit_by_id_and_author(
        &mut self,
        id: &MessageId,
        author_id: &str,
        new_text: impl Into<String>,
    ) -> Option<&Message> {
        let index = self.position(id, author_id)?;
        let message = &mut self.messages[index];
        message.text = new_text.into();
        message.edited = true;
        message.edited_at = Some(Utc::now());
        Some(message)
    }

    /// Copy of all messages, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn position(&self, id: &MessageId, author_id: &str) -> Option<usize> {
        self.messages
            .iter()
            .position(|m| &m.id == id && m.is_authored_by(author_id))
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}
