//! Connected participants and their per-session attributes.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::{MurmurError, Result};

/// Length of a generated public ID.
pub const PUBLIC_ID_LENGTH: usize = 9;

/// Alphabet for public IDs (lowercase base 36).
const PUBLIC_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Prefix of generated default nicknames.
const DEFAULT_NICKNAME_PREFIX: &str = "User";

/// Saturation and lightness of generated display colors.
const COLOR_SATURATION: u8 = 70;
const COLOR_LIGHTNESS: u8 = 60;

/// Opaque handle identifying one transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a fresh, unique connection handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
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

/// Server-side record of one live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Transport connection handle.
    pub connection_id: ConnectionId,
    /// Identifier exposed to other participants.
    pub public_id: String,
    /// CSS color used to render this participant.
    pub display_color: String,
    /// Current nickname.
    pub nickname: String,
    /// When the participant connected.
    pub joined_at: DateTime<Utc>,
    /// Recent message attempts not yet decayed.
    pub message_burst_count: u32,
    /// Whether the participant is currently typing.
    pub is_typing: bool,
}

impl Participant {
    /// Snapshot of the fields shown in presence listings.
    pub fn view(&self) -> ParticipantView {
        ParticipantView {
            id: self.public_id.clone(),
            nickname: self.nickname.clone(),
            color: self.display_color.clone(),
            is_typing: self.is_typing,
        }
    }
}

/// Immutable presence view of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    /// Public ID.
    pub id: String,
    /// Nickname.
    pub nickname: String,
    /// Display color.
    pub color: String,
    /// Typing flag.
    pub is_typing: bool,
}

/// Mapping from connection handle to participant.
///
/// The registry itself performs no locking; the coordinator keeps it behind
/// its single state mutex.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: HashMap<ConnectionId, Participant>,
    /// Connection handles in join order.
    order: Vec<ConnectionId>,
}

impl ParticipantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection with freshly generated identity attributes.
    pub fn add(&mut self, connection_id: ConnectionId) -> Result<Participant> {
        if self.participants.contains_key(&connection_id) {
            return Err(MurmurError::DuplicateConnection(connection_id));
        }

        let mut rng = rand::rng();
        let mut public_id = generate_public_id(&mut rng);
        while self.participants.values().any(|p| p.public_id == public_id) {
            public_id = generate_public_id(&mut rng);
        }

        let participant = Participant {
            connection_id,
            public_id,
            display_color: generate_color(&mut rng),
            nickname: format!("{DEFAULT_NICKNAME_PREFIX}{}", rng.random_range(0..10_000)),
            joined_at: Utc::now(),
            message_burst_count: 0,
            is_typing: false,
        };

        self.participants.insert(connection_id, participant.clone());
        self.order.push(connection_id);
        Ok(participant)
    }

    /// Get a participant by connection handle.
    pub fn get(&self, connection_id: ConnectionId) -> Option<&Participant> {
        self.participants.get(&connection_id)
    }

    /// Get a mutable participant by connection handle.
    pub fn get_mut(&mut self, connection_id: ConnectionId) -> Option<&mut Participant> {
        self.participants.get_mut(&connection_id)
    }

    /// Remove a participant.
    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<Participant> {
        let removed = self.participants.remove(&connection_id)?;
        self.order.retain(|id| *id != connection_id);
        Some(removed)
    }

    /// Presence views in join order.
    pub fn list_snapshot(&self) -> Vec<ParticipantView> {
        self.order
            .iter()
            .filter_map(|id| self.participants.get(id))
            .map(Participant::view)
            .collect()
    }

    /// Number of registered participants.
    pub fn count(&self) -> usize {
        self.participants.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

fn generate_public_id<R: Rng>(rng: &mut R) -> String {
    (0..PUBLIC_ID_LENGTH)
        .map(|_| PUBLIC_ID_ALPHABET[rng.random_range(0..PUBLIC_ID_ALPHABET.len())] as char)
        .collect()
}

fn generate_color<R: Rng>(rng: &mut R) -> String {
    let hue: u16 = rng.random_range(0..360);
    format!("hsl({hue}, {COLOR_SATURATION}%, {COLOR_LIGHTNESS}%)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_generates_identity() {
        let mut registry = ParticipantRegistry::new();
        let conn = ConnectionId::new();
        let p = registry.add(conn).unwrap();

        assert_eq!(p.connection_id, conn);
        assert_eq!(p.public_id.len(), PUBLIC_ID_LENGTH);
        assert!(p
            .public_id
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
        assert!(p.display_color.starts_with("hsl("));
        assert!(p.display_color.ends_with(", 70%, 60%)"));
        assert_eq!(p.message_burst_count, 0);
        assert!(!p.is_typing);
    }

    #[test]
    fn test_default_nickname_format() {
        let mut registry = ParticipantRegistry::new();
        let p = registry.add(ConnectionId::new()).unwrap();

        let suffix = p.nickname.strip_prefix("User").unwrap();
        let n: u32 = suffix.parse().unwrap();
        assert!(n < 10_000);
    }

    #[test]
    fn test_color_hue_in_range() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let color = generate_color(&mut rng);
            let hue: u16 = color
                .trim_start_matches("hsl(")
                .split(',')
                .next()
                .unwrap()
                .parse()
                .unwrap();
            assert!(hue < 360);
        }
    }

    #[test]
    fn test_add_duplicate_fails() {
        let mut registry = ParticipantRegistry::new();
        let conn = ConnectionId::new();
        registry.add(conn).unwrap();

        let result = registry.add(conn);
        assert!(matches!(result, Err(MurmurError::DuplicateConnection(id)) if id == conn));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_get_and_remove() {
        let mut registry = ParticipantRegistry::new();
        let conn = ConnectionId::new();
        let added = registry.add(conn).unwrap();

        assert_eq!(registry.get(conn), Some(&added));

        let removed = registry.remove(conn).unwrap();
        assert_eq!(removed.public_id, added.public_id);
        assert!(registry.get(conn).is_none());
        assert!(registry.remove(conn).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_get_unknown_is_absent() {
        let registry = ParticipantRegistry::new();
        assert!(registry.get(ConnectionId::new()).is_none());
    }

    #[test]
    fn test_get_mut_updates_participant() {
        let mut registry = ParticipantRegistry::new();
        let conn = ConnectionId::new();
        registry.add(conn).unwrap();

        registry.get_mut(conn).unwrap().nickname = "Alice".to_string();
        assert_eq!(registry.get(conn).unwrap().nickname, "Alice");
    }

    #[test]
    fn test_list_snapshot_in_join_order() {
        let mut registry = ParticipantRegistry::new();
        let a = registry.add(ConnectionId::new()).unwrap();
        let b = registry.add(ConnectionId::new()).unwrap();
        let c = registry.add(ConnectionId::new()).unwrap();
        registry.remove(b.connection_id);

        let list = registry.list_snapshot();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, a.public_id);
        assert_eq!(list[1].id, c.public_id);
    }

    #[test]
    fn test_list_snapshot_does_not_alias() {
        let mut registry = ParticipantRegistry::new();
        let conn = ConnectionId::new();
        registry.add(conn).unwrap();

        let before = registry.list_snapshot();
        registry.get_mut(conn).unwrap().is_typing = true;

        assert!(!before[0].is_typing);
        assert!(registry.list_snapshot()[0].is_typing);
    }

    #[test]
    fn test_public_ids_unique() {
        let mut registry = ParticipantRegistry::new();
        for _ in 0..100 {
            registry.add(ConnectionId::new()).unwrap();
        }
        let mut ids: Vec<_> = registry.list_snapshot().into_iter().map(|v| v.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 100);
        assert_eq!(registry.count(), 100);
    }

    #[test]
    fn test_participant_view_serialize() {
        let view = ParticipantView {
            id: "abc123xyz".to_string(),
            nickname: "Alice".to_string(),
            color: "hsl(10, 70%, 60%)".to_string(),
            is_typing: true,
        };
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"isTyping\":true"));
        assert!(json.contains("\"nickname\":\"Alice\""));
    }
}
