//! Chat module for Murmur.
//!
//! This module provides the shared group-chat state and its coordination:
//! - Participant registry with per-session attributes
//! - Bounded message history with author-only edit/delete
//! - Burst rate limiting with deferred decay
//! - Profanity masking
//! - Event fan-out to one, many, or all connections

mod coordinator;
mod event;
mod filter;
mod history;
mod participant;
mod rate_limit;

pub use coordinator::{BroadcastCoordinator, EventReceiver, EventSender, RATE_LIMIT_NOTICE};
pub use event::{
    ClientEvent, MessageEditRequest, MessageEdited, MessageRef, NicknameChange, NicknameUpdate,
    OutgoingMessage, Presence, ServerEvent, TypingState, UserInfo,
};
pub use filter::{ProfanityFilter, DEFAULT_DENYLIST, MASK_CHAR};
pub use history::{HistoryStore, Message, MessageId, DEFAULT_MAX_HISTORY};
pub use participant::{
    ConnectionId, Participant, ParticipantRegistry, ParticipantView, PUBLIC_ID_LENGTH,
};
pub use rate_limit::{RateLimitConfig, RateLimitResult, RateLimiter};
