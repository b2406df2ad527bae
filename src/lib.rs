//! Murmur - real-time group chat relay.
//!
//! Clients connect over WebSocket, exchange short text messages, and observe
//! presence and typing state of everyone else connected.

pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod web;

pub use chat::{
    BroadcastCoordinator, ClientEvent, ConnectionId, HistoryStore, Message, MessageId,
    Participant, ParticipantRegistry, ProfanityFilter, RateLimiter, ServerEvent,
};
pub use config::Config;
pub use error::{MurmurError, Result};
pub use web::WebServer;
