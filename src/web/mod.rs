//! Web module for Murmur.
//!
//! This module provides the HTTP and WebSocket transport in front of the chat
//! coordinator: the `/ws` endpoint, read-only health and stats endpoints, and
//! optional static file serving.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;
pub mod ws;

pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
