//! WebSocket transport for the chat coordinator.

pub mod chat;

pub use chat::chat_ws_handler;
