//! Middleware for the web transport.

pub mod cors;

pub use cors::create_cors_layer;
