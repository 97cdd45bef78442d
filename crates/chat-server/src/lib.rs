//! chat-server
//!
//! Multi-client async TCP server for the group chat.

pub mod config;
pub mod types;
pub mod backend;
pub mod hub;
pub mod server;

// internal, not re-exported
mod client;
