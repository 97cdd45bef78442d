//! chat-protocol
//!
//! Wire-level encoding/decoding for the chat server.
//!
//! This crate turns logical chat events
//! (`chat_core::InboundEvent` / `OutboundEvent`) into text lines and
//! back again.
//!
//! - [`line_codec`] : one event per `\n`-terminated line (netcat friendly)

pub mod line_codec;

pub use line_codec::{
    format_input_line,
    format_output_line,
    parse_input_line,
    parse_output_line,
};
