//! Line codec.
//!
//! Every event is one UTF-8 line. Fields are separated by `,` and
//! trimmed. The last field of each event takes the rest of the line, so
//! message text may contain commas; names and group names may not.
//! Tags are matched case-insensitively.
//!
//! Input format (client → server, line → `InboundEvent`):
//!
//! - Join / rename:
//!   `J, name` or `J, name, group`
//!
//! - Broadcast to own group:
//!   `M, text`
//!
//! - Direct message:
//!   `D, targetName, text`
//!
//! - Reconnected notice:
//!   `R`
//!
//! - Leave:
//!   `X`
//!
//! Output format (server → client, `OutboundEvent` → line):
//!
//! - Notification:
//!   `N, text`
//!
//! - Message:
//!   `M, fromName, text`
//!
//! - Rejected request:
//!   `E, reason`

use chat_core::{InboundEvent, OutboundEvent};

/// Parse a single line into an `InboundEvent`.
///
/// Returns `None` for blank lines, comments (starting with `#`) and
/// anything malformed.
pub fn parse_input_line(line: &str) -> Option<InboundEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let tag = tag_of(trimmed);
    match tag.to_ascii_uppercase().as_str() {
        "J" => parse_join(trimmed),
        "M" => {
            let tokens = split_fields(trimmed, 2);
            match tokens.as_slice() {
                [_, text] => Some(InboundEvent::Broadcast {
                    text: text.to_string(),
                }),
                _ => None,
            }
        }
        "D" => {
            let tokens = split_fields(trimmed, 3);
            match tokens.as_slice() {
                [_, target, text] => Some(InboundEvent::Direct {
                    target: target.to_string(),
                    text: text.to_string(),
                }),
                _ => None,
            }
        }
        "R" if trimmed.len() == tag.len() => Some(InboundEvent::Reconnect),
        "X" if trimmed.len() == tag.len() => Some(InboundEvent::Disconnect),
        _ => None,
    }
}

fn parse_join(line: &str) -> Option<InboundEvent> {
    // J, name[, group]
    let tokens = split_fields(line, 3);
    match tokens.as_slice() {
        [_, name] => Some(InboundEvent::Join {
            name: name.to_string(),
            group: None,
        }),
        [_, name, group] => Some(InboundEvent::Join {
            name: name.to_string(),
            group: Some(group.to_string()),
        }),
        _ => None,
    }
}

/// Format an `InboundEvent` as a line (without the trailing newline).
pub fn format_input_line(event: &InboundEvent) -> String {
    match event {
        InboundEvent::Join { name, group: None } => format!("J, {}", name),
        InboundEvent::Join {
            name,
            group: Some(group),
        } => format!("J, {}, {}", name, group),
        InboundEvent::Broadcast { text } => format!("M, {}", text),
        InboundEvent::Direct { target, text } => format!("D, {}, {}", target, text),
        InboundEvent::Reconnect => "R".to_string(),
        InboundEvent::Disconnect => "X".to_string(),
    }
}

/// Format an `OutboundEvent` as a line (without the trailing newline).
pub fn format_output_line(event: &OutboundEvent) -> String {
    match event {
        OutboundEvent::Notification { text } => format!("N, {}", text),
        OutboundEvent::Message { from, text } => format!("M, {}, {}", from, text),
        OutboundEvent::Rejected { reason } => format!("E, {}", reason),
    }
}

/// Parse a server line back into an `OutboundEvent` (client side).
pub fn parse_output_line(line: &str) -> Option<OutboundEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    match tag_of(trimmed).to_ascii_uppercase().as_str() {
        "N" => match split_fields(trimmed, 2).as_slice() {
            [_, text] => Some(OutboundEvent::notification(*text)),
            _ => None,
        },
        "M" => match split_fields(trimmed, 3).as_slice() {
            [_, from, text] => Some(OutboundEvent::message(*from, *text)),
            _ => None,
        },
        "E" => match split_fields(trimmed, 2).as_slice() {
            [_, reason] => Some(OutboundEvent::rejected(*reason)),
            _ => None,
        },
        _ => None,
    }
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn tag_of(line: &str) -> &str {
    line.split(',').next().unwrap_or("").trim()
}

/// Split into at most `max_fields` trimmed fields; the last keeps any
/// further commas.
fn split_fields(s: &str, max_fields: usize) -> Vec<&str> {
    s.splitn(max_fields, ',').map(str::trim).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_join_with_and_without_group() {
        assert_eq!(
            parse_input_line("J, Alice"),
            Some(InboundEvent::Join {
                name: "Alice".to_string(),
                group: None
            })
        );
        assert_eq!(
            parse_input_line("j,Alice , Rust Fans"),
            Some(InboundEvent::Join {
                name: "Alice".to_string(),
                group: Some("Rust Fans".to_string())
            })
        );
    }

    #[test]
    fn message_text_keeps_commas() {
        assert_eq!(
            parse_input_line("M, well, hello, there\r\n"),
            Some(InboundEvent::Broadcast {
                text: "well, hello, there".to_string()
            })
        );
        assert_eq!(
            parse_input_line("D, Bob, one, two"),
            Some(InboundEvent::Direct {
                target: "Bob".to_string(),
                text: "one, two".to_string()
            })
        );
    }

    #[test]
    fn bare_control_lines() {
        assert_eq!(parse_input_line("R"), Some(InboundEvent::Reconnect));
        assert_eq!(parse_input_line(" x "), Some(InboundEvent::Disconnect));
        assert_eq!(parse_input_line("X, now"), None);
    }

    #[test]
    fn rejects_blank_comment_and_malformed() {
        assert_eq!(parse_input_line(""), None);
        assert_eq!(parse_input_line("   "), None);
        assert_eq!(parse_input_line("# J, Alice"), None);
        assert_eq!(parse_input_line("J"), None);
        assert_eq!(parse_input_line("M"), None);
        assert_eq!(parse_input_line("D, Bob"), None);
        assert_eq!(parse_input_line("Q, AAPL"), None);
        assert_eq!(parse_input_line("Join, Alice"), None);
    }

    #[test]
    fn formats_input_lines() {
        let join = InboundEvent::Join {
            name: "Alice".to_string(),
            group: Some("rust".to_string()),
        };
        assert_eq!(format_input_line(&join), "J, Alice, rust");
        assert_eq!(parse_input_line(&format_input_line(&join)), Some(join));
        assert_eq!(format_input_line(&InboundEvent::Disconnect), "X");
    }

    #[test]
    fn formats_output_lines() {
        assert_eq!(
            format_output_line(&OutboundEvent::notification("Say Hi to Alice, Bob, and Carl")),
            "N, Say Hi to Alice, Bob, and Carl"
        );
        assert_eq!(
            format_output_line(&OutboundEvent::message("Bob", "hi, all")),
            "M, Bob, hi, all"
        );
        assert_eq!(
            format_output_line(&OutboundEvent::rejected("That name is not allowed.")),
            "E, That name is not allowed."
        );
    }

    #[test]
    fn parses_output_lines() {
        assert_eq!(
            parse_output_line("N, Say Hi to Alice, and Bob"),
            Some(OutboundEvent::notification("Say Hi to Alice, and Bob"))
        );
        assert_eq!(
            parse_output_line("M, Bob, hi, all\n"),
            Some(OutboundEvent::message("Bob", "hi, all"))
        );
        assert_eq!(parse_output_line("Z, ?"), None);
    }
}
