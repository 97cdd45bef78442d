// crates/chat-core/tests/regression_scenarios.rs
use std::collections::HashMap;
use std::sync::Arc;

use chat_core::{Broadcaster, ChatRouter, InMemoryRegistry, OutboundEvent};
use chat_protocol::line_codec::{format_output_line, parse_input_line};
use parking_lot::Mutex;

const SESSIONS: &str = include_str!("data/session.txt");

/// Group-aware broadcaster that writes every delivery as a transcript line.
#[derive(Default)]
struct Transcript {
    groups: Mutex<HashMap<String, Vec<String>>>,
    lines: Mutex<Vec<String>>,
}

impl Transcript {
    fn push(&self, connection_id: &str, event: &OutboundEvent) {
        self.lines
            .lock()
            .push(format!("{}< {}", connection_id, format_output_line(event)));
    }
}

impl Broadcaster for Transcript {
    fn add_to_group(&self, connection_id: &str, group: &str) {
        let mut groups = self.groups.lock();
        let members = groups.entry(group.to_string()).or_default();
        if !members.iter().any(|m| m == connection_id) {
            members.push(connection_id.to_string());
        }
    }

    fn remove_from_group(&self, connection_id: &str, group: &str) {
        if let Some(members) = self.groups.lock().get_mut(group) {
            members.retain(|m| m != connection_id);
        }
    }

    fn send_to_others_in_group(&self, group: &str, exclude: &str, event: OutboundEvent) {
        let members = self.groups.lock().get(group).cloned().unwrap_or_default();
        for member in members.iter().filter(|m| *m != exclude) {
            self.push(member, &event);
        }
    }

    fn send_to_connection(&self, connection_id: &str, event: OutboundEvent) {
        self.push(connection_id, &event);
    }
}

struct Scenario {
    name: String,
    lines: Vec<String>,
}

fn load_scenarios() -> Vec<Scenario> {
    let mut scenarios: Vec<Scenario> = Vec::new();

    for raw in SESSIONS.lines() {
        let line = raw.trim();
        if let Some(name) = line.strip_prefix("#name:") {
            scenarios.push(Scenario {
                name: name.trim().to_string(),
                lines: Vec::new(),
            });
        } else if !line.is_empty() && !line.starts_with('#') {
            scenarios
                .last_mut()
                .expect("transcript line before first #name:")
                .lines
                .push(line.to_string());
        }
    }

    scenarios
}

/// Splits `c1> J, Alice` into `("c1", '>', "J, Alice")`.
fn split_marker(line: &str) -> (&str, char, &str) {
    let idx = line
        .find(|c| c == '>' || c == '<' || c == '!')
        .unwrap_or_else(|| panic!("no marker in transcript line: {}", line));
    let marker = line[idx..].chars().next().unwrap();
    (&line[..idx], marker, line[idx + 1..].trim())
}

fn replay(scenario: &Scenario) -> (Vec<String>, Vec<String>) {
    let registry = Arc::new(InMemoryRegistry::new());
    let transcript = Arc::new(Transcript::default());
    let router = ChatRouter::new(registry, transcript.clone());

    let mut expected = Vec::new();

    for line in &scenario.lines {
        let (connection_id, marker, rest) = split_marker(line);
        match marker {
            '>' => {
                let event = parse_input_line(rest)
                    .unwrap_or_else(|| panic!("unparseable input in '{}': {}", scenario.name, rest));
                if let Err(err) = router.process_event(connection_id, event) {
                    transcript
                        .lines
                        .lock()
                        .push(format!("{}! {}", connection_id, err));
                }
            }
            _ => expected.push(format!("{}{} {}", connection_id, marker, rest)),
        }
    }

    let actual = std::mem::take(&mut *transcript.lines.lock());
    (actual, expected)
}

#[test]
fn sessions_match_reference_transcripts() {
    let scenarios = load_scenarios();
    assert_eq!(scenarios.len(), 4, "expected four recorded sessions");

    for scenario in &scenarios {
        let (actual, expected) = replay(scenario);

        println!("Scenario '{}': {} lines", scenario.name, actual.len());
        assert_eq!(actual, expected, "transcript mismatch in '{}'", scenario.name);
    }
}

#[test]
fn replay_is_deterministic() {
    for scenario in load_scenarios() {
        let (first, _) = replay(&scenario);
        let (second, _) = replay(&scenario);
        assert_eq!(first, second, "non-deterministic replay in '{}'", scenario.name);
    }
}
