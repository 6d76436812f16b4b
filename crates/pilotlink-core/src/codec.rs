// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Line codec for the autopilot server protocol.
//!
//! Wire format, both directions, one variable per line:
//!   `<key>=<value>\n`
//!
//! Watch registration is a fixed micro-format the server parses literally:
//!   `watch={"<k1>" : 0, "<k2>" : 0}\n`

use tracing::debug;

use crate::queue::QueuedMessage;

pub const AP_ENABLED: &str = "ap.enabled";
pub const AP_HEADING: &str = "ap.heading";
pub const AP_HEADING_COMMAND: &str = "ap.heading_command";
pub const IMU_HEADING: &str = "imu.heading";

/// A decoded inbound assignment to one mirrored variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Update {
    Enabled(bool),
    HeadingCommand(f64),
    Heading(f64),
    ImuHeading(f64),
}

// ── Encode ────────────────────────────────────────────────────────────────────

pub fn encode_bool(key: &str, value: bool) -> QueuedMessage {
    QueuedMessage::from(format!("{key}={value}\n"))
}

pub fn encode_float(key: &str, value: f64) -> QueuedMessage {
    QueuedMessage::from(format!("{key}={value:.6}\n"))
}

pub fn encode_watch<S: AsRef<str>>(keys: &[S]) -> QueuedMessage {
    let body = keys
        .iter()
        .map(|k| format!("\"{}\" : 0", k.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    QueuedMessage::from(format!("watch={{{body}}}\n"))
}

// ── Decode ────────────────────────────────────────────────────────────────────

/// Decode one inbound line.  Unknown keys, lines without `=` and values that
/// fail to parse yield `None`.
pub fn decode_line(line: &str) -> Option<Update> {
    let (key, value) = line.trim().split_once('=')?;
    let value = value.trim();
    match key.trim() {
        AP_ENABLED => Some(Update::Enabled(value.eq_ignore_ascii_case("true"))),
        AP_HEADING => parse_float(key, value).map(Update::Heading),
        AP_HEADING_COMMAND => parse_float(key, value).map(Update::HeadingCommand),
        IMU_HEADING => parse_float(key, value).map(Update::ImuHeading),
        _ => None,
    }
}

fn parse_float(key: &str, value: &str) -> Option<f64> {
    match value.parse::<f64>() {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(key, value, "dropping unparseable value: {e}");
            None
        }
    }
}
