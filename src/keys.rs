// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::BTreeMap;

use pilotlink_config::Action;

/// Resolve one line of key input.
///
/// The key map is consulted first (case-insensitively); otherwise the line
/// may name an action directly (`plus-one`, `PlusOne`, …).  A `KEY_` prefix
/// as printed by evdev tools is accepted and stripped.
pub fn resolve_key(map: &BTreeMap<String, Action>, input: &str) -> Option<Action> {
    let key = input.trim().to_ascii_lowercase();
    let key = key.strip_prefix("key_").unwrap_or(key.as_str());
    if key.is_empty() {
        return None;
    }
    map.get(key).copied().or_else(|| key.parse().ok())
}
