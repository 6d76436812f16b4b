// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use pilotlink_config::Action;

use crate::codec::{encode_bool, encode_float, AP_ENABLED, AP_HEADING_COMMAND};
use crate::queue::QueuedMessage;
use crate::state::ApSnapshot;

/// Wire messages for `action` given the last known remote state.
///
/// Relative steering adjusts the last *known* heading command, which may lag
/// the server while earlier commands are still in flight.
pub fn translate(action: Action, state: &ApSnapshot) -> Vec<QueuedMessage> {
    match action {
        Action::Engage => engage(state),
        Action::Disengage => disengage(),
        Action::PlusOne => adjust(state, 1.0),
        Action::MinusOne => adjust(state, -1.0),
        Action::PlusFive => adjust(state, 5.0),
        Action::MinusFive => adjust(state, -5.0),
        Action::Toggle if state.enabled => disengage(),
        Action::Toggle => engage(state),
    }
}

fn engage(state: &ApSnapshot) -> Vec<QueuedMessage> {
    vec![
        encode_float(AP_HEADING_COMMAND, state.heading),
        encode_bool(AP_ENABLED, true),
    ]
}

fn disengage() -> Vec<QueuedMessage> {
    vec![encode_bool(AP_ENABLED, false)]
}

fn adjust(state: &ApSnapshot, delta: f64) -> Vec<QueuedMessage> {
    vec![encode_float(AP_HEADING_COMMAND, state.heading_command + delta)]
}
