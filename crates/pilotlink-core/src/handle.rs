// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use pilotlink_config::Action;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    queue::CommandSender,
    state::{ApSnapshot, StateReader},
    translate::translate,
};

/// Events emitted by the supervisor and its sessions.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Connecting { addr: String },
    Connected { addr: String },
    /// A connect attempt or session ended; the next attempt follows `retry_in`.
    Disconnected { reason: String, retry_in: Duration },
    Snapshot(ApSnapshot),
    /// The stop sentinel was reached; the supervisor has returned.
    Stopped,
}

/// Cheap-to-clone handle to a [`Supervisor`](crate::Supervisor).
///
/// Any number of threads or tasks may call [`enqueue_action`](Self::enqueue_action);
/// it never blocks on the network and never fails.
#[derive(Clone, Debug)]
pub struct LinkHandle {
    // The lock keeps a multi-line action contiguous in the queue.
    queue: Arc<Mutex<CommandSender>>,
    state: StateReader,
    event_tx: broadcast::Sender<LinkEvent>,
}

impl LinkHandle {
    pub(crate) fn new(
        queue: CommandSender,
        state: StateReader,
        event_tx: broadcast::Sender<LinkEvent>,
    ) -> Self {
        Self { queue: Arc::new(Mutex::new(queue)), state, event_tx }
    }

    /// Translate `action` against the current mirror and queue the result.
    pub fn enqueue_action(&self, action: Action) {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.state.snapshot();
        info!(%action, "queued action");
        for msg in translate(action, &snapshot) {
            if !queue.push(msg) {
                warn!(%action, "link is gone; dropping action");
                return;
            }
        }
    }

    /// Queue the stop sentinel behind everything already queued.
    pub fn shutdown(&self) {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if !queue.stop() {
            warn!("link is gone; stop request ignored");
        }
    }

    /// Last known remote state.
    pub fn snapshot(&self) -> ApSnapshot {
        self.state.snapshot()
    }

    /// Subscribe to link events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<LinkEvent> {
        self.event_tx.subscribe()
    }
}
