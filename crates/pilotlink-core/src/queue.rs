// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use tokio::sync::mpsc;

/// One encoded wire line, trailing newline included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage(Box<[u8]>);

impl QueuedMessage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lossy text form for logs and tests.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<String> for QueuedMessage {
    fn from(s: String) -> Self {
        Self(s.into_bytes().into_boxed_slice())
    }
}

/// Entry in the outbound command queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Message(QueuedMessage),
    /// Ends the draining session cleanly.
    Stop,
}

/// Create an unbounded FIFO with any number of producers and one consumer.
pub fn command_queue() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandSender(tx), CommandReceiver(rx))
}

#[derive(Debug, Clone)]
pub struct CommandSender(mpsc::UnboundedSender<Outbound>);

impl CommandSender {
    /// Append a message.  Returns `false` when the consumer is gone.
    pub fn push(&self, msg: QueuedMessage) -> bool {
        self.0.send(Outbound::Message(msg)).is_ok()
    }

    /// Append the stop sentinel behind everything already queued.
    pub fn stop(&self) -> bool {
        self.0.send(Outbound::Stop).is_ok()
    }
}

/// The single consumer side.  Lent to one session at a time so entries
/// queued while disconnected are delivered after the next connect.
#[derive(Debug)]
pub struct CommandReceiver(mpsc::UnboundedReceiver<Outbound>);

impl CommandReceiver {
    /// Wait for the next entry.  `None` once every sender is dropped and the
    /// queue is empty.
    pub async fn pop(&mut self) -> Option<Outbound> {
        self.0.recv().await
    }

    /// Non-blocking variant of [`pop`](Self::pop).
    pub fn try_pop(&mut self) -> Option<Outbound> {
        self.0.try_recv().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
