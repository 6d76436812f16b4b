// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Local mirror of the remote autopilot variables.
//!
//! The mirror has exactly one writer, the session's inbound reader, which
//! holds the only [`StateWriter`].  Any number of [`StateReader`] clones may
//! read concurrently.  Every field is an independent atomic, so a
//! [`ApSnapshot`] taken while updates arrive may mix values from different
//! inbound lines.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::codec::Update;

/// Degrees stored as `f64` bit patterns.
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct ApState {
    enabled: AtomicBool,
    heading_command: AtomicF64,
    heading: AtomicF64,
    imu_heading: AtomicF64,
}

/// Plain copy of the mirrored fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ApSnapshot {
    pub enabled: bool,
    pub heading_command: f64,
    pub heading: f64,
    pub imu_heading: f64,
}

impl std::fmt::Display for ApSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "enabled={} heading={:.2} heading_command={:.2} imu_heading={:.2}",
            self.enabled, self.heading, self.heading_command, self.imu_heading
        )
    }
}

// ── Reader ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StateReader(Arc<ApState>);

impl StateReader {
    pub fn enabled(&self) -> bool {
        self.0.enabled.load(Ordering::Relaxed)
    }

    pub fn heading_command(&self) -> f64 {
        self.0.heading_command.load()
    }

    pub fn heading(&self) -> f64 {
        self.0.heading.load()
    }

    pub fn imu_heading(&self) -> f64 {
        self.0.imu_heading.load()
    }

    pub fn snapshot(&self) -> ApSnapshot {
        ApSnapshot {
            enabled: self.enabled(),
            heading_command: self.heading_command(),
            heading: self.heading(),
            imu_heading: self.imu_heading(),
        }
    }
}

// ── Writer ────────────────────────────────────────────────────────────────────

/// The single write side of the mirror.  Deliberately not `Clone`.
#[derive(Debug)]
pub struct StateWriter(Arc<ApState>);

impl StateWriter {
    /// A fresh mirror: disengaged, all angles zero.
    pub fn new() -> Self {
        Self(Arc::new(ApState::default()))
    }

    pub fn reader(&self) -> StateReader {
        StateReader(Arc::clone(&self.0))
    }

    pub fn apply(&self, update: Update) {
        match update {
            Update::Enabled(v) => self.0.enabled.store(v, Ordering::Relaxed),
            Update::HeadingCommand(v) => self.0.heading_command.store(v),
            Update::Heading(v) => self.0.heading.store(v),
            Update::ImuHeading(v) => self.0.imu_heading.store(v),
        }
    }
}

impl Default for StateWriter {
    fn default() -> Self {
        Self::new()
    }
}
