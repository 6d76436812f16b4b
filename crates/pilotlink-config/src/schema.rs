// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Serde default helper, returns `true`.
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    /// Extra key bindings layered over the built-in map.
    ///
    /// ```toml
    /// [keys]
    /// f1 = "engage"
    /// f2 = "disengage"
    /// up = "plus-five"
    /// ```
    #[serde(default)]
    pub keys: BTreeMap<String, Action>,
}

impl Config {
    /// Built-in key map with the `[keys]` table applied on top.
    pub fn key_map(&self) -> BTreeMap<String, Action> {
        let mut map = default_key_map();
        for (key, action) in &self.keys {
            map.insert(key.to_ascii_lowercase(), *action);
        }
        map
    }
}

// ── Connection ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Autopilot server host name or address
    #[serde(default = "default_host")]
    pub host: String,
    /// Autopilot server TCP port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Delay before the first reconnect attempt, in seconds
    #[serde(default = "default_backoff_initial_secs")]
    pub backoff_initial_secs: u64,
    /// Upper bound for the doubling reconnect delay, in seconds
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
}

fn default_host() -> String {
    "localhost".into()
}
fn default_port() -> u16 {
    23322
}
fn default_backoff_initial_secs() -> u64 {
    1
}
fn default_backoff_max_secs() -> u64 {
    15
}

impl ConnectionConfig {
    /// `host:port` as accepted by `TcpStream::connect`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            backoff_initial_secs: default_backoff_initial_secs(),
            backoff_max_secs: default_backoff_max_secs(),
        }
    }
}

// ── Diagnostic reporter ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Emit a periodic state dump while connected
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval between state dumps, in milliseconds
    #[serde(default = "default_report_interval_ms")]
    pub interval_ms: u64,
}

fn default_report_interval_ms() -> u64 {
    500
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { enabled: true, interval_ms: default_report_interval_ms() }
    }
}

// ── Watch registration ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Remote variables the server is asked to stream on connect
    #[serde(default = "default_watch_keys")]
    pub keys: Vec<String>,
}

pub fn default_watch_keys() -> Vec<String> {
    ["ap.heading", "ap.heading_command", "imu.heading", "ap.mode", "ap.enabled"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { keys: default_watch_keys() }
    }
}

// ── Actions ───────────────────────────────────────────────────────────────────

/// A discrete helm command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Hold the current heading and engage the autopilot
    Engage,
    /// Release the helm
    Disengage,
    /// Steer one degree to starboard
    PlusOne,
    /// Steer one degree to port
    MinusOne,
    /// Steer five degrees to starboard
    PlusFive,
    /// Steer five degrees to port
    MinusFive,
    /// Engage when disengaged, disengage when engaged
    Toggle,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Engage,
        Action::Disengage,
        Action::PlusOne,
        Action::MinusOne,
        Action::PlusFive,
        Action::MinusFive,
        Action::Toggle,
    ];
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Engage => write!(f, "engage"),
            Action::Disengage => write!(f, "disengage"),
            Action::PlusOne => write!(f, "plus-one"),
            Action::MinusOne => write!(f, "minus-one"),
            Action::PlusFive => write!(f, "plus-five"),
            Action::MinusFive => write!(f, "minus-five"),
            Action::Toggle => write!(f, "toggle"),
        }
    }
}

/// Accepts `plus-one`, `plus_one`, `PlusOne` and any other casing.
impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "engage" => Ok(Action::Engage),
            "disengage" => Ok(Action::Disengage),
            "plusone" => Ok(Action::PlusOne),
            "minusone" => Ok(Action::MinusOne),
            "plusfive" => Ok(Action::PlusFive),
            "minusfive" => Ok(Action::MinusFive),
            "toggle" => Ok(Action::Toggle),
            _ => Err(UnknownAction(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl std::fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown action: {:?}", self.0)
    }
}

impl std::error::Error for UnknownAction {}

/// Key names of the stock handheld remote and keyboard.
pub fn default_key_map() -> BTreeMap<String, Action> {
    [
        ("up", Action::PlusOne),
        ("down", Action::MinusOne),
        ("slash", Action::PlusFive),
        ("dot", Action::MinusFive),
        ("enter", Action::Toggle),
        ("space", Action::Toggle),
        // media remote
        ("playpause", Action::Toggle),
        ("previoussong", Action::MinusOne),
        ("nextsong", Action::PlusOne),
        ("volumeup", Action::PlusFive),
        ("volumedown", Action::MinusFive),
        ("engage", Action::Engage),
        ("disengage", Action::Disengage),
    ]
    .into_iter()
    .map(|(k, a)| (k.to_string(), a))
    .collect()
}
