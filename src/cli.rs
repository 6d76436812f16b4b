// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use pilotlink_config::{Action, Config};

#[derive(Parser, Debug)]
#[command(
    name = "pilotlink",
    about = "Steer a remote autopilot from key presses",
    version,
    long_about = "Keeps a connection to the autopilot server, mirrors its heading and \
                  engage state, and turns key names read from stdin (one per line) \
                  into heading commands."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Autopilot server host (overrides config)
    #[arg(long, env = "PILOTLINK_HOST")]
    pub host: Option<String>,

    /// Autopilot server port (overrides config)
    #[arg(long, short = 'p', env = "PILOTLINK_PORT")]
    pub port: Option<u16>,

    /// Path to config file (layered over the auto-discovered ones)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Print the effective configuration and exit
    ShowConfig,
    /// Print the effective key map and exit
    Keys,
    /// Connect, send a single action, and exit once it is on the wire.
    Send {
        #[arg(value_enum)]
        action: Action,
        /// Time to let the state mirror fill after connecting, in milliseconds.
        /// Relative steps and engage are computed from mirrored values.
        #[arg(long, value_name = "MS", default_value = "1000")]
        settle_ms: u64,
        /// Give up if the action has not been sent after this many seconds
        #[arg(long, value_name = "SECS", default_value = "30")]
        timeout_secs: u64,
    },
}

impl Cli {
    /// Apply `--host` / `--port` on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.connection.host = host.clone();
        }
        if let Some(port) = self.port {
            config.connection.port = port;
        }
    }
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "pilotlink", &mut std::io::stdout());
}
