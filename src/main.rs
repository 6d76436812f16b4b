// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;
mod keys;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use pilotlink_config::{Action, Config};
use pilotlink_core::{LinkEvent, LinkHandle, Supervisor, TcpConnector};

/// How long a stopping link may take to flush queued commands.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Handle completions before loading config
    if let Some(Commands::Completions { shell }) = &cli.command {
        cli::print_completions(*shell);
        return Ok(());
    }

    let mut config = pilotlink_config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    match &cli.command {
        Some(Commands::Completions { .. }) => Ok(()),
        Some(Commands::ShowConfig) => {
            println!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
        Some(Commands::Keys) => {
            print_keys(&config);
            Ok(())
        }
        Some(Commands::Send { action, settle_ms, timeout_secs }) => {
            send_action(
                &config,
                *action,
                Duration::from_millis(*settle_ms),
                Duration::from_secs(*timeout_secs),
            )
            .await
        }
        None => run_keys(&config).await,
    }
}

/// Spawn the supervisor.  The returned receiver is subscribed before the task
/// starts, so it sees the first `Connecting`/`Connected` events.
fn start_link(
    config: &Config,
) -> (tokio::task::JoinHandle<()>, LinkHandle, broadcast::Receiver<LinkEvent>) {
    let connector = TcpConnector::new(config.connection.addr());
    let (supervisor, handle) = Supervisor::new(connector, config);
    let events = handle.subscribe_events();
    (tokio::spawn(supervisor.run()), handle, events)
}

/// Read key names from stdin until EOF or Ctrl-C, then drain and stop.
async fn run_keys(config: &Config) -> anyhow::Result<()> {
    let key_map = config.key_map();
    let (mut link, handle, _) = start_link(config);

    info!("Listening for keys on stdin. Press Ctrl+C to stop.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else { break };
                match keys::resolve_key(&key_map, &line) {
                    Some(action) => handle.enqueue_action(action),
                    None if line.trim().is_empty() => {}
                    None => warn!(key = %line.trim(), "no action bound to key"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopped listening for keys.");
                break;
            }
            res = &mut link => {
                res.context("link task failed")?;
                return Ok(());
            }
        }
    }

    handle.shutdown();
    match tokio::time::timeout(DRAIN_TIMEOUT, link).await {
        Ok(res) => res.context("link task failed")?,
        Err(_) => warn!("link did not drain within {DRAIN_TIMEOUT:?}; exiting"),
    }
    Ok(())
}

/// One-shot: connect, let the mirror settle, send `action`, stop.
async fn send_action(
    config: &Config,
    action: Action,
    settle: Duration,
    limit: Duration,
) -> anyhow::Result<()> {
    let (link, handle, mut events) = start_link(config);

    let sent = async {
        wait_connected(&mut events).await?;
        tokio::time::sleep(settle).await;
        let before = handle.snapshot();
        handle.enqueue_action(action);
        handle.shutdown();
        link.await.context("link task failed")?;
        anyhow::Ok(before)
    };

    let before = tokio::time::timeout(limit, sent)
        .await
        .with_context(|| format!("{action} not sent to {} within {limit:?}", config.connection.addr()))??;
    println!("{action} sent ({before})");
    Ok(())
}

async fn wait_connected(events: &mut broadcast::Receiver<LinkEvent>) -> anyhow::Result<()> {
    loop {
        match events.recv().await {
            Ok(LinkEvent::Connected { .. }) => return Ok(()),
            Ok(LinkEvent::Disconnected { reason, retry_in }) => {
                warn!("{reason}; retrying in {retry_in:?}");
            }
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => anyhow::bail!("link closed before connecting"),
        }
    }
}

fn print_keys(config: &Config) {
    let map = config.key_map();
    let width = map.keys().map(String::len).max().unwrap_or(3).max(3);
    println!("{:<width$}  ACTION", "KEY");
    for (key, action) in &map {
        println!("{key:<width$}  {action}");
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn start_link_events_include_first_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = Config::default();
        config.connection.host = "127.0.0.1".into();
        config.connection.port = listener.local_addr().unwrap().port();
        config.report.enabled = false;

        let (link, handle, mut events) = start_link(&config);
        let (_server, _) = listener.accept().await.unwrap();
        // Let the supervisor publish before anyone starts waiting.
        tokio::time::sleep(Duration::from_millis(50)).await;

        tokio::time::timeout(Duration::from_secs(5), wait_connected(&mut events))
            .await
            .expect("Connected should already be buffered")
            .unwrap();

        handle.shutdown();
        tokio::time::timeout(Duration::from_secs(5), link).await.unwrap().unwrap();
    }
}
