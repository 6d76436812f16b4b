// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Reconnect loop around [`run_session`].
//!
//! Obtain a [`LinkHandle`] from [`Supervisor::new`] before calling
//! [`Supervisor::run`] so actions can be queued while the loop runs inside a
//! spawned task.  Actions queued while disconnected are sent after the next
//! successful connect.

use std::time::Duration;

use async_trait::async_trait;
use pilotlink_config::Config;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::broadcast,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::LinkError,
    handle::{LinkEvent, LinkHandle},
    queue::{command_queue, CommandReceiver},
    session::{run_session, SessionConfig, SessionEnd},
    state::StateWriter,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Byte stream a session can run over.
pub trait LinkStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> LinkStream for T {}

/// Opens the connection for each session attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Human-readable target, used in logs and events.
    fn target(&self) -> String;

    async fn connect(&self) -> Result<Box<dyn LinkStream>, LinkError>;
}

/// Plain TCP to `host:port`.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    fn target(&self) -> String {
        self.addr.clone()
    }

    async fn connect(&self) -> Result<Box<dyn LinkStream>, LinkError> {
        let stream = TcpStream::connect(&self.addr).await.map_err(|e| LinkError::Connect {
            addr: self.addr.clone(),
            reason: e.to_string(),
        })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {e}");
        }
        Ok(Box::new(stream))
    }
}

// ── Backoff ───────────────────────────────────────────────────────────────────

/// Shortest reconnect delay; zero or sub-second bounds are raised to this.
pub const MIN_BACKOFF: Duration = Duration::from_secs(1);

/// Doubling reconnect delay, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(MIN_BACKOFF);
        let initial = initial.clamp(MIN_BACKOFF, max);
        Self { initial, max, current: initial }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_secs(config.connection.backoff_initial_secs),
            Duration::from_secs(config.connection.backoff_max_secs),
        )
    }

    /// Delay to sleep now; the following call returns double, up to `max`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(15))
    }
}

// ── Supervisor ────────────────────────────────────────────────────────────────

pub struct Supervisor<C> {
    connector: C,
    state: StateWriter,
    queue: CommandReceiver,
    session: SessionConfig,
    backoff: Backoff,
    event_tx: broadcast::Sender<LinkEvent>,
}

impl<C: Connector> Supervisor<C> {
    pub fn new(connector: C, config: &Config) -> (Self, LinkHandle) {
        Self::with_parts(connector, SessionConfig::from_config(config), Backoff::from_config(config))
    }

    pub fn with_parts(connector: C, session: SessionConfig, backoff: Backoff) -> (Self, LinkHandle) {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (queue_tx, queue) = command_queue();
        let state = StateWriter::new();
        let handle = LinkHandle::new(queue_tx, state.reader(), event_tx.clone());
        let supervisor = Self { connector, state, queue, session, backoff, event_tx };
        (supervisor, handle)
    }

    /// Connect, run a session, back off, repeat.  Returns only once a session
    /// ends on the stop sentinel (or every handle is dropped).
    pub async fn run(mut self) {
        let addr = self.connector.target();
        loop {
            info!(%addr, "attempting to connect");
            self.emit(LinkEvent::Connecting { addr: addr.clone() });

            let outcome = match self.connector.connect().await {
                Ok(stream) => {
                    info!(%addr, "connected");
                    self.backoff.reset();
                    self.emit(LinkEvent::Connected { addr: addr.clone() });
                    run_session(stream, &self.state, &mut self.queue, &self.session, &self.event_tx)
                        .await
                }
                Err(e) => Err(e),
            };

            let reason = match outcome {
                Ok(SessionEnd::Stopped) => {
                    info!("link stopped");
                    self.emit(LinkEvent::Stopped);
                    return;
                }
                Ok(SessionEnd::RemoteClosed) => {
                    let reason = "server closed the connection".to_string();
                    warn!("{reason}");
                    reason
                }
                Err(e) => {
                    error!("link error: {e}");
                    e.to_string()
                }
            };

            let delay = self.backoff.next_delay();
            info!("reconnecting in {}s", delay.as_secs_f64());
            self.emit(LinkEvent::Disconnected { reason, retry_in: delay });
            tokio::time::sleep(delay).await;
        }
    }

    fn emit(&self, event: LinkEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(v: &[u64]) -> Vec<Duration> {
        v.iter().map(|s| Duration::from_secs(*s)).collect()
    }

    #[test]
    fn backoff_doubles_to_cap() {
        let mut b = Backoff::default();
        let got: Vec<_> = (0..7).map(|_| b.next_delay()).collect();
        assert_eq!(got, secs(&[1, 2, 4, 8, 15, 15, 15]));
    }

    #[test]
    fn reset_restarts_sequence() {
        let mut b = Backoff::default();
        b.next_delay();
        b.next_delay();
        b.next_delay();
        b.reset();
        assert_eq!(b.next_delay(), Duration::from_secs(1));
        assert_eq!(b.next_delay(), Duration::from_secs(2));
    }

    #[test]
    fn backoff_from_config_honours_bounds() {
        let mut cfg = Config::default();
        cfg.connection.backoff_initial_secs = 2;
        cfg.connection.backoff_max_secs = 5;
        let mut b = Backoff::from_config(&cfg);
        let got: Vec<_> = (0..4).map(|_| b.next_delay()).collect();
        assert_eq!(got, secs(&[2, 4, 5, 5]));
    }

    #[test]
    fn zero_initial_delay_is_raised_to_one_second() {
        let mut b = Backoff::new(Duration::ZERO, Duration::from_secs(15));
        let got: Vec<_> = (0..5).map(|_| b.next_delay()).collect();
        assert_eq!(got, secs(&[1, 2, 4, 8, 15]));
    }

    #[test]
    fn zero_bounds_from_config_still_wait() {
        let mut cfg = Config::default();
        cfg.connection.backoff_initial_secs = 0;
        cfg.connection.backoff_max_secs = 0;
        let mut b = Backoff::from_config(&cfg);
        let got: Vec<_> = (0..3).map(|_| b.next_delay()).collect();
        assert_eq!(got, secs(&[1, 1, 1]));
    }

    #[test]
    fn huge_max_does_not_overflow() {
        let mut b = Backoff::new(Duration::from_secs(1), Duration::MAX);
        let last = (0..200).map(|_| b.next_delay()).last();
        assert_eq!(last, Some(Duration::MAX));
    }

    #[test]
    fn initial_above_max_is_clamped() {
        let mut b = Backoff::new(Duration::from_secs(30), Duration::from_secs(15));
        assert_eq!(b.next_delay(), Duration::from_secs(15));
    }
}
