// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! One connection's lifetime.
//!
//! A session runs four duties over a single stream:
//!
//! - watch registration: one line naming the variables to stream
//! - inbound reader: decodes lines into the state mirror
//! - queue drainer: writes queued commands in FIFO order
//! - diagnostic reporter: periodic state dump
//!
//! The duties are polled by one `select!`.  Whichever finishes first decides
//! the outcome; the others are dropped at that point together with both
//! halves of the stream.  Registration only finishes the session when it fails.

use std::time::Duration;

use pilotlink_config::Config;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, WriteHalf},
    sync::{broadcast, Mutex},
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info, trace};

use crate::{
    codec,
    error::LinkError,
    handle::LinkEvent,
    queue::{CommandReceiver, Outbound, QueuedMessage},
    state::{StateReader, StateWriter},
};

/// Per-session settings derived from [`Config`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub watch_keys: Vec<String>,
    /// `None` disables the diagnostic reporter.
    pub report_interval: Option<Duration>,
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            watch_keys: config.watch.keys.clone(),
            report_interval: config
                .report
                .enabled
                .then(|| Duration::from_millis(config.report.interval_ms.max(1))),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Why a session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server closed its side of the stream.
    RemoteClosed,
    /// The drainer reached the stop sentinel or every producer was dropped.
    Stopped,
}

/// Longest inbound line accepted, newline included.  A longer line fails the
/// session.
pub const MAX_LINE_LEN: usize = 64 * 1024;

type SharedWriter<S> = Mutex<WriteHalf<S>>;

/// Run all four duties over `stream` until the first one ends.
pub async fn run_session<S>(
    stream: S,
    state: &StateWriter,
    queue: &mut CommandReceiver,
    config: &SessionConfig,
    events: &broadcast::Sender<LinkEvent>,
) -> Result<SessionEnd, LinkError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let writer = Mutex::new(write_half);

    info!("session started");
    // `biased` polls registration first so the watch line precedes any
    // command left in the queue from a previous connection.
    let end = tokio::select! {
        biased;
        end = register_watches(&writer, &config.watch_keys) => end,
        end = read_state(read_half, state) => end,
        end = drain_queue(&writer, queue) => end,
        end = report_state(state.reader(), config.report_interval, events) => end,
    };
    debug!(?end, "session ended");
    end
}

async fn write_line<S>(writer: &SharedWriter<S>, msg: &QueuedMessage) -> Result<(), LinkError>
where
    S: AsyncWrite,
{
    let mut w = writer.lock().await;
    w.write_all(msg.as_bytes()).await?;
    w.flush().await?;
    Ok(())
}

async fn register_watches<S>(writer: &SharedWriter<S>, keys: &[String]) -> Result<SessionEnd, LinkError>
where
    S: AsyncWrite,
{
    let line = codec::encode_watch(keys);
    write_line(writer, &line).await?;
    debug!(keys = keys.len(), "watches registered");
    std::future::pending().await
}

async fn read_state<R>(read_half: R, state: &StateWriter) -> Result<SessionEnd, LinkError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = (&mut reader).take(MAX_LINE_LEN as u64).read_until(b'\n', &mut buf).await?;
        if n == 0 {
            info!("server closed the connection");
            return Ok(SessionEnd::RemoteClosed);
        }
        if n == MAX_LINE_LEN && !buf.ends_with(b"\n") {
            return Err(LinkError::Stream(format!(
                "inbound line exceeds {MAX_LINE_LEN} bytes"
            )));
        }
        let line = String::from_utf8_lossy(&buf);
        trace!(line = %line.trim_end(), "received");
        if let Some(update) = codec::decode_line(&line) {
            state.apply(update);
        }
        // Yield so a fast sender cannot starve the other duties.
        tokio::task::yield_now().await;
    }
}

async fn drain_queue<S>(writer: &SharedWriter<S>, queue: &mut CommandReceiver) -> Result<SessionEnd, LinkError>
where
    S: AsyncWrite,
{
    loop {
        match queue.pop().await {
            Some(Outbound::Message(msg)) => {
                debug!(line = %msg.text().trim_end(), "sending");
                write_line(writer, &msg).await?;
            }
            Some(Outbound::Stop) => {
                info!("stop requested; ending session");
                return Ok(SessionEnd::Stopped);
            }
            None => {
                info!("command queue closed; ending session");
                return Ok(SessionEnd::Stopped);
            }
        }
    }
}

async fn report_state(
    state: StateReader,
    interval: Option<Duration>,
    events: &broadcast::Sender<LinkEvent>,
) -> Result<SessionEnd, LinkError> {
    let Some(period) = interval else {
        return std::future::pending().await;
    };
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let snapshot = state.snapshot();
        info!("AP state: {snapshot}");
        let _ = events.send(LinkEvent::Snapshot(snapshot));
    }
}
