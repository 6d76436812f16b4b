//! Shared helpers for the session and supervisor tests.
#![allow(dead_code)]

use std::{
    collections::VecDeque,
    io,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    task::{Context, Poll},
};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use pilotlink_core::{Connector, LinkError, LinkStream};

/// A stream whose reads never complete and whose writes always fail.
pub struct BrokenPipe;

impl AsyncRead for BrokenPipe {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for BrokenPipe {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer reset")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// A stream that accepts every write but whose reads fail.
pub struct ResetOnRead;

impl AsyncRead for ResetOnRead {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer")))
    }
}

impl AsyncWrite for ResetOnRead {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Accepts the first `n` writes, fails every later one.  Reads never complete.
pub struct FailAfterWrites {
    remaining: usize,
    accepted: Arc<Mutex<Vec<u8>>>,
}

impl FailAfterWrites {
    pub fn new(n: usize) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let accepted = Arc::new(Mutex::new(Vec::new()));
        (Self { remaining: n, accepted: Arc::clone(&accepted) }, accepted)
    }
}

impl AsyncRead for FailAfterWrites {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for FailAfterWrites {
    fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        if self.remaining == 0 {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer reset")));
        }
        self.remaining -= 1;
        self.accepted.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

pub enum Step {
    Refuse,
    Stream(Box<dyn LinkStream>),
}

/// Plays back a fixed list of connect outcomes, then hangs.
pub struct ScriptedConnector {
    steps: Mutex<VecDeque<Step>>,
    attempts: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new(steps: Vec<Step>) -> (Self, Arc<AtomicUsize>) {
        let attempts = Arc::new(AtomicUsize::new(0));
        let connector = Self { steps: Mutex::new(steps.into()), attempts: Arc::clone(&attempts) };
        (connector, attempts)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    fn target(&self) -> String {
        "scripted".into()
    }

    async fn connect(&self) -> Result<Box<dyn LinkStream>, LinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Refuse) => Err(LinkError::Connect {
                addr: "scripted".into(),
                reason: "connection refused".into(),
            }),
            Some(Step::Stream(s)) => Ok(s),
            None => std::future::pending().await,
        }
    }
}
