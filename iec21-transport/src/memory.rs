//! In-memory line for tests and meter simulation
//!
//! The line is shared between every clone of a [`MemoryTransport`], so a test
//! can hand one clone to a port and keep another to feed meter output and
//! inspect what the port wrote.

use crate::error::{Iec21Error, Iec21Result};
use crate::stream::{not_connected, StreamAccessor, TransportLayer};
use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct MemoryLine {
    /// Pending meter output. Only the front chunk counts as arrived.
    input: VecDeque<Bytes>,
    written: BytesMut,
    baud_rate: u32,
    baud_rate_history: Vec<u32>,
    timeout: Option<Duration>,
    timeout_history: Vec<Option<Duration>>,
    closed: bool,
    fail_next_drain: bool,
}

impl MemoryLine {
    fn front(&mut self) -> Option<&mut Bytes> {
        while self.input.front().is_some_and(|chunk| chunk.is_empty()) {
            self.input.pop_front();
        }
        self.input.front_mut()
    }

    fn pop_byte(&mut self) -> Option<u8> {
        let chunk = self.front()?;
        let b = chunk[0];
        chunk.advance(1);
        Some(b)
    }
}

/// Scripted, cloneable in-memory line
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    line: Arc<Mutex<MemoryLine>>,
    notify: Arc<Notify>,
}

impl MemoryTransport {
    /// Create an open line running at `baud_rate` with no pending input
    pub fn new(baud_rate: u32) -> Self {
        let line = MemoryLine {
            baud_rate,
            ..MemoryLine::default()
        };
        Self {
            line: Arc::new(Mutex::new(line)),
            notify: Arc::new(Notify::new()),
        }
    }

    fn line(&self) -> MutexGuard<'_, MemoryLine> {
        self.line.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a chunk of meter output
    ///
    /// A chunk becomes visible to `bytes_available` once every earlier chunk
    /// has been consumed, which models bytes arriving over time.
    pub fn push_input(&self, bytes: impl Into<Bytes>) {
        self.line().input.push_back(bytes.into());
        self.notify.notify_waiters();
    }

    /// Total number of unread input bytes across all chunks
    pub fn remaining_input(&self) -> usize {
        self.line().input.iter().map(Bytes::len).sum()
    }

    /// Everything written to the line so far
    pub fn written(&self) -> Vec<u8> {
        self.line().written.to_vec()
    }

    /// Take and clear the written bytes
    pub fn take_written(&self) -> Vec<u8> {
        self.line().written.split().to_vec()
    }

    /// Every baud rate set through `set_baud_rate`, in order
    pub fn baud_rate_history(&self) -> Vec<u32> {
        self.line().baud_rate_history.clone()
    }

    /// Make the next `bytes_available` call fail, which fails the next drain
    pub fn fail_next_drain(&self) {
        self.line().fail_next_drain = true;
    }

    /// Every timeout set through `set_timeout`, in order
    pub fn timeout_history(&self) -> Vec<Option<Duration>> {
        self.line().timeout_history.clone()
    }
}

#[async_trait]
impl TransportLayer for MemoryTransport {
    async fn open(&mut self) -> Iec21Result<()> {
        let mut line = self.line();
        if !line.closed {
            return Err(Iec21Error::InvalidState(
                "Memory line has already been opened".to_string(),
            ));
        }
        line.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for MemoryTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> Iec21Result<()> {
        let mut line = self.line();
        line.timeout = timeout;
        line.timeout_history.push(timeout);
        Ok(())
    }

    fn timeout(&self) -> Option<Duration> {
        self.line().timeout
    }

    async fn read_byte(&mut self) -> Iec21Result<u8> {
        let notify = self.notify.clone();
        loop {
            // Registered before the line is inspected so a push in between is not lost
            let notified = notify.notified();
            let timeout = {
                let mut line = self.line();
                if line.closed {
                    return Err(not_connected("Memory line"));
                }
                if let Some(b) = line.pop_byte() {
                    return Ok(b);
                }
                line.timeout
            };
            match timeout {
                Some(timeout) => {
                    if tokio::time::timeout(timeout, notified).await.is_err() {
                        return Err(Iec21Error::Timeout);
                    }
                }
                None => notified.await,
            }
        }
    }

    fn bytes_available(&self) -> Iec21Result<usize> {
        let mut line = self.line();
        if line.closed {
            return Err(not_connected("Memory line"));
        }
        if line.fail_next_drain {
            line.fail_next_drain = false;
            return Err(Iec21Error::Connection(std::io::Error::other(
                "Memory line input buffer unavailable",
            )));
        }
        Ok(line.front().map_or(0, |chunk| chunk.len()))
    }

    async fn read_available(&mut self, max: usize) -> Iec21Result<Vec<u8>> {
        let mut line = self.line();
        if line.closed {
            return Err(not_connected("Memory line"));
        }
        match line.front() {
            Some(chunk) => {
                let n = chunk.len().min(max);
                Ok(chunk.split_to(n).to_vec())
            }
            None => Ok(Vec::new()),
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> Iec21Result<()> {
        let mut line = self.line();
        if line.closed {
            return Err(not_connected("Memory line"));
        }
        line.written.extend_from_slice(buf);
        Ok(())
    }

    async fn flush(&mut self) -> Iec21Result<()> {
        Ok(())
    }

    async fn set_baud_rate(&mut self, baud_rate: u32) -> Iec21Result<()> {
        let mut line = self.line();
        if line.closed {
            return Err(not_connected("Memory line"));
        }
        line.baud_rate = baud_rate;
        line.baud_rate_history.push(baud_rate);
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.line().baud_rate
    }

    fn is_closed(&self) -> bool {
        self.line().closed
    }

    async fn close(&mut self) -> Iec21Result<()> {
        self.line().closed = true;
        self.notify.notify_waiters();
        Ok(())
    }
}
