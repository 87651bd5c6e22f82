//! Stream accessor trait for transport layer

use crate::error::{Iec21Error, Iec21Result};
use async_trait::async_trait;
use std::time::Duration;

/// Stream accessor interface to access the half-duplex line to a meter
#[async_trait]
pub trait StreamAccessor: Send + Sync {
    /// Set the read timeout
    ///
    /// # Arguments
    ///
    /// * `timeout` - The timeout duration. None means infinite timeout.
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> Iec21Result<()>;

    /// Current read timeout, None means infinite
    fn timeout(&self) -> Option<Duration>;

    /// Read a single byte
    ///
    /// Blocks until a byte arrives or the configured timeout elapses.
    /// An elapsed timeout is reported as `Iec21Error::Timeout`, never as a
    /// connection error.
    async fn read_byte(&mut self) -> Iec21Result<u8>;

    /// Read exact number of bytes from the stream
    async fn read_exact(&mut self, buf: &mut [u8]) -> Iec21Result<()> {
        for slot in buf.iter_mut() {
            *slot = self.read_byte().await?;
        }
        Ok(())
    }

    /// Number of bytes that can be read without blocking
    fn bytes_available(&self) -> Iec21Result<usize>;

    /// Read up to `max` bytes that are already buffered, without blocking
    async fn read_available(&mut self, max: usize) -> Iec21Result<Vec<u8>>;

    /// Discard everything currently buffered on the input
    ///
    /// # Returns
    ///
    /// The bytes that were thrown away
    async fn drain_input(&mut self) -> Iec21Result<Vec<u8>> {
        let available = self.bytes_available()?;
        if available == 0 {
            return Ok(Vec::new());
        }
        self.read_available(available).await
    }

    /// Write all data to the stream
    async fn write_all(&mut self, buf: &[u8]) -> Iec21Result<()>;

    /// Flush any buffered data
    async fn flush(&mut self) -> Iec21Result<()>;

    /// Change the line speed
    async fn set_baud_rate(&mut self, baud_rate: u32) -> Iec21Result<()>;

    /// Current line speed
    fn baud_rate(&self) -> u32;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Close the stream
    ///
    /// A read blocked on the stream must fail once the stream is closed.
    async fn close(&mut self) -> Iec21Result<()>;
}

/// Transport layer trait that extends StreamAccessor
#[async_trait]
pub trait TransportLayer: StreamAccessor {
    /// Open the physical layer connection
    async fn open(&mut self) -> Iec21Result<()>;
}

pub(crate) fn not_connected(what: &str) -> Iec21Error {
    Iec21Error::Connection(std::io::Error::new(
        std::io::ErrorKind::NotConnected,
        format!("{} not connected", what),
    ))
}
