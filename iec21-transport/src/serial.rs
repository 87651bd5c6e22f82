//! Serial port transport implementation

use crate::error::{Iec21Error, Iec21Result};
use crate::stream::{not_connected, StreamAccessor, TransportLayer};
use async_trait::async_trait;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialStream};

/// Wrapper for SerialStream that implements Debug
struct DebugSerialStream(SerialStream);

impl fmt::Debug for DebugSerialStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialStream").finish()
    }
}

impl Deref for DebugSerialStream {
    type Target = SerialStream;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DebugSerialStream {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Serial port transport layer settings
///
/// IEC 62056-21 lines run 7 data bits, even parity, one stop bit.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: tokio_serial::DataBits,
    pub stop_bits: tokio_serial::StopBits,
    pub parity: tokio_serial::Parity,
    pub flow_control: tokio_serial::FlowControl,
    pub timeout: Option<Duration>,
}

impl SerialSettings {
    /// Create new serial settings with the IEC 62056-21 character format
    pub fn new(port_name: String, baud_rate: u32) -> Self {
        Self {
            port_name,
            baud_rate,
            data_bits: tokio_serial::DataBits::Seven,
            stop_bits: tokio_serial::StopBits::One,
            parity: tokio_serial::Parity::Even,
            flow_control: tokio_serial::FlowControl::None,
            timeout: Some(Duration::from_secs(5)),
        }
    }

    /// Create serial settings with timeout
    pub fn with_timeout(port_name: String, baud_rate: u32, timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            ..Self::new(port_name, baud_rate)
        }
    }
}

/// Serial port transport layer implementation
#[derive(Debug)]
pub struct SerialTransport {
    stream: Option<DebugSerialStream>,
    settings: SerialSettings,
    closed: bool,
}

impl SerialTransport {
    /// Create a new serial transport layer
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    /// Create serial transport with port name and baud rate
    pub fn new_simple(port_name: String, baud_rate: u32) -> Self {
        Self::new(SerialSettings::new(port_name, baud_rate))
    }

    /// Get the settings the port was created with
    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    fn stream_mut(&mut self) -> Iec21Result<&mut DebugSerialStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| not_connected("Serial stream"))
    }
}

fn serial_error(context: &str, e: tokio_serial::Error) -> Iec21Error {
    Iec21Error::Connection(std::io::Error::other(format!("{}: {}", context, e)))
}

#[async_trait]
impl TransportLayer for SerialTransport {
    async fn open(&mut self) -> Iec21Result<()> {
        if !self.closed {
            return Err(Iec21Error::InvalidState(
                "Serial port has already been opened".to_string(),
            ));
        }

        let builder = tokio_serial::new(&self.settings.port_name, self.settings.baud_rate)
            .data_bits(self.settings.data_bits)
            .stop_bits(self.settings.stop_bits)
            .parity(self.settings.parity)
            .flow_control(self.settings.flow_control);

        let stream = SerialStream::open(&builder).map_err(|e| {
            Iec21Error::Configuration(format!(
                "Failed to open serial port {}: {}",
                self.settings.port_name, e
            ))
        })?;

        log::info!(
            "Opened serial port {} at {} baud",
            self.settings.port_name,
            self.settings.baud_rate
        );
        self.stream = Some(DebugSerialStream(stream));
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for SerialTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> Iec21Result<()> {
        self.settings.timeout = timeout;
        Ok(())
    }

    fn timeout(&self) -> Option<Duration> {
        self.settings.timeout
    }

    async fn read_byte(&mut self) -> Iec21Result<u8> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        let result = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, stream.read_u8())
                .await
                .map_err(|_| Iec21Error::Timeout)?,
            None => stream.read_u8().await,
        };

        result.map_err(Iec21Error::Connection)
    }

    fn bytes_available(&self) -> Iec21Result<usize> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| not_connected("Serial stream"))?;
        let count = stream
            .bytes_to_read()
            .map_err(|e| serial_error("Failed to query input buffer", e))?;
        Ok(count as usize)
    }

    async fn read_available(&mut self, max: usize) -> Iec21Result<Vec<u8>> {
        let available = self.bytes_available()?.min(max);
        if available == 0 {
            return Ok(Vec::new());
        }
        let stream = self.stream_mut()?;
        let mut buf = vec![0u8; available];
        let n = AsyncReadExt::read(&mut **stream, &mut buf)
            .await
            .map_err(Iec21Error::Connection)?;
        buf.truncate(n);
        Ok(buf)
    }

    async fn write_all(&mut self, buf: &[u8]) -> Iec21Result<()> {
        let stream = self.stream_mut()?;
        AsyncWriteExt::write_all(&mut **stream, buf)
            .await
            .map_err(Iec21Error::Connection)
    }

    async fn flush(&mut self) -> Iec21Result<()> {
        let stream = self.stream_mut()?;
        AsyncWriteExt::flush(&mut **stream)
            .await
            .map_err(Iec21Error::Connection)
    }

    async fn set_baud_rate(&mut self, baud_rate: u32) -> Iec21Result<()> {
        let stream = self.stream_mut()?;
        stream
            .set_baud_rate(baud_rate)
            .map_err(|e| serial_error("Failed to change baud rate", e))?;
        self.settings.baud_rate = baud_rate;
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.settings.baud_rate
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> Iec21Result<()> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = AsyncWriteExt::flush(&mut *stream).await {
                log::warn!(
                    "Error flushing serial port {} on close: {}",
                    self.settings.port_name,
                    e
                );
            }
            log::info!("Closed serial port {}", self.settings.port_name);
        }
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_settings() {
        let settings = SerialSettings::new("/dev/ttyUSB0".to_string(), 300);
        assert_eq!(settings.port_name, "/dev/ttyUSB0");
        assert_eq!(settings.baud_rate, 300);
        assert_eq!(settings.data_bits, tokio_serial::DataBits::Seven);
        assert_eq!(settings.parity, tokio_serial::Parity::Even);
    }

    #[test]
    fn test_settings_without_timeout() {
        let settings = SerialSettings::with_timeout("COM1".to_string(), 2400, None);
        assert_eq!(settings.timeout, None);
        assert_eq!(settings.stop_bits, tokio_serial::StopBits::One);
    }

    #[tokio::test]
    async fn test_read_before_open_fails() {
        let mut transport = SerialTransport::new_simple("/dev/null-port".to_string(), 300);
        assert!(transport.is_closed());
        let err = transport.read_byte().await.unwrap_err();
        assert!(matches!(err, Iec21Error::Connection(_)));
    }
}
