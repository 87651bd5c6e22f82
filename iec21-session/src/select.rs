//! Select message `<manufacturer data> CR LF` and the meter's reply
//! `'/' <manufacturer reply> CR LF`

use crate::error::{Iec21Error, Iec21Result};
use crate::reader::{check_byte, expect_byte};
use iec21_core::ascii::ascii_string;
use iec21_transport::StreamAccessor;
use std::fmt;

/// Upper bound on the reply length, protects against a line that never sends CR
pub const MAX_SELECT_REPLY_LENGTH: usize = 256;

/// Manufacturer specific select message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectMessage {
    manufacturer_data: String,
    bytes: Vec<u8>,
}

impl SelectMessage {
    /// The data is sent verbatim followed by CR LF
    pub fn new(manufacturer_data: &str) -> Iec21Result<Self> {
        if !manufacturer_data.is_ascii() {
            return Err(Iec21Error::Configuration(
                "Select message must be ASCII".to_string(),
            ));
        }
        let bytes = format!("{}\r\n", manufacturer_data).into_bytes();
        Ok(Self {
            manufacturer_data: manufacturer_data.to_string(),
            bytes,
        })
    }

    pub fn manufacturer_data(&self) -> &str {
        &self.manufacturer_data
    }

    pub fn is_empty(&self) -> bool {
        self.manufacturer_data.is_empty()
    }

    pub fn encode(&self) -> &[u8] {
        &self.bytes
    }

    /// Write and flush the message
    pub async fn send<S: StreamAccessor + ?Sized>(&self, stream: &mut S) -> Iec21Result<()> {
        stream.write_all(&self.bytes).await?;
        stream.flush().await
    }
}

impl fmt::Display for SelectMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"select message\": {{\"manufacturer data\": \"{}\"}}}}",
            self.manufacturer_data
        )
    }
}

/// Reply of the meter to a select message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectReplyMessage {
    reply: String,
}

impl SelectReplyMessage {
    pub async fn read<S: StreamAccessor + ?Sized>(stream: &mut S) -> Iec21Result<Self> {
        let b = stream.read_byte().await?;
        check_byte(b, b'/', "select reply message start byte")?;

        let mut reply = Vec::new();
        let mut b = stream.read_byte().await?;
        while b != b'\r' {
            if reply.len() == MAX_SELECT_REPLY_LENGTH {
                return Err(Iec21Error::Framing(format!(
                    "Select reply longer than {} characters",
                    MAX_SELECT_REPLY_LENGTH
                )));
            }
            reply.push(b);
            b = stream.read_byte().await?;
        }

        expect_byte(stream, b'\n', "select reply message end byte").await?;

        Ok(Self {
            reply: ascii_string(&reply),
        })
    }

    pub fn reply(&self) -> &str {
        &self.reply
    }
}

impl fmt::Display for SelectReplyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{\"reply message\": {{\"reply\": \"{}\"}}}}", self.reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iec21_transport::MemoryTransport;
    use std::time::Duration;

    async fn line_with(bytes: &[u8]) -> MemoryTransport {
        let mut line = MemoryTransport::new(300);
        line.set_timeout(Some(Duration::from_millis(20))).await.unwrap();
        line.push_input(bytes.to_vec());
        line
    }

    #[test]
    fn test_select_encoding() {
        let select = SelectMessage::new("/2!").unwrap();
        assert_eq!(select.encode(), b"/2!\r\n");
        assert!(!select.is_empty());
        assert!(SelectMessage::new("").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reply() {
        let mut line = line_with(b"/MAN OK\r\n").await;
        let reply = SelectReplyMessage::read(&mut line).await.unwrap();
        assert_eq!(reply.reply(), "MAN OK");
    }

    #[tokio::test]
    async fn test_reply_bad_start() {
        let mut line = line_with(b"MAN\r\n").await;
        let err = SelectReplyMessage::read(&mut line).await.unwrap_err();
        assert!(err.is_framing());
    }

    #[tokio::test]
    async fn test_reply_missing_line_feed() {
        let mut line = line_with(b"/MAN\rX").await;
        let err = SelectReplyMessage::read(&mut line).await.unwrap_err();
        assert!(err.to_string().contains("end byte"));
    }
}
