//! Identification message sent by the meter in reply to a request
//!
//! Format: `'/' X X X Z Identification CR LF`
//!
//! - `X X X`: manufacturer identification (three characters)
//! - `Z`: baud rate identification, also selects the mode (see
//!   [`decode_baud_rate_identification`])
//! - `Identification`: device id of at most 16 characters. It may be preceded
//!   by escape sequences `'\' W` carrying enhanced identification/capability
//!   characters.

use crate::error::Iec21Result;
use crate::reader::{check_byte, expect_byte, unexpected_byte};
use iec21_core::ascii::ascii_string;
use iec21_core::error::Iec21Error;
use iec21_core::mode::{decode_baud_rate_identification, ProtocolMode};
use iec21_transport::StreamAccessor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Escape byte announcing an enhanced identification character
pub const ENHANCED_ID_ESCAPE: u8 = 0x5C;

/// Maximum length of the device identification field
pub const MAX_METER_ID_LENGTH: usize = 16;

/// Maximum number of escape sequences accepted before giving up
pub const MAX_ENHANCED_ID_LENGTH: usize = 16;

/// Parsed identification message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationMessage {
    manufacturer_id: String,
    protocol_mode: ProtocolMode,
    /// None for mode A, which has no baud rate negotiation
    baud_rate: Option<u32>,
    meter_id: String,
    enhanced_id: String,
}

impl IdentificationMessage {
    /// Build an identification message from its fields
    pub fn new(
        manufacturer_id: impl Into<String>,
        protocol_mode: ProtocolMode,
        baud_rate: Option<u32>,
        meter_id: impl Into<String>,
        enhanced_id: impl Into<String>,
    ) -> Self {
        Self {
            manufacturer_id: manufacturer_id.into(),
            protocol_mode,
            baud_rate,
            meter_id: meter_id.into(),
            enhanced_id: enhanced_id.into(),
        }
    }

    /// Read an identification message starting at its first byte
    pub async fn read<S: StreamAccessor + ?Sized>(stream: &mut S) -> Iec21Result<Self> {
        let b = stream.read_byte().await?;
        check_byte(b, b'/', "identification message start byte")?;

        let mut manufacturer_id = [0u8; 3];
        stream.read_exact(&mut manufacturer_id).await?;

        let (baud_rate, protocol_mode) = decode_baud_rate_identification(stream.read_byte().await?);

        let mut b = stream.read_byte().await?;
        let mut enhanced_id = Vec::new();
        while b == ENHANCED_ID_ESCAPE {
            if enhanced_id.len() == MAX_ENHANCED_ID_LENGTH {
                return Err(Iec21Error::Framing(format!(
                    "More than {} enhanced identification characters received",
                    MAX_ENHANCED_ID_LENGTH
                )));
            }
            enhanced_id.push(stream.read_byte().await?);
            b = stream.read_byte().await?;
        }

        let mut meter_id = Vec::with_capacity(MAX_METER_ID_LENGTH);
        while b != b'\r' {
            if meter_id.len() == MAX_METER_ID_LENGTH {
                return Err(unexpected_byte(
                    b,
                    "identification byte, meter id longer than 16 characters",
                    Some(b'\r'),
                ));
            }
            meter_id.push(b);
            b = stream.read_byte().await?;
        }

        expect_byte(stream, b'\n', "identification message end byte").await?;

        Ok(Self {
            manufacturer_id: ascii_string(&manufacturer_id),
            protocol_mode,
            baud_rate,
            meter_id: ascii_string(&meter_id),
            enhanced_id: ascii_string(&enhanced_id),
        })
    }

    /// Encode the message as a meter would send it
    ///
    /// The baud rate identification byte is passed in as is; the mode and baud
    /// rate fields are not consulted.
    pub fn encode(&self, baud_rate_identification: u8) -> Vec<u8> {
        let mut result = Vec::with_capacity(8 + self.meter_id.len() + 2 * self.enhanced_id.len());
        result.push(b'/');
        result.extend(self.manufacturer_id.chars().map(|c| c as u8));
        result.push(baud_rate_identification);
        for c in self.enhanced_id.chars() {
            result.push(ENHANCED_ID_ESCAPE);
            result.push(c as u8);
        }
        result.extend(self.meter_id.chars().map(|c| c as u8));
        result.extend_from_slice(b"\r\n");
        result
    }

    /// Re-tag a message received while listening for unsolicited data
    ///
    /// The baud rate byte of a mode D meter says nothing about the mode; the
    /// listener knows it is in mode D because nothing was requested.
    pub fn into_mode_d(mut self) -> Self {
        self.protocol_mode = ProtocolMode::D;
        self
    }

    pub fn manufacturer_id(&self) -> &str {
        &self.manufacturer_id
    }

    pub fn protocol_mode(&self) -> ProtocolMode {
        self.protocol_mode
    }

    /// Baud rate announced by the meter, None in mode A
    pub fn baud_rate(&self) -> Option<u32> {
        self.baud_rate
    }

    pub fn meter_id(&self) -> &str {
        &self.meter_id
    }

    pub fn enhanced_id(&self) -> &str {
        &self.enhanced_id
    }

    /// Human readable meaning of the enhanced identification, if known
    pub fn enhanced_id_description(&self) -> &'static str {
        enhanced_id_description(&self.enhanced_id)
    }
}

/// `"(HDLC)"` for enhanced id `"2"`, empty otherwise
pub fn enhanced_id_description(enhanced_id: &str) -> &'static str {
    if enhanced_id == "2" { "(HDLC)" } else { "" }
}

impl fmt::Display for IdentificationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let baud_rate = self
            .baud_rate
            .map_or_else(|| "-1".to_string(), |baud| baud.to_string());
        write!(
            f,
            "{{\"identification message\": {{\"manufacturer ID\": \"{}\", \"protocol mode\": \"{}\", \"baud rate\": {}, \"meter ID\": \"{}\", \"enhanced ID/capability\": \"{}\"{}}}}}",
            self.manufacturer_id,
            self.protocol_mode,
            baud_rate,
            self.meter_id,
            self.enhanced_id,
            self.enhanced_id_description()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iec21_transport::MemoryTransport;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    async fn parse(bytes: &[u8]) -> Iec21Result<IdentificationMessage> {
        let mut line = MemoryTransport::new(300);
        line.set_timeout(Some(Duration::from_millis(20))).await?;
        line.push_input(bytes.to_vec());
        IdentificationMessage::read(&mut line).await
    }

    #[tokio::test]
    async fn test_mode_c_identification() {
        let msg = assert_ok!(parse(b"/ISk5MT174-0001\r\n").await);
        assert_eq!(msg.manufacturer_id(), "ISk");
        assert_eq!(msg.protocol_mode(), ProtocolMode::C);
        assert_eq!(msg.baud_rate(), Some(9600));
        assert_eq!(msg.meter_id(), "MT174-0001");
        assert_eq!(msg.enhanced_id(), "");
    }

    #[tokio::test]
    async fn test_mode_a_identification() {
        let msg = assert_ok!(parse(b"/LGZ<ZMD\r\n").await);
        assert_eq!(msg.protocol_mode(), ProtocolMode::A);
        assert_eq!(msg.baud_rate(), None);
        assert_eq!(msg.meter_id(), "ZMD");
    }

    #[tokio::test]
    async fn test_enhanced_id() {
        let msg = assert_ok!(parse(b"/ELS5\\2@V5.3\r\n").await);
        assert_eq!(msg.enhanced_id(), "2");
        assert_eq!(msg.enhanced_id_description(), "(HDLC)");
        assert_eq!(msg.meter_id(), "@V5.3");

        let msg = assert_ok!(parse(b"/ELS5\\2\\1ID\r\n").await);
        assert_eq!(msg.enhanced_id(), "21");
        assert_eq!(msg.enhanced_id_description(), "");
    }

    #[tokio::test]
    async fn test_unbounded_enhanced_id_rejected() {
        let mut frame = b"/ELS5".to_vec();
        for _ in 0..=MAX_ENHANCED_ID_LENGTH {
            frame.extend_from_slice(b"\\2");
        }
        frame.extend_from_slice(b"\r\n");
        let err = assert_err!(parse(&frame).await);
        assert!(err.is_framing());
    }

    #[tokio::test]
    async fn test_meter_id_length_boundary() {
        let msg = assert_ok!(parse(b"/XYZ50123456789ABCDEF\r\n").await);
        assert_eq!(msg.meter_id().len(), 16);

        let err = assert_err!(parse(b"/XYZ50123456789ABCDEFG\r\n").await);
        assert!(err.is_framing());
    }

    #[tokio::test]
    async fn test_bad_start_byte() {
        let err = assert_err!(parse(b"XYZ5ID\r\n").await);
        assert!(err.is_framing());
        assert!(err.to_string().contains("0x58"));
    }

    #[tokio::test]
    async fn test_missing_line_feed() {
        let err = assert_err!(parse(b"/XYZ5ID\r\r").await);
        assert!(err.to_string().contains("end byte"));
    }

    #[tokio::test]
    async fn test_truncated_message_times_out() {
        let err = assert_err!(parse(b"/XYZ5ID").await);
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_encode_parses_back() {
        let msg = IdentificationMessage::new("XYZ", ProtocolMode::C, Some(9600), "METER42", "2");
        let parsed = assert_ok!(parse(&msg.encode(b'5')).await);
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_display() {
        let msg = IdentificationMessage::new("LGZ", ProtocolMode::A, None, "ZMD", "");
        let text = msg.to_string();
        assert!(text.contains("\"protocol mode\": \"A\""));
        assert!(text.contains("\"baud rate\": -1"));
        assert!(msg.clone().into_mode_d().to_string().contains("\"D\""));
    }
}
