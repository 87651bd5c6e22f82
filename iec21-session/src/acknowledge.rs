//! Acknowledgement/option select message: `ACK V Z Y CR LF`
//!
//! - `V`: protocol control character
//! - `Z`: baud rate code (mode C table)
//! - `Y`: mode control character

use crate::error::{Iec21Error, Iec21Result};
use iec21_core::mode::baud_rate_code;
use iec21_transport::StreamAccessor;
use std::fmt;

pub const ACK: u8 = 0x06;

/// Protocol control character `V`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolControlCharacter {
    /// Normal protocol procedure
    Normal,
    /// Secondary protocol procedure
    Secondary,
}

impl ProtocolControlCharacter {
    pub fn as_byte(&self) -> u8 {
        match self {
            ProtocolControlCharacter::Normal => b'0',
            ProtocolControlCharacter::Secondary => b'1',
        }
    }
}

/// Mode control character `Y`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcknowledgeMode {
    DataReadout,
    Programming,
    /// Switch to binary mode (HDLC), see enhanced id `"2"`
    BinaryHdlc,
}

impl AcknowledgeMode {
    pub fn as_byte(&self) -> u8 {
        match self {
            AcknowledgeMode::DataReadout => b'0',
            AcknowledgeMode::Programming => b'1',
            AcknowledgeMode::BinaryHdlc => b'2',
        }
    }
}

/// Acknowledge message sent in mode C to select the baud rate and mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcknowledgeMessage {
    baud_rate: u32,
    protocol_control: ProtocolControlCharacter,
    mode: AcknowledgeMode,
    bytes: [u8; 6],
}

impl AcknowledgeMessage {
    /// Create an acknowledge message
    ///
    /// Fails with a configuration error if the baud rate has no mode C code.
    pub fn new(
        baud_rate: u32,
        protocol_control: ProtocolControlCharacter,
        mode: AcknowledgeMode,
    ) -> Iec21Result<Self> {
        let code = baud_rate_code(baud_rate).ok_or_else(|| {
            Iec21Error::Configuration(format!(
                "Baud rate {} has no acknowledge message code",
                baud_rate
            ))
        })?;
        Ok(Self {
            baud_rate,
            protocol_control,
            mode,
            bytes: [ACK, protocol_control.as_byte(), code, mode.as_byte(), b'\r', b'\n'],
        })
    }

    /// Data readout acknowledge with the normal protocol procedure
    pub fn data_readout(baud_rate: u32) -> Iec21Result<Self> {
        Self::new(
            baud_rate,
            ProtocolControlCharacter::Normal,
            AcknowledgeMode::DataReadout,
        )
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn protocol_control(&self) -> ProtocolControlCharacter {
        self.protocol_control
    }

    pub fn mode(&self) -> AcknowledgeMode {
        self.mode
    }

    /// Encoded message, always six bytes
    pub fn encode(&self) -> &[u8; 6] {
        &self.bytes
    }

    /// Write and flush the message
    ///
    /// The flush must complete before the caller changes the baud rate.
    pub async fn send<S: StreamAccessor + ?Sized>(&self, stream: &mut S) -> Iec21Result<()> {
        stream.write_all(&self.bytes).await?;
        stream.flush().await
    }
}

impl fmt::Display for AcknowledgeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"acknowledge message\": {{\"baud rate\": {}, \"protocol control character\": \"{:?}\", \"mode\": \"{:?}\"}}}}",
            self.baud_rate, self.protocol_control, self.mode
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_readout_at_9600() {
        let ack = AcknowledgeMessage::data_readout(9600).unwrap();
        assert_eq!(ack.encode(), &[0x06, b'0', b'5', b'0', b'\r', b'\n']);
    }

    #[test]
    fn test_fixed_rate_300() {
        let ack = AcknowledgeMessage::data_readout(300).unwrap();
        assert_eq!(ack.encode(), b"\x06000\r\n");
    }

    #[test]
    fn test_programming_mode() {
        let ack = AcknowledgeMessage::new(
            19200,
            ProtocolControlCharacter::Secondary,
            AcknowledgeMode::Programming,
        )
        .unwrap();
        assert_eq!(ack.encode(), b"\x06161\r\n");
        assert_eq!(ack.mode(), AcknowledgeMode::Programming);
    }

    #[test]
    fn test_unknown_baud_rate() {
        let err = AcknowledgeMessage::data_readout(115200).unwrap_err();
        assert!(matches!(err, Iec21Error::Configuration(_)));
    }
}
