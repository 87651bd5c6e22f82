//! Request message: `<start characters> <device address> '!' CR LF`

use crate::error::{Iec21Error, Iec21Result};
use iec21_transport::StreamAccessor;
use std::fmt;

/// Start characters used when none are configured
pub const DEFAULT_START_CHARACTERS: &str = "/?";

/// Maximum length of the device address
pub const MAX_DEVICE_ADDRESS_LENGTH: usize = 32;

/// Request message sent to wake up a meter
///
/// The device address is optional (empty string addresses any meter on the line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMessage {
    device_address: String,
    bytes: Vec<u8>,
}

impl RequestMessage {
    /// Create a request with the default start characters
    pub fn new(device_address: &str) -> Iec21Result<Self> {
        Self::with_start_characters(device_address, DEFAULT_START_CHARACTERS)
    }

    /// Create a request with specific start characters
    ///
    /// Empty start characters fall back to `/?`. The address is checked here,
    /// not when sending.
    pub fn with_start_characters(
        device_address: &str,
        start_characters: &str,
    ) -> Iec21Result<Self> {
        if device_address.len() > MAX_DEVICE_ADDRESS_LENGTH {
            return Err(Iec21Error::Configuration(format!(
                "Device address is longer than {} characters: {}",
                MAX_DEVICE_ADDRESS_LENGTH,
                device_address.len()
            )));
        }
        if !device_address.is_ascii() || !start_characters.is_ascii() {
            return Err(Iec21Error::Configuration(
                "Request message must be ASCII".to_string(),
            ));
        }
        let start_characters = if start_characters.is_empty() {
            DEFAULT_START_CHARACTERS
        } else {
            start_characters
        };

        let bytes = format!("{}{}!\r\n", start_characters, device_address).into_bytes();
        Ok(Self {
            device_address: device_address.to_string(),
            bytes,
        })
    }

    pub fn device_address(&self) -> &str {
        &self.device_address
    }

    /// Encoded request
    pub fn encode(&self) -> &[u8] {
        &self.bytes
    }

    /// Write and flush the request
    pub async fn send<S: StreamAccessor + ?Sized>(&self, stream: &mut S) -> Iec21Result<()> {
        stream.write_all(&self.bytes).await?;
        stream.flush().await
    }
}

impl fmt::Display for RequestMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"request message\": {{\"device address\": \"{}\"}}}}",
            self.device_address
        )
    }
}
