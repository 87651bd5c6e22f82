//! Port configuration
//!
//! A single plain struct with documented defaults. It can be embedded in an
//! application configuration file through serde; missing fields take their
//! default value.
//!
//! # Usage Example
//!
//! ```rust
//! use iec21_client::Iec21Config;
//!
//! let config = Iec21Config::new("/dev/ttyUSB0")
//!     .with_timeout_ms(2000)
//!     .with_device_address("12345678")
//!     .with_baud_rate_change_delay_ms(250);
//! assert!(config.validate().is_ok());
//! ```

use iec21_core::{
    baud_rate_code, Iec21Error, Iec21Result, DEFAULT_BAUD_RATE_MODE_ABC, DEFAULT_BAUD_RATE_MODE_D,
};
use iec21_session::{RequestMessage, DEFAULT_START_CHARACTERS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default read timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default capacity of the listener event channel
pub const DEFAULT_LISTEN_CHANNEL_CAPACITY: usize = 16;

/// Configuration of an [`Iec21Port`](crate::Iec21Port)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Iec21Config {
    /// Serial port name (e.g. "/dev/ttyUSB0" or "COM1")
    pub serial_port_name: String,
    /// Steady state baud rate. None selects 300 for request/response
    /// sessions and 2400 for listening.
    pub initial_baud_rate: Option<u32>,
    /// Pause between sending the acknowledge message and switching the
    /// baud rate. Some USB to serial adapters need it to flush the
    /// acknowledge at the old speed.
    pub baud_rate_change_delay_ms: u64,
    /// Read timeout; 0 blocks forever
    pub timeout_ms: u64,
    /// Device address sent in the request message, empty for any meter
    pub device_address: String,
    /// Start characters of the request message
    pub request_start_characters: String,
    /// Keep the initial baud rate instead of the one suggested by the meter
    pub fixed_baud_rate: bool,
    /// Log every message sent and received at debug level
    pub verbose: bool,
    /// Number of listener events buffered before the listener waits for the receiver
    pub listen_channel_capacity: usize,
}

impl Default for Iec21Config {
    fn default() -> Self {
        Self {
            serial_port_name: String::new(),
            initial_baud_rate: None,
            baud_rate_change_delay_ms: 0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            device_address: String::new(),
            request_start_characters: DEFAULT_START_CHARACTERS.to_string(),
            fixed_baud_rate: false,
            verbose: false,
            listen_channel_capacity: DEFAULT_LISTEN_CHANNEL_CAPACITY,
        }
    }
}

impl Iec21Config {
    /// Create a configuration with default settings for the given port
    pub fn new(serial_port_name: impl Into<String>) -> Self {
        Self {
            serial_port_name: serial_port_name.into(),
            ..Self::default()
        }
    }

    pub fn with_initial_baud_rate(mut self, baud_rate: u32) -> Self {
        self.initial_baud_rate = Some(baud_rate);
        self
    }

    pub fn with_baud_rate_change_delay_ms(mut self, delay_ms: u64) -> Self {
        self.baud_rate_change_delay_ms = delay_ms;
        self
    }

    /// Set the read timeout, 0 for no timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_device_address(mut self, device_address: impl Into<String>) -> Self {
        self.device_address = device_address.into();
        self
    }

    pub fn with_request_start_characters(mut self, start_characters: impl Into<String>) -> Self {
        self.request_start_characters = start_characters.into();
        self
    }

    pub fn with_fixed_baud_rate(mut self, fixed_baud_rate: bool) -> Self {
        self.fixed_baud_rate = fixed_baud_rate;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_listen_channel_capacity(mut self, capacity: usize) -> Self {
        self.listen_channel_capacity = capacity;
        self
    }

    /// Check every setting before any byte is exchanged
    ///
    /// # Errors
    /// Returns `Iec21Error::Configuration` if:
    /// - The serial port name is empty
    /// - The initial baud rate is zero
    /// - The baud rate is fixed but has no code for the acknowledge message
    /// - The device address is longer than 32 characters or not ASCII
    /// - The listener channel capacity is zero
    pub fn validate(&self) -> Iec21Result<()> {
        if self.serial_port_name.is_empty() {
            return Err(Iec21Error::Configuration(
                "Serial port name must not be empty".to_string(),
            ));
        }
        if self.initial_baud_rate == Some(0) {
            return Err(Iec21Error::Configuration(
                "Initial baud rate must not be zero".to_string(),
            ));
        }
        if self.fixed_baud_rate && baud_rate_code(self.baud_rate_mode_abc()).is_none() {
            return Err(Iec21Error::Configuration(format!(
                "Fixed baud rate {} cannot be requested in an acknowledge message",
                self.baud_rate_mode_abc()
            )));
        }
        if self.listen_channel_capacity == 0 {
            return Err(Iec21Error::Configuration(
                "Listen channel capacity must not be zero".to_string(),
            ));
        }
        self.request_message().map(|_| ())
    }

    /// Build the request message described by this configuration
    pub fn request_message(&self) -> Iec21Result<RequestMessage> {
        RequestMessage::with_start_characters(&self.device_address, &self.request_start_characters)
    }

    /// Steady state baud rate for request/response exchanges
    pub fn baud_rate_mode_abc(&self) -> u32 {
        self.initial_baud_rate.unwrap_or(DEFAULT_BAUD_RATE_MODE_ABC)
    }

    /// Baud rate used while listening for mode D messages
    pub fn baud_rate_mode_d(&self) -> u32 {
        self.initial_baud_rate.unwrap_or(DEFAULT_BAUD_RATE_MODE_D)
    }

    /// Read timeout, None when `timeout_ms` is 0
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    pub fn baud_rate_change_delay(&self) -> Duration {
        Duration::from_millis(self.baud_rate_change_delay_ms)
    }
}
