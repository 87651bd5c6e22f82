use thiserror::Error;

/// Main error type for IEC 62056-21 operations
#[derive(Error, Debug)]
pub enum Iec21Error {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Timeout")]
    Timeout,

    #[error("Framing error: {0}")]
    Framing(String),

    #[error(
        "Block check character (BCC) does not match. Received: 0x{received:02X}, expected: 0x{expected:02X}"
    )]
    Checksum { received: u8, expected: u8 },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl Iec21Error {
    /// The meter stayed silent for longer than the configured timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Iec21Error::Timeout)
    }

    /// A delimiter or control byte was missing or wrong
    pub fn is_framing(&self) -> bool {
        matches!(self, Iec21Error::Framing(_))
    }

    pub fn is_checksum(&self) -> bool {
        matches!(self, Iec21Error::Checksum { .. })
    }
}

/// Result type alias for IEC 62056-21 operations
pub type Iec21Result<T> = Result<T, Iec21Error>;
