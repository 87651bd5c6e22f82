//! Block check character (BCC) calculation

use crate::error::{Iec21Error, Iec21Result};

/// Block check character calculator
///
/// XOR over every byte of the covered span of a mode A/B/C data message.
/// One accumulator covers exactly one frame and is never shared across frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bcc {
    value: u8,
}

impl Bcc {
    /// Create a new accumulator starting at zero
    pub fn new() -> Self {
        Self { value: 0 }
    }

    /// Reset the accumulator to zero
    pub fn reset(&mut self) {
        self.value = 0;
    }

    /// Fold a single byte into the accumulator
    pub fn update(&mut self, data: u8) {
        self.value ^= data;
    }

    /// Fold multiple bytes into the accumulator
    pub fn update_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Compute the BCC of a complete span
    pub fn of(data: &[u8]) -> u8 {
        let mut bcc = Self::new();
        bcc.update_bytes(data);
        bcc.value()
    }

    /// Check the transmitted BCC against the accumulated value
    pub fn validate(&self, received: u8) -> Iec21Result<()> {
        if received != self.value {
            Err(Iec21Error::Checksum {
                received,
                expected: self.value,
            })
        } else {
            Ok(())
        }
    }

    /// Get the current BCC value
    pub fn value(&self) -> u8 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcc_examples() {
        assert_eq!(Bcc::of(&[0x21, 0x32, 0x03, 0x51]), 0x41);
        assert_eq!(
            Bcc::of(&[0x32, 0x31, 0x33, 0x32, 0x30, 0x33, 0x35, 0x31]),
            0x05
        );
    }

    #[test]
    fn test_incremental_matches_whole_span() {
        let data = b"1.8.0(00123.456*kWh)\r\n!\r\n\x03";
        let mut bcc = Bcc::new();
        for &b in data.iter() {
            bcc.update(b);
        }
        let expected = data.iter().fold(0u8, |acc, b| acc ^ b);
        assert_eq!(bcc.value(), expected);
        assert_eq!(Bcc::of(data), expected);
    }

    #[test]
    fn test_bcc_reset() {
        let mut bcc = Bcc::new();
        bcc.update(0x7F);
        bcc.reset();
        assert_eq!(bcc.value(), 0);
        assert_eq!(Bcc::of(&[]), 0);
    }

    #[test]
    fn test_validate_reports_both_values() {
        let mut bcc = Bcc::new();
        bcc.update_bytes(&[0x21, 0x32, 0x03, 0x51]);
        assert!(bcc.validate(0x41).is_ok());
        match bcc.validate(0x42) {
            Err(Iec21Error::Checksum { received, expected }) => {
                assert_eq!(received, 0x42);
                assert_eq!(expected, 0x41);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
