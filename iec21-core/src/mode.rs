//! Protocol modes and the baud rate identification table

use serde::{Deserialize, Serialize};
use std::fmt;

/// Initial baud rate for request/response sessions (modes A, B and C)
pub const DEFAULT_BAUD_RATE_MODE_ABC: u32 = 300;

/// Baud rate at which mode D meters push their data
pub const DEFAULT_BAUD_RATE_MODE_D: u32 = 2400;

/// IEC 62056-21 communication mode
///
/// - `A`: readout at a fixed baud rate
/// - `B`: the meter switches to the baud rate it announces
/// - `C`: the baud rate is negotiated with an acknowledge message
/// - `D`: the meter transmits periodically without being asked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolMode {
    A,
    B,
    C,
    D,
}

impl fmt::Display for ProtocolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolMode::A => "A",
            ProtocolMode::B => "B",
            ProtocolMode::C => "C",
            ProtocolMode::D => "D",
        };
        f.write_str(name)
    }
}

/// Mode B codes, index = position in 'A'..='F'
const MODE_B_BAUD_RATES: [u32; 6] = [600, 1200, 2400, 4800, 9600, 19200];

/// Mode C codes, index = position in '0'..='6'
const MODE_C_BAUD_RATES: [u32; 7] = [300, 600, 1200, 2400, 4800, 9600, 19200];

/// Decode the baud rate identification byte of an identification message
///
/// Returns the announced baud rate and the mode it implies. Any byte outside
/// the table selects mode A, which has no baud rate negotiation (`None`).
/// Mode D is never produced here.
pub fn decode_baud_rate_identification(byte: u8) -> (Option<u32>, ProtocolMode) {
    match byte {
        b'A'..=b'F' => (
            Some(MODE_B_BAUD_RATES[(byte - b'A') as usize]),
            ProtocolMode::B,
        ),
        b'0'..=b'6' => (
            Some(MODE_C_BAUD_RATES[(byte - b'0') as usize]),
            ProtocolMode::C,
        ),
        _ => (None, ProtocolMode::A),
    }
}

/// Baud rate code sent in a mode C acknowledge message
///
/// Inverse of the mode C part of [`decode_baud_rate_identification`].
pub fn baud_rate_code(baud_rate: u32) -> Option<u8> {
    MODE_C_BAUD_RATES
        .iter()
        .position(|&rate| rate == baud_rate)
        .map(|index| b'0' + index as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_codes() {
        let expected = [
            (b'A', 600, ProtocolMode::B),
            (b'B', 1200, ProtocolMode::B),
            (b'C', 2400, ProtocolMode::B),
            (b'D', 4800, ProtocolMode::B),
            (b'E', 9600, ProtocolMode::B),
            (b'F', 19200, ProtocolMode::B),
            (b'0', 300, ProtocolMode::C),
            (b'1', 600, ProtocolMode::C),
            (b'2', 1200, ProtocolMode::C),
            (b'3', 2400, ProtocolMode::C),
            (b'4', 4800, ProtocolMode::C),
            (b'5', 9600, ProtocolMode::C),
            (b'6', 19200, ProtocolMode::C),
        ];
        for (code, baud, mode) in expected {
            assert_eq!(
                decode_baud_rate_identification(code),
                (Some(baud), mode),
                "code {}",
                code as char
            );
        }
    }

    #[test]
    fn test_undefined_codes_select_mode_a() {
        for code in [b'7', b'8', b'9', b'G', b'Z', b'a', b'/', 0x00, 0xFF] {
            assert_eq!(decode_baud_rate_identification(code), (None, ProtocolMode::A));
        }
    }

    #[test]
    fn test_codes_do_not_collide() {
        let mut seen = std::collections::HashSet::new();
        for code in (b'0'..=b'9').chain(b'A'..=b'F') {
            if let (Some(baud), mode) = decode_baud_rate_identification(code) {
                assert!(seen.insert((baud, mode)), "duplicate entry for {}", code as char);
            }
        }
        assert_eq!(seen.len(), 13);
    }

    #[test]
    fn test_baud_rate_code_inverse() {
        for code in b'0'..=b'6' {
            let (baud, _) = decode_baud_rate_identification(code);
            assert_eq!(baud.and_then(baud_rate_code), Some(code));
        }
        assert_eq!(baud_rate_code(115200), None);
    }
}
