//! Byte formatting helpers shared by the message layer

/// Format a single byte as `0xNN`
pub fn hex_byte(b: u8) -> String {
    format!("0x{:02X}", b)
}

/// Format a byte slice as space separated hex pairs
pub fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Describe a byte for error messages: hex value plus the printable character, if any
pub fn describe_byte(b: u8) -> String {
    match b {
        b'\r' => format!("{} ('\\r')", hex_byte(b)),
        b'\n' => format!("{} ('\\n')", hex_byte(b)),
        0x20..=0x7E => format!("{} ('{}')", hex_byte(b), b as char),
        _ => hex_byte(b),
    }
}

/// Convert raw wire bytes to a string, one char per byte
///
/// The protocol is 7-bit ASCII; no charset validation is performed, any byte
/// maps to the char with the same code point.
pub fn ascii_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_formatting() {
        assert_eq!(hex_byte(0x2F), "0x2F");
        assert_eq!(hex_bytes(&[0x06, 0x30, 0x0D]), "06 30 0D");
        assert_eq!(hex_bytes(&[]), "");
    }

    #[test]
    fn test_describe_byte() {
        assert_eq!(describe_byte(b'/'), "0x2F ('/')");
        assert_eq!(describe_byte(b'\r'), "0x0D ('\\r')");
        assert_eq!(describe_byte(0x02), "0x02");
    }

    #[test]
    fn test_ascii_string() {
        assert_eq!(ascii_string(b"ELS"), "ELS");
        assert_eq!(ascii_string(&[]), "");
    }
}
