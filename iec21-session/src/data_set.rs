//! Data set: `Address '(' Value ('*' Unit)? ')'`
//!
//! Each of the three fields is optional and may be the empty string.

use crate::bcc::Bcc;
use crate::error::{Iec21Error, Iec21Result};
use crate::reader::{read_byte_with_bcc, unexpected_byte};
use iec21_core::ascii::ascii_string;
use iec21_transport::StreamAccessor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of each data set field
pub const MAX_FIELD_LENGTH: usize = 100;

/// One record of a data block
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataSet {
    address: String,
    value: String,
    unit: String,
}

impl DataSet {
    pub fn new(
        address: impl Into<String>,
        value: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            value: value.into(),
            unit: unit.into(),
        }
    }

    /// Read the next data set, folding every byte into `bcc`
    ///
    /// An optional CR LF may precede the data set. Returns `None` once the
    /// end of block marker `'!'` has been read; the marker is part of the
    /// checksum like every other byte read here.
    pub async fn read<S: StreamAccessor + ?Sized>(
        stream: &mut S,
        bcc: &mut Bcc,
    ) -> Iec21Result<Option<Self>> {
        let mut b = read_byte_with_bcc(stream, bcc).await?;
        if b == b'\r' {
            b = read_byte_with_bcc(stream, bcc).await?;
            if b != b'\n' {
                return Err(unexpected_byte(b, "byte in data block", Some(b'\n')));
            }
            b = read_byte_with_bcc(stream, bcc).await?;
        }
        if b == b'!' {
            return Ok(None);
        }

        let mut buffer = Vec::with_capacity(MAX_FIELD_LENGTH);
        while b != b'(' {
            if buffer.len() == MAX_FIELD_LENGTH {
                return Err(Iec21Error::Framing(format!(
                    "Address too long: expected '(' character not received within {} bytes",
                    MAX_FIELD_LENGTH
                )));
            }
            buffer.push(b);
            b = read_byte_with_bcc(stream, bcc).await?;
        }
        let address = ascii_string(&buffer);

        buffer.clear();
        loop {
            b = read_byte_with_bcc(stream, bcc).await?;
            if b == b'*' || b == b')' {
                break;
            }
            if buffer.len() == MAX_FIELD_LENGTH {
                return Err(Iec21Error::Framing(format!(
                    "Value too long: expected '*' or ')' character not received within {} bytes",
                    MAX_FIELD_LENGTH
                )));
            }
            buffer.push(b);
        }
        let value = ascii_string(&buffer);

        let unit = if b == b')' {
            String::new()
        } else {
            buffer.clear();
            loop {
                b = read_byte_with_bcc(stream, bcc).await?;
                if b == b')' {
                    break;
                }
                if buffer.len() == MAX_FIELD_LENGTH {
                    return Err(Iec21Error::Framing(format!(
                        "Unit too long: expected ')' character not received within {} bytes",
                        MAX_FIELD_LENGTH
                    )));
                }
                buffer.push(b);
            }
            ascii_string(&buffer)
        };

        Ok(Some(Self {
            address,
            value,
            unit,
        }))
    }

    /// Encode the data set without trailing CR LF
    ///
    /// The `'*'` separator is only written for a non-empty unit.
    pub fn encode(&self) -> Vec<u8> {
        let mut result =
            Vec::with_capacity(self.address.len() + self.value.len() + self.unit.len() + 3);
        result.extend(self.address.chars().map(|c| c as u8));
        result.push(b'(');
        result.extend(self.value.chars().map(|c| c as u8));
        if !self.unit.is_empty() {
            result.push(b'*');
            result.extend(self.unit.chars().map(|c| c as u8));
        }
        result.push(b')');
        result
    }

    /// Address of the data set, usually an OBIS code (`A-B:C.D.E*F`) or
    /// an older EDIS code (`C.D.E`)
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Raw value; numeric conversion is left to the caller
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }
}

impl fmt::Display for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"data set\": {{\"address\": \"{}\", \"value\": \"{}\", \"unit\": \"{}\"}}",
            self.address, self.value, self.unit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iec21_transport::MemoryTransport;
    use std::time::Duration;
    use tokio_test::assert_ok;

    async fn read_all(bytes: &[u8]) -> (Iec21Result<Vec<DataSet>>, Bcc) {
        let mut line = MemoryTransport::new(300);
        line.set_timeout(Some(Duration::from_millis(20))).await.unwrap();
        line.push_input(bytes.to_vec());
        let mut bcc = Bcc::new();
        let mut sets = Vec::new();
        loop {
            match DataSet::read(&mut line, &mut bcc).await {
                Ok(Some(set)) => sets.push(set),
                Ok(None) => return (Ok(sets), bcc),
                Err(e) => return (Err(e), bcc),
            }
        }
    }

    #[tokio::test]
    async fn test_full_data_set() {
        let (sets, _) = read_all(b"1.8.0(001234.56*kWh)!").await;
        let sets = assert_ok!(sets);
        assert_eq!(sets, vec![DataSet::new("1.8.0", "001234.56", "kWh")]);
    }

    #[tokio::test]
    async fn test_optional_fields() {
        let (sets, _) = read_all(b"C.1.0(12345678)\r\n()\r\n0.9.1(*h)\r\n!").await;
        let sets = assert_ok!(sets);
        assert_eq!(
            sets,
            vec![
                DataSet::new("C.1.0", "12345678", ""),
                DataSet::new("", "", ""),
                DataSet::new("0.9.1", "", "h"),
            ]
        );
    }

    #[tokio::test]
    async fn test_checksum_covers_every_byte_read() {
        let input = b"\r\n1.8.0(1*kWh)\r\n!";
        let (sets, bcc) = read_all(input).await;
        assert_ok!(sets);
        assert_eq!(bcc.value(), Bcc::of(input));
    }

    #[tokio::test]
    async fn test_carriage_return_without_line_feed() {
        let (sets, _) = read_all(b"\r1.8.0(1)!").await;
        assert!(sets.unwrap_err().is_framing());
    }

    #[tokio::test]
    async fn test_field_length_boundaries() {
        let max = "9".repeat(MAX_FIELD_LENGTH);
        let over = "9".repeat(MAX_FIELD_LENGTH + 1);

        let ok_frames = [
            format!("{}(1*V)!", max),
            format!("A({}*V)!", max),
            format!("A(1*{})!", max),
        ];
        for frame in ok_frames {
            let (sets, _) = read_all(frame.as_bytes()).await;
            assert_eq!(assert_ok!(sets).len(), 1, "frame {}", frame);
        }

        let bad_frames = [
            format!("{}(1*V)!", over),
            format!("A({}*V)!", over),
            format!("A(1*{})!", over),
        ];
        for frame in bad_frames {
            let (sets, _) = read_all(frame.as_bytes()).await;
            assert!(sets.unwrap_err().is_framing(), "frame {}", frame);
        }
    }

    #[tokio::test]
    async fn test_encoded_sets_parse_back() {
        let sets = vec![
            DataSet::new("1-0:1.8.1", "000123.456", "kWh"),
            DataSet::new("0.0.0", "12345678", ""),
            DataSet::new("", "", ""),
            DataSet::new("F.F", "00", ""),
        ];
        let mut block = Vec::new();
        for set in &sets {
            block.extend(set.encode());
            block.extend_from_slice(b"\r\n");
        }
        block.push(b'!');
        let (parsed, _) = read_all(&block).await;
        assert_eq!(assert_ok!(parsed), sets);
    }

    #[test]
    fn test_display() {
        let set = DataSet::new("1.8.0", "42", "kWh");
        assert_eq!(
            set.to_string(),
            "\"data set\": {\"address\": \"1.8.0\", \"value\": \"42\", \"unit\": \"kWh\"}"
        );
    }
}
