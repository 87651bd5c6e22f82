//! Data message carrying the readout of a meter
//!
//! Mode A, B and C: `STX <data block> '!' CR LF ETX BCC`
//!
//! Mode D: `CR LF <data block> '!' CR LF`, without checksum.

use crate::bcc::Bcc;
use crate::data_set::DataSet;
use crate::error::Iec21Result;
use crate::identification::{enhanced_id_description, IdentificationMessage};
use crate::reader::{check_byte, expect_byte};
use iec21_transport::StreamAccessor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Start of text
pub const STX: u8 = 0x02;

/// End of text
pub const ETX: u8 = 0x03;

/// Read timeout applied between the fragments of a mode D message
pub const FRAGMENT_TIMEOUT: Duration = Duration::from_millis(500);

/// A complete readout together with the identification of the meter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMessage {
    manufacturer_id: String,
    meter_id: String,
    enhanced_id: String,
    data_sets: Vec<DataSet>,
}

impl DataMessage {
    pub fn new(
        manufacturer_id: impl Into<String>,
        meter_id: impl Into<String>,
        enhanced_id: impl Into<String>,
        data_sets: Vec<DataSet>,
    ) -> Self {
        Self {
            manufacturer_id: manufacturer_id.into(),
            meter_id: meter_id.into(),
            enhanced_id: enhanced_id.into(),
            data_sets,
        }
    }

    fn from_identification(
        identification: &IdentificationMessage,
        data_sets: Vec<DataSet>,
    ) -> Self {
        Self::new(
            identification.manufacturer_id(),
            identification.meter_id(),
            identification.enhanced_id(),
            data_sets,
        )
    }

    /// Read a mode A, B or C data message and verify its block check character
    ///
    /// The BCC covers the data block up to and including `'!'` plus the
    /// trailing CR LF ETX; the STX is not covered.
    pub async fn read_mode_abc<S: StreamAccessor + ?Sized>(
        stream: &mut S,
        identification: &IdentificationMessage,
    ) -> Iec21Result<Self> {
        let b = stream.read_byte().await?;
        check_byte(b, STX, "data message start byte")?;

        let mut bcc = Bcc::new();
        let mut data_sets = Vec::new();
        while let Some(data_set) = DataSet::read(stream, &mut bcc).await? {
            data_sets.push(data_set);
        }

        expect_byte(stream, b'\r', "byte at end of data message").await?;
        expect_byte(stream, b'\n', "byte at end of data message").await?;
        expect_byte(stream, ETX, "byte at end of data message").await?;
        bcc.update_bytes(&[b'\r', b'\n', ETX]);

        let received = stream.read_byte().await?;
        bcc.validate(received)?;

        Ok(Self::from_identification(identification, data_sets))
    }

    /// Read a mode D data message
    ///
    /// Once the first CR has arrived the read timeout is lowered to
    /// `fragment_timeout` and put back to its previous value afterwards,
    /// whether the message could be read or not.
    pub async fn read_mode_d<S: StreamAccessor + ?Sized>(
        stream: &mut S,
        identification: &IdentificationMessage,
        fragment_timeout: Duration,
    ) -> Iec21Result<Self> {
        let b = stream.read_byte().await?;
        check_byte(b, b'\r', "byte at beginning of data message")?;

        let steady_timeout = stream.timeout();
        stream.set_timeout(Some(fragment_timeout)).await?;

        let result = Self::read_mode_d_block(stream, identification).await;
        let restored = stream.set_timeout(steady_timeout).await;

        let message = result?;
        restored?;
        Ok(message)
    }

    async fn read_mode_d_block<S: StreamAccessor + ?Sized>(
        stream: &mut S,
        identification: &IdentificationMessage,
    ) -> Iec21Result<Self> {
        expect_byte(stream, b'\n', "byte at beginning of data message").await?;

        // Mode D carries no BCC, the accumulator is never checked
        let mut bcc = Bcc::new();
        let mut data_sets = Vec::new();
        while let Some(data_set) = DataSet::read(stream, &mut bcc).await? {
            data_sets.push(data_set);
        }

        expect_byte(stream, b'\r', "byte at end of data message").await?;
        expect_byte(stream, b'\n', "byte at end of data message").await?;

        Ok(Self::from_identification(identification, data_sets))
    }

    fn encode_data_block(&self) -> Vec<u8> {
        let mut block = Vec::new();
        for data_set in &self.data_sets {
            block.extend(data_set.encode());
            block.extend_from_slice(b"\r\n");
        }
        block.push(b'!');
        block.extend_from_slice(b"\r\n");
        block
    }

    /// Encode the data message as a mode A, B or C meter would send it
    pub fn encode_mode_abc(&self) -> Vec<u8> {
        let mut frame = vec![STX];
        frame.extend(self.encode_data_block());
        frame.push(ETX);
        frame.push(Bcc::of(&frame[1..]));
        frame
    }

    /// Encode the data message as a mode D meter would send it
    pub fn encode_mode_d(&self) -> Vec<u8> {
        let mut frame = b"\r\n".to_vec();
        frame.extend(self.encode_data_block());
        frame
    }

    pub fn manufacturer_id(&self) -> &str {
        &self.manufacturer_id
    }

    /// Device identification without the enhanced identification characters
    pub fn meter_id(&self) -> &str {
        &self.meter_id
    }

    pub fn enhanced_id(&self) -> &str {
        &self.enhanced_id
    }

    pub fn data_sets(&self) -> &[DataSet] {
        &self.data_sets
    }

    pub fn into_data_sets(self) -> Vec<DataSet> {
        self.data_sets
    }
}

impl fmt::Display for DataMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\n\t\"data message\": {{\n\t\t\"manufacturer ID\": \"{}\",\n\t\t\"meter ID\": \"{}\",\n\t\t\"enhanced ID/capability\": \"{}\"{},\n\t\t\"data block\": {{",
            self.manufacturer_id,
            self.meter_id,
            self.enhanced_id,
            enhanced_id_description(&self.enhanced_id)
        )?;
        for (i, data_set) in self.data_sets.iter().enumerate() {
            let separator = if i + 1 < self.data_sets.len() { "," } else { "" };
            write!(f, "\n\t\t\t{}{}", data_set, separator)?;
        }
        write!(f, "\n\t\t}}\n\t}}\n}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iec21_core::ProtocolMode;
    use iec21_transport::MemoryTransport;
    use tokio_test::{assert_err, assert_ok};

    fn identification() -> IdentificationMessage {
        IdentificationMessage::new("XYZ", ProtocolMode::C, Some(9600), "METER01", "")
    }

    async fn line_with(bytes: &[u8]) -> MemoryTransport {
        let mut line = MemoryTransport::new(9600);
        line.set_timeout(Some(Duration::from_millis(20))).await.unwrap();
        line.push_input(bytes.to_vec());
        line
    }

    fn sample() -> DataMessage {
        DataMessage::new(
            "XYZ",
            "METER01",
            "",
            vec![
                DataSet::new("1.8.0", "00123.456", "kWh"),
                DataSet::new("C.1.0", "12345678", ""),
                DataSet::new("", "", ""),
            ],
        )
    }

    #[tokio::test]
    async fn test_mode_abc_frame() {
        let mut frame = vec![STX];
        frame.extend_from_slice(b"1.8.0(00123.456*kWh)\r\n!\r\n\x03");
        frame.push(Bcc::of(&frame[1..]));

        let mut line = line_with(&frame).await;
        let msg = assert_ok!(DataMessage::read_mode_abc(&mut line, &identification()).await);
        assert_eq!(msg.manufacturer_id(), "XYZ");
        assert_eq!(msg.meter_id(), "METER01");
        assert_eq!(msg.data_sets(), &[DataSet::new("1.8.0", "00123.456", "kWh")]);
        assert_eq!(line.remaining_input(), 0);
    }

    #[tokio::test]
    async fn test_encoded_mode_abc_parses_back() {
        let msg = sample();
        let mut line = line_with(&msg.encode_mode_abc()).await;
        let parsed = assert_ok!(DataMessage::read_mode_abc(&mut line, &identification()).await);
        assert_eq!(parsed, msg);
    }

    #[tokio::test]
    async fn test_checksum_mismatch() {
        let mut frame = sample().encode_mode_abc();
        let last = frame.len() - 1;
        frame[last] ^= 0x01;

        let mut line = line_with(&frame).await;
        let err = assert_err!(DataMessage::read_mode_abc(&mut line, &identification()).await);
        assert!(err.is_checksum());
        assert_eq!(
            err.to_string(),
            format!(
                "Block check character (BCC) does not match. Received: 0x{:02X}, expected: 0x{:02X}",
                frame[last],
                frame[last] ^ 0x01
            )
        );
    }

    #[tokio::test]
    async fn test_missing_stx() {
        let frame = sample().encode_mode_abc();
        let mut line = line_with(&frame[1..]).await;
        let err = assert_err!(DataMessage::read_mode_abc(&mut line, &identification()).await);
        assert!(err.is_framing());
        assert!(err.to_string().contains("start byte"));
    }

    #[tokio::test]
    async fn test_missing_etx() {
        let mut line = line_with(b"\x021.8.0(1)\r\n!\r\n\x04\x00").await;
        let err = assert_err!(DataMessage::read_mode_abc(&mut line, &identification()).await);
        assert!(err.is_framing());
        assert!(err.to_string().contains("0x04"));
    }

    #[tokio::test]
    async fn test_mode_d_frame() {
        let mut line = line_with(b"\r\n1.8.0(001234.56*kWh)\r\n!\r\n").await;
        line.set_timeout(None).await.unwrap();
        let id = identification().into_mode_d();
        let msg = assert_ok!(DataMessage::read_mode_d(&mut line, &id, FRAGMENT_TIMEOUT).await);
        assert_eq!(msg.data_sets(), &[DataSet::new("1.8.0", "001234.56", "kWh")]);
        assert_eq!(line.remaining_input(), 0);
        assert_eq!(line.timeout(), None);
        assert_eq!(
            line.timeout_history(),
            vec![Some(Duration::from_millis(20)), None, Some(FRAGMENT_TIMEOUT), None]
        );
    }

    #[tokio::test]
    async fn test_mode_d_restores_timeout_on_failure() {
        let mut line = line_with(b"\r\n1.8.0(1)\r\n!\r\r").await;
        line.set_timeout(None).await.unwrap();
        let err = assert_err!(
            DataMessage::read_mode_d(&mut line, &identification(), Duration::from_millis(10)).await
        );
        assert!(err.is_framing());
        assert_eq!(line.timeout(), None);
    }

    #[tokio::test]
    async fn test_mode_d_truncated_frame_times_out() {
        let mut line = line_with(b"\r\n1.8.0(1").await;
        line.set_timeout(None).await.unwrap();
        let err = assert_err!(
            DataMessage::read_mode_d(&mut line, &identification(), Duration::from_millis(10)).await
        );
        assert!(err.is_timeout());
        assert_eq!(line.timeout(), None);
    }

    #[tokio::test]
    async fn test_encoded_mode_d_parses_back() {
        let msg = sample();
        let mut line = line_with(&msg.encode_mode_d()).await;
        let parsed = assert_ok!(
            DataMessage::read_mode_d(&mut line, &identification(), FRAGMENT_TIMEOUT).await
        );
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_display() {
        let text = sample().to_string();
        assert!(text.starts_with("{\n\t\"data message\": {"));
        assert!(text.contains("\"manufacturer ID\": \"XYZ\""));
        assert!(text.contains("\"address\": \"1.8.0\""));
        assert!(text.ends_with("}\n\t}\n}"));
    }
}
