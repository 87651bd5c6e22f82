//! Byte level read helpers shared by the message parsers

use crate::bcc::Bcc;
use crate::error::{Iec21Error, Iec21Result};
use iec21_core::ascii::describe_byte;
use iec21_transport::StreamAccessor;

/// Read one byte and fold it into the accumulator
pub async fn read_byte_with_bcc<S: StreamAccessor + ?Sized>(
    stream: &mut S,
    bcc: &mut Bcc,
) -> Iec21Result<u8> {
    let b = stream.read_byte().await?;
    bcc.update(b);
    Ok(b)
}

/// Read one byte and fail with a framing error unless it equals `expected`
pub async fn expect_byte<S: StreamAccessor + ?Sized>(
    stream: &mut S,
    expected: u8,
    context: &str,
) -> Iec21Result<()> {
    let b = stream.read_byte().await?;
    check_byte(b, expected, context)
}

pub(crate) fn check_byte(received: u8, expected: u8, context: &str) -> Iec21Result<()> {
    if received != expected {
        Err(unexpected_byte(received, context, Some(expected)))
    } else {
        Ok(())
    }
}

pub(crate) fn unexpected_byte(received: u8, context: &str, expected: Option<u8>) -> Iec21Error {
    match expected {
        Some(expected) => Iec21Error::Framing(format!(
            "Received unexpected {}: {}, expected: {}",
            context,
            describe_byte(received),
            describe_byte(expected)
        )),
        None => Iec21Error::Framing(format!(
            "Received unexpected {}: {}",
            context,
            describe_byte(received)
        )),
    }
}
