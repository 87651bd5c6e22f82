//! Core types and utilities for IEC 62056-21 meter readout
//!
//! This crate provides the error taxonomy, the protocol modes and the
//! baud rate identification table used throughout the implementation.

pub mod ascii;
pub mod error;
pub mod mode;

pub use error::{Iec21Error, Iec21Result};
pub use mode::{
    ProtocolMode, baud_rate_code, decode_baud_rate_identification, DEFAULT_BAUD_RATE_MODE_ABC,
    DEFAULT_BAUD_RATE_MODE_D,
};
