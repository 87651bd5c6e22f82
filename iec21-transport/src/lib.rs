//! Transport layer module for IEC 62056-21
//!
//! This crate provides the byte stream contract the protocol engine runs on,
//! a serial line implementation and an in-memory line for tests and simulation.

pub mod error;
pub mod memory;
pub mod serial;
pub mod stream;

pub use error::{Iec21Error, Iec21Result};
pub use memory::MemoryTransport;
pub use serial::{SerialSettings, SerialTransport};
pub use stream::{StreamAccessor, TransportLayer};
