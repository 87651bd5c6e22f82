//! Message layer for IEC 62056-21
//!
//! This crate provides parsers and encoders for every message exchanged with a
//! meter in modes A, B, C and D, plus the block check character (BCC).
//!
//! # Messages
//!
//! - [x] Request message (client to meter)
//! - [x] Identification message (meter to client)
//! - [x] Acknowledge/option select message (client to meter, mode C)
//! - [x] Data message with BCC (modes A, B, C)
//! - [x] Data message without BCC (mode D)
//! - [x] Manufacturer specific select message and reply
//! - [ ] Programming mode commands (P0/R1/W1/B0)

pub mod acknowledge;
pub mod bcc;
pub mod data_message;
pub mod data_set;
pub mod error;
pub mod identification;
pub mod reader;
pub mod request;
pub mod select;

pub use acknowledge::{AcknowledgeMessage, AcknowledgeMode, ProtocolControlCharacter, ACK};
pub use bcc::Bcc;
pub use data_message::{DataMessage, ETX, FRAGMENT_TIMEOUT, STX};
pub use data_set::{DataSet, MAX_FIELD_LENGTH};
pub use error::{Iec21Error, Iec21Result};
pub use identification::{enhanced_id_description, IdentificationMessage};
pub use request::{RequestMessage, DEFAULT_START_CHARACTERS, MAX_DEVICE_ADDRESS_LENGTH};
pub use select::{SelectMessage, SelectReplyMessage};
