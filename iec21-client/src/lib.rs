//! IEC 62056-21 client implementation
//!
//! This crate provides the communication port used to read meters in modes
//! A, B and C and to listen for mode D messages.
//!
//! ## Port
//! - [x] Configuration with defaults and eager validation
//! - [x] Request/response readout (modes A, B, C)
//! - [x] Baud rate negotiation with optional change delay
//! - [x] Mode D listener with resynchronization after broken frames
//! - [x] Manufacturer specific select message
//! - [x] Session state management
//! - [ ] Programming mode (password and register access)

pub mod config;
pub mod listener;
pub mod port;
pub mod state;

pub use config::Iec21Config;
pub use listener::{read_mode_d_frame, ListenEvent};
pub use port::Iec21Port;
pub use state::SessionState;
