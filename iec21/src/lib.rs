//! iec21 - Rust implementation of IEC 62056-21 meter readout
//!
//! IEC 62056-21 (formerly IEC 61107) is the optical/serial readout protocol
//! found on most electricity, gas, water and heat meters.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `iec21-core`: Error handling, protocol modes and the baud rate table
//! - `iec21-transport`: Byte stream contract, serial line and in-memory line
//! - `iec21-session`: Messages (request, identification, acknowledge, data) and BCC
//! - `iec21-client`: Communication port, mode D listener and configuration
//!
//! # Usage
//!
//! ```no_run
//! use iec21::{Iec21Config, Iec21Port, ListenEvent};
//!
//! # async fn example() -> iec21::Iec21Result<()> {
//! // Mode A, B or C readout
//! let mut port = Iec21Port::open(Iec21Config::new("/dev/ttyUSB0")).await?;
//! let message = port.read().await?;
//! println!("{}", message);
//! port.close().await?;
//!
//! // Mode D listening
//! let mut port = Iec21Port::open(Iec21Config::new("/dev/ttyUSB1")).await?;
//! let mut events = port.listen().await?;
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ListenEvent::Message(message) => println!("{}", message),
//!         ListenEvent::Error(e) => eprintln!("{}", e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use iec21_core::{
    baud_rate_code, decode_baud_rate_identification, Iec21Error, Iec21Result, ProtocolMode,
};

// Re-export the client API
pub use iec21_client::{Iec21Config, Iec21Port, ListenEvent, SessionState};

// Re-export messages
pub use iec21_session::{DataMessage, DataSet, IdentificationMessage};

pub mod client {
    pub use iec21_client::*;
}

pub mod session {
    pub use iec21_session::*;
}

pub mod transport {
    pub use iec21_transport::*;
}
