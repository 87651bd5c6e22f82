//! Mode D listener
//!
//! A mode D meter pushes `<identification> <data message>` on its own
//! schedule. The listener task owns the line, reads one frame after the other
//! and hands every result to the receiver returned by
//! [`Iec21Port::listen`](crate::Iec21Port::listen).
//!
//! A broken frame is reported as [`ListenEvent::Error`]; the task then throws
//! away whatever is buffered on the input and waits for the next frame.

use iec21_core::ascii::hex_bytes;
use iec21_core::{Iec21Error, Iec21Result};
use iec21_session::{DataMessage, IdentificationMessage, FRAGMENT_TIMEOUT};
use iec21_transport::{StreamAccessor, TransportLayer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Event delivered by the mode D listener
#[derive(Debug)]
pub enum ListenEvent {
    /// A complete data message was received
    Message(DataMessage),
    /// A frame could not be read; listening continues with the next frame
    Error(Iec21Error),
}

impl ListenEvent {
    pub fn is_message(&self) -> bool {
        matches!(self, ListenEvent::Message(_))
    }

    pub fn into_message(self) -> Option<DataMessage> {
        match self {
            ListenEvent::Message(message) => Some(message),
            ListenEvent::Error(_) => None,
        }
    }

    pub fn into_error(self) -> Option<Iec21Error> {
        match self {
            ListenEvent::Message(_) => None,
            ListenEvent::Error(e) => Some(e),
        }
    }
}

/// Read one mode D frame: identification followed by the data message
pub async fn read_mode_d_frame<S: StreamAccessor + ?Sized>(
    stream: &mut S,
) -> Iec21Result<DataMessage> {
    let identification = IdentificationMessage::read(stream).await?.into_mode_d();
    DataMessage::read_mode_d(stream, &identification, FRAGMENT_TIMEOUT).await
}

/// Background task owning the line while listening
pub(crate) struct ModeDListener<T: TransportLayer> {
    pub(crate) transport: T,
    pub(crate) closed: Arc<AtomicBool>,
    pub(crate) shutdown: watch::Receiver<bool>,
    pub(crate) events: mpsc::Sender<ListenEvent>,
    pub(crate) verbose: bool,
}

impl<T: TransportLayer> ModeDListener<T> {
    pub(crate) async fn run(mut self) {
        log::info!("Listening for mode D messages at {} baud", self.transport.baud_rate());

        loop {
            if self.closed.load(Ordering::Acquire) {
                break;
            }

            let result = tokio::select! {
                _ = self.shutdown.changed() => break,
                result = read_mode_d_frame(&mut self.transport) => result,
            };

            let event = match result {
                Ok(message) => {
                    if self.verbose {
                        log::debug!("Received mode D {}", message);
                    }
                    ListenEvent::Message(message)
                }
                Err(e) => {
                    if self.closed.load(Ordering::Acquire) || self.transport.is_closed() {
                        break;
                    }
                    log::warn!("Error while listening for mode D messages: {}", e);
                    ListenEvent::Error(e)
                }
            };
            let failed = matches!(event, ListenEvent::Error(_));

            let delivered = tokio::select! {
                _ = self.shutdown.changed() => break,
                sent = self.events.send(event) => sent.is_ok(),
            };
            if !delivered {
                log::info!("Listener event receiver dropped");
                break;
            }

            if failed {
                self.resynchronize().await;
            }
        }

        // The line is gone once the task ends, whoever asked for it
        self.closed.store(true, Ordering::Release);
        if let Err(e) = self.transport.close().await {
            log::warn!("Error closing line after listening: {}", e);
        }
        log::info!("Stopped listening for mode D messages");
    }

    /// Discard the rest of a broken frame; failures are ignored
    async fn resynchronize(&mut self) {
        match self.transport.drain_input().await {
            Ok(discarded) if self.verbose && !discarded.is_empty() => {
                log::debug!("Discarded {} bytes: {}", discarded.len(), hex_bytes(&discarded));
            }
            Ok(_) => {}
            Err(e) => {
                if self.verbose {
                    log::debug!("Ignoring error while draining input: {}", e);
                }
            }
        }
    }
}
