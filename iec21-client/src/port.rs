//! IEC 62056-21 communication port
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use iec21_client::{Iec21Config, Iec21Port};
//!
//! # async fn example() -> iec21_core::Iec21Result<()> {
//! let config = Iec21Config::new("/dev/ttyUSB0").with_baud_rate_change_delay_ms(250);
//! let mut port = Iec21Port::open(config).await?;
//! let message = port.read().await?;
//! for data_set in message.data_sets() {
//!     println!("{} = {} {}", data_set.address(), data_set.value(), data_set.unit());
//! }
//! port.close().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::Iec21Config;
use crate::listener::{ListenEvent, ModeDListener};
use crate::state::SessionState;
use iec21_core::ascii::hex_bytes;
use iec21_core::{Iec21Error, Iec21Result, ProtocolMode};
use iec21_session::{
    AcknowledgeMessage, DataMessage, IdentificationMessage, RequestMessage, SelectMessage,
    SelectReplyMessage,
};
use iec21_transport::{SerialSettings, SerialTransport, StreamAccessor, TransportLayer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Communication port to a single meter
///
/// A port is used either for request/response exchanges (modes A, B and C)
/// through [`read`](Self::read), or it hands its line over to a background
/// task with [`listen`](Self::listen) (mode D). Once listening, only
/// [`close`](Self::close) is allowed.
///
/// A closed port cannot be opened again; create a new one instead.
#[derive(Debug)]
pub struct Iec21Port<T: TransportLayer = SerialTransport> {
    config: Iec21Config,
    request: RequestMessage,
    /// None while the listener task owns the line
    transport: Option<T>,
    state: SessionState,
    closed: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
    listener: Option<JoinHandle<()>>,
}

impl Iec21Port<SerialTransport> {
    /// Open the serial port named in the configuration
    ///
    /// The line starts at the steady state baud rate for modes A, B and C.
    ///
    /// # Errors
    /// Returns `Iec21Error::Configuration` if the configuration is invalid or
    /// the serial port cannot be opened (e.g. it does not exist or is in use).
    pub async fn open(config: Iec21Config) -> Iec21Result<Self> {
        config.validate()?;
        let settings = SerialSettings::with_timeout(
            config.serial_port_name.clone(),
            config.baud_rate_mode_abc(),
            config.timeout(),
        );
        let mut transport = SerialTransport::new(settings);
        transport.open().await?;
        Self::with_transport(config, transport).await
    }
}

impl<T: TransportLayer> Iec21Port<T> {
    /// Create a port on an already opened transport
    ///
    /// The configured read timeout is applied to the transport. The
    /// serial port name is only checked for being non-empty.
    pub async fn with_transport(config: Iec21Config, mut transport: T) -> Iec21Result<Self> {
        config.validate()?;
        let request = config.request_message()?;
        transport.set_timeout(config.timeout()).await?;
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            config,
            request,
            transport: Some(transport),
            state: SessionState::Idle,
            closed: Arc::new(AtomicBool::new(false)),
            shutdown,
            listener: None,
        })
    }

    pub fn config(&self) -> &Iec21Config {
        &self.config
    }

    /// Current state; `Closed` as soon as the listener has given up the line
    pub fn state(&self) -> SessionState {
        if self.is_closed() {
            SessionState::Closed
        } else {
            self.state
        }
    }

    /// Check if the port has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_idle(&self, operation: &str) -> Iec21Result<()> {
        if self.is_closed() {
            return Err(Iec21Error::InvalidState("Port is closed".to_string()));
        }
        if !self.state.is_idle() {
            return Err(Iec21Error::InvalidState(format!(
                "Cannot {} while port is {}",
                operation, self.state
            )));
        }
        Ok(())
    }

    fn transport_mut(transport: &mut Option<T>) -> Iec21Result<&mut T> {
        transport
            .as_mut()
            .ok_or_else(|| Iec21Error::InvalidState("Line is owned by the listener".to_string()))
    }

    /// Request a data message from the meter (mode A, B or C)
    ///
    /// Sends the request message, reads the identification and, depending on
    /// the mode it announces, acknowledges and changes the baud rate before
    /// reading the data message. The line is back at the steady state baud
    /// rate when this returns successfully.
    ///
    /// # Errors
    /// - `Iec21Error::InvalidState` if the port is closed or listening
    /// - `Iec21Error::Timeout` if the meter does not answer in time
    /// - `Iec21Error::Framing` or `Iec21Error::Checksum` for malformed replies
    pub async fn read(&mut self) -> Iec21Result<DataMessage> {
        self.ensure_idle("read")?;
        let transport = Self::transport_mut(&mut self.transport)?;

        let result = exchange(transport, &self.config, &self.request, &mut self.state).await;
        self.state.advance(SessionState::Idle)?;
        result
    }

    /// Send a manufacturer specific select message and read the reply
    ///
    /// The message is sent at the current baud rate, usually right after
    /// the port was opened.
    pub async fn select(&mut self, manufacturer_data: &str) -> Iec21Result<SelectReplyMessage> {
        self.ensure_idle("select")?;
        let message = SelectMessage::new(manufacturer_data)?;
        let transport = Self::transport_mut(&mut self.transport)?;

        if self.config.verbose {
            log::debug!("Sending {}: {}", message, hex_bytes(message.encode()));
        }
        message.send(transport).await?;

        let reply = SelectReplyMessage::read(transport).await?;
        if self.config.verbose {
            log::debug!("Received {}", reply);
        }
        Ok(reply)
    }

    /// Close the port
    ///
    /// Stops the listener, if any, and closes the line. Closing twice is
    /// allowed; the line is closed again each time.
    pub async fn close(&mut self) -> Iec21Result<()> {
        self.closed.store(true, Ordering::Release);
        self.shutdown.send_replace(true);
        self.state.advance(SessionState::Closed)?;

        if let Some(listener) = self.listener.take() {
            if let Err(e) = listener.await {
                log::warn!("Listener task ended abnormally: {}", e);
            }
        }
        match self.transport.as_mut() {
            Some(transport) => transport.close().await,
            None => Ok(()),
        }
    }
}

impl<T: TransportLayer + 'static> Iec21Port<T> {
    /// Listen for mode D messages
    ///
    /// The line is switched to the mode D baud rate with no read timeout and
    /// handed to a background task. Every data message, and every frame that
    /// could not be read, is delivered through the returned receiver. The task
    /// runs until the port is closed or the receiver is dropped.
    ///
    /// # Errors
    /// Returns `Iec21Error::InvalidState` if the port is closed or already
    /// listening.
    pub async fn listen(&mut self) -> Iec21Result<mpsc::Receiver<ListenEvent>> {
        self.ensure_idle("listen")?;
        let transport = Self::transport_mut(&mut self.transport)?;

        transport.set_timeout(None).await?;
        let baud_rate = self.config.baud_rate_mode_d();
        if transport.baud_rate() != baud_rate {
            if self.config.verbose {
                log::debug!("Changing baud rate from {} to {}", transport.baud_rate(), baud_rate);
            }
            transport.set_baud_rate(baud_rate).await?;
        }

        let transport = self
            .transport
            .take()
            .ok_or_else(|| Iec21Error::InvalidState("Line is owned by the listener".to_string()))?;
        self.state.advance(SessionState::Listening)?;

        let (events, receiver) = mpsc::channel(self.config.listen_channel_capacity);
        let listener = ModeDListener {
            transport,
            closed: self.closed.clone(),
            shutdown: self.shutdown.subscribe(),
            events,
            verbose: self.config.verbose,
        };
        self.listener = Some(tokio::spawn(listener.run()));

        Ok(receiver)
    }
}

async fn restore_baud_rate<T: StreamAccessor + ?Sized>(
    transport: &mut T,
    config: &Iec21Config,
) -> Iec21Result<()> {
    let baud_rate = config.baud_rate_mode_abc();
    if transport.baud_rate() != baud_rate {
        if config.verbose {
            log::debug!("Changing baud rate from {} to {}", transport.baud_rate(), baud_rate);
        }
        transport.set_baud_rate(baud_rate).await?;
    }
    Ok(())
}

/// One request/response exchange, advancing `state` step by step
async fn exchange<T: StreamAccessor + ?Sized>(
    transport: &mut T,
    config: &Iec21Config,
    request: &RequestMessage,
    state: &mut SessionState,
) -> Iec21Result<DataMessage> {
    restore_baud_rate(transport, config).await?;

    let stale = transport.drain_input().await?;
    if config.verbose && !stale.is_empty() {
        log::debug!("Cleared input stream. Bytes read from stream: {}", hex_bytes(&stale));
    }

    if config.verbose {
        log::debug!("Sending {}: {}", request, hex_bytes(request.encode()));
    }
    request.send(transport).await?;
    state.advance(SessionState::RequestSent)?;

    let identification = IdentificationMessage::read(transport).await?;
    if config.verbose {
        log::debug!("Received {}", identification);
    }
    state.advance(SessionState::IdentificationReceived)?;

    let offered = identification.baud_rate();
    match identification.protocol_mode() {
        ProtocolMode::C => {
            state.advance(SessionState::NegotiatingBaud)?;
            let offered = offered.ok_or_else(|| {
                Iec21Error::Framing("Mode C identification without baud rate".to_string())
            })?;
            let requested = if config.fixed_baud_rate {
                transport.baud_rate()
            } else {
                offered
            };
            let acknowledge = AcknowledgeMessage::data_readout(requested)?;
            if config.verbose {
                log::debug!("Sending {}: {}", acknowledge, hex_bytes(acknowledge.encode()));
            }
            acknowledge.send(transport).await?;

            if !config.fixed_baud_rate {
                let delay = config.baud_rate_change_delay();
                if !delay.is_zero() {
                    if config.verbose {
                        log::debug!(
                            "Sleeping for {}ms before changing the baud rate",
                            delay.as_millis()
                        );
                    }
                    tokio::time::sleep(delay).await;
                }
                if config.verbose {
                    log::debug!("Changing baud rate from {} to {}", transport.baud_rate(), offered);
                }
                transport.set_baud_rate(offered).await?;
            }
        }
        ProtocolMode::B => {
            state.advance(SessionState::NegotiatingBaud)?;
            if let Some(offered) = offered {
                if config.verbose {
                    log::debug!("Changing baud rate from {} to {}", transport.baud_rate(), offered);
                }
                transport.set_baud_rate(offered).await?;
            }
        }
        ProtocolMode::A | ProtocolMode::D => state.advance(SessionState::Direct)?,
    }

    let message = DataMessage::read_mode_abc(transport, &identification).await?;
    if config.verbose {
        log::debug!("Received data message with {} data sets", message.data_sets().len());
    }
    state.advance(SessionState::DataReceived)?;

    restore_baud_rate(transport, config).await?;
    Ok(message)
}
