//! Session state machine

use iec21_core::{Iec21Error, Iec21Result};
use std::fmt;

/// State of an [`Iec21Port`](crate::Iec21Port)
///
/// # State Transitions
/// ```text
/// Idle -> RequestSent -> IdentificationReceived -> NegotiatingBaud -> DataReceived -> Idle
///                                               -> Direct          ->
/// Idle -> Listening -> Closed
/// any  -> Closed
/// ```
///
/// A failed exchange returns to `Idle` from whatever step it reached, so the
/// next read starts over with a fresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Ready for a request/response exchange (initial state)
    #[default]
    Idle,
    /// Request message has been sent, waiting for the identification
    RequestSent,
    /// Identification has been read, the mode decides what comes next
    IdentificationReceived,
    /// Mode B or C: changing to the baud rate of the data message
    NegotiatingBaud,
    /// Mode A: the data message follows at the current baud rate
    Direct,
    /// Data message has been read, baud rate is being restored
    DataReceived,
    /// Mode D listener owns the line
    Listening,
    /// Port has been closed and cannot be used again
    Closed,
}

impl SessionState {
    /// Check if a request/response exchange or select may start
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// Check if an exchange is in progress
    pub fn is_exchanging(&self) -> bool {
        matches!(
            self,
            SessionState::RequestSent
                | SessionState::IdentificationReceived
                | SessionState::NegotiatingBaud
                | SessionState::Direct
                | SessionState::DataReceived
        )
    }

    /// Validate state transition
    ///
    /// # Valid Transitions
    /// - `Idle` -> `RequestSent`, `Listening`
    /// - `RequestSent` -> `IdentificationReceived`
    /// - `IdentificationReceived` -> `NegotiatingBaud`, `Direct`
    /// - `NegotiatingBaud`, `Direct` -> `DataReceived`
    /// - any exchange step -> `Idle` (done or aborted)
    /// - any state -> `Closed`
    pub fn validate_transition(&self, new_state: SessionState) -> Iec21Result<()> {
        let valid = match (*self, new_state) {
            (SessionState::Idle, SessionState::RequestSent) => true,
            (SessionState::Idle, SessionState::Listening) => true,
            (SessionState::RequestSent, SessionState::IdentificationReceived) => true,
            (SessionState::IdentificationReceived, SessionState::NegotiatingBaud) => true,
            (SessionState::IdentificationReceived, SessionState::Direct) => true,
            (SessionState::NegotiatingBaud, SessionState::DataReceived) => true,
            (SessionState::Direct, SessionState::DataReceived) => true,
            (from, SessionState::Idle) => from.is_idle() || from.is_exchanging(),
            (_, SessionState::Closed) => true,
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(Iec21Error::InvalidState(format!(
                "Invalid state transition: {} -> {}",
                self, new_state
            )))
        }
    }

    /// Move to `new_state` if the transition is valid
    pub fn advance(&mut self, new_state: SessionState) -> Iec21Result<()> {
        self.validate_transition(new_state)?;
        *self = new_state;
        Ok(())
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::RequestSent => "RequestSent",
            SessionState::IdentificationReceived => "IdentificationReceived",
            SessionState::NegotiatingBaud => "NegotiatingBaud",
            SessionState::Direct => "Direct",
            SessionState::DataReceived => "DataReceived",
            SessionState::Listening => "Listening",
            SessionState::Closed => "Closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
