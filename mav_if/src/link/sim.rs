//! # Simulated link driver
//!
//! Stands in for the physical autopilot transport during bench sessions.
//! Every command is recorded in send order and acknowledged as accepted
//! unless a fault has been queued, which makes this driver double as the test
//! double for the override state machine.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use std::collections::VecDeque;
use std::time::Duration;

// Internal
use super::{LinkDriver, LinkError};
use crate::cmd::{AckResult, CommandAck, CommandLong, FlightMode};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A simulated link driver.
pub struct SimDriver {
    /// Every command sent over the link, in order.
    sent: Vec<CommandLong>,

    /// Errors to return from upcoming sends, front first.
    send_errors: VecDeque<LinkError>,

    /// Results to attach to upcoming acks, front first. `Accepted` when
    /// empty.
    ack_results: VecDeque<AckResult>,

    /// Flight mode reported to the control software.
    flight_mode: FlightMode,

    /// If true the handshake will time out instead of succeeding.
    handshake_fails: bool,

    /// If true every send and ack fails with `Disconnected`.
    disconnected: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimDriver {
    /// Create a new simulated driver with an immediate heartbeat and a
    /// mission running in `Auto`.
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            send_errors: VecDeque::new(),
            ack_results: VecDeque::new(),
            flight_mode: FlightMode::Auto,
            handshake_fails: false,
            disconnected: false,
        }
    }

    /// Every command sent so far, in order.
    pub fn sent(&self) -> &[CommandLong] {
        &self.sent
    }

    /// Queue an error for an upcoming send.
    pub fn queue_send_error(&mut self, error: LinkError) {
        self.send_errors.push_back(error);
    }

    /// Queue a result for an upcoming acknowledgement.
    pub fn queue_ack_result(&mut self, result: AckResult) {
        self.ack_results.push_back(result);
    }

    /// Make the connection handshake time out.
    pub fn fail_handshake(&mut self) {
        self.handshake_fails = true;
    }

    /// Drop the simulated connection: all further sends and acks fail with
    /// [`LinkError::Disconnected`].
    pub fn disconnect(&mut self) {
        self.disconnected = true;
    }

    /// Set the flight mode reported to the control software.
    pub fn set_flight_mode(&mut self, mode: FlightMode) {
        self.flight_mode = mode;
    }
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkDriver for SimDriver {
    fn wait_heartbeat(&mut self, timeout: Duration) -> Result<(), LinkError> {
        if self.handshake_fails {
            return Err(LinkError::HandshakeTimeout(timeout));
        }
        Ok(())
    }

    fn send(&mut self, cmd: &CommandLong) -> Result<(), LinkError> {
        if self.disconnected {
            return Err(LinkError::Disconnected);
        }
        if let Some(e) = self.send_errors.pop_front() {
            return Err(e);
        }

        trace!("Sim link command: {:?}", cmd);
        self.sent.push(*cmd);
        Ok(())
    }

    fn recv_ack(&mut self, _timeout: Duration) -> Result<CommandAck, LinkError> {
        if self.disconnected {
            return Err(LinkError::Disconnected);
        }

        let command = match self.sent.last() {
            Some(c) => c.command,
            None => 0,
        };
        let result = self.ack_results.pop_front().unwrap_or(AckResult::Accepted);

        Ok(CommandAck { command, result })
    }

    fn flight_mode(&mut self) -> Result<FlightMode, LinkError> {
        if self.disconnected {
            return Err(LinkError::Disconnected);
        }
        Ok(self.flight_mode)
    }
}
