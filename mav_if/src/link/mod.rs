//! # Vessel link
//!
//! Command surface over the single physical connection to the vessel's
//! autopilot. Mission pause/resume and direct actuator commands share this
//! connection, which serialises commands and does not guarantee immediate
//! application, so every send is followed by a settle delay before the next
//! command is accepted.
//!
//! The link is exclusively owned by one control session for its lifetime - no
//! other writer may issue commands while the session holds it.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod sim;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::Deserialize;
use std::thread;
use std::time::Duration;
use thiserror::Error;

// Internal
use crate::cmd::{CommandAck, CommandLong, FlightMode, MavCmd, PulseWidthUs};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the vessel link.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkParams {
    /// Endpoint of the underlying transport, for example
    /// `serial:/dev/ttyACM0:57600`. Informational at this level - the driver
    /// owns the actual connection.
    pub endpoint: String,

    /// Maximum time to wait for the connection heartbeat, in seconds.
    pub handshake_timeout_s: f64,

    /// Maximum time to wait for a command acknowledgement, in seconds.
    pub ack_timeout_s: f64,

    /// Settle time between consecutive commands on the link, in seconds.
    pub settle_time_s: f64,
}

/// The vessel's autopilot link.
///
/// Construction blocks until the connection handshake (liveness heartbeat)
/// completes, so a `MavLink` value is always post-handshake. Commands issued
/// after the link drops fail fast with [`LinkError::NotConnected`].
pub struct MavLink<D> {
    driver: D,
    params: LinkParams,
    connected: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors raised by the vessel link.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("The link is not connected")]
    NotConnected,

    #[error("No heartbeat recieved from the autopilot within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("The command was not accepted by the link within the send timeout")]
    SendTimeout,

    #[error("The link has been disconnected")]
    Disconnected,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Command surface of the underlying transport.
///
/// The byte transport (serial or UDP framing), heartbeat negotiation and the
/// arming sequence are the platform's responsibility; implementations expose
/// only the operations the control software needs.
pub trait LinkDriver {
    /// Block until a liveness heartbeat is recieved, or the timeout elapses.
    fn wait_heartbeat(&mut self, timeout: Duration) -> Result<(), LinkError>;

    /// Send a long command over the link.
    fn send(&mut self, cmd: &CommandLong) -> Result<(), LinkError>;

    /// Block until an acknowledgement is recieved, or the timeout elapses.
    fn recv_ack(&mut self, timeout: Duration) -> Result<CommandAck, LinkError>;

    /// Query the autopilot's current flight mode.
    fn flight_mode(&mut self) -> Result<FlightMode, LinkError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            endpoint: String::from("serial:/dev/ttyACM0:57600"),
            handshake_timeout_s: 10.0,
            ack_timeout_s: 1.0,
            settle_time_s: 0.1,
        }
    }
}

impl<D: LinkDriver> MavLink<D> {
    /// Connect to the autopilot, blocking until the heartbeat handshake
    /// completes or the handshake timeout elapses.
    pub fn connect(mut driver: D, params: LinkParams) -> Result<Self, LinkError> {
        let timeout = Duration::from_secs_f64(params.handshake_timeout_s);
        driver.wait_heartbeat(timeout)?;

        info!("Autopilot link connected ({})", params.endpoint);

        Ok(Self {
            driver,
            params,
            connected: true,
        })
    }

    /// True if the handshake has completed and the link has not dropped.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Pause the running mission.
    ///
    /// Blocks until the autopilot acknowledges the command or the ack timeout
    /// elapses. The caller must check the ack result before treating the
    /// mission as held.
    pub fn pause_mission(&mut self) -> Result<CommandAck, LinkError> {
        debug!("Requesting mission pause");
        self.send_cmd_acked(MavCmd::DoPauseContinue { hold: true })
    }

    /// Resume the paused mission.
    ///
    /// Blocks until the autopilot acknowledges the command or the ack timeout
    /// elapses.
    pub fn resume_mission(&mut self) -> Result<CommandAck, LinkError> {
        debug!("Requesting mission resume");
        self.send_cmd_acked(MavCmd::DoPauseContinue { hold: false })
    }

    /// Set an actuator output channel to the given pulse width.
    ///
    /// Actuator writes are not acknowledged; the settle delay is the only
    /// pacing between them.
    pub fn set_servo(&mut self, channel: u8, pulse_width: PulseWidthUs) -> Result<(), LinkError> {
        self.send_cmd(MavCmd::DoSetServo {
            channel,
            pulse_width,
        })
    }

    /// Query the autopilot's current flight mode.
    pub fn flight_mode(&mut self) -> Result<FlightMode, LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        self.driver.flight_mode()
    }

    /// Borrow the underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutably borrow the underlying driver (fault injection on simulated
    /// links).
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Send a command, then let the link settle.
    fn send_cmd(&mut self, cmd: MavCmd) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }

        let result = self.driver.send(&cmd.to_command_long());
        if let Err(LinkError::Disconnected) = result {
            self.connected = false;
        }
        result?;

        thread::sleep(Duration::from_secs_f64(self.params.settle_time_s));

        Ok(())
    }

    /// Send a command and wait for its acknowledgement.
    fn send_cmd_acked(&mut self, cmd: MavCmd) -> Result<CommandAck, LinkError> {
        self.send_cmd(cmd)?;

        let timeout = Duration::from_secs_f64(self.params.ack_timeout_s);
        let ack = self.driver.recv_ack(timeout);
        if let Err(LinkError::Disconnected) = ack {
            self.connected = false;
        }
        ack
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::sim::SimDriver;
    use super::*;
    use crate::cmd::{AckResult, MAV_CMD_DO_PAUSE_CONTINUE, MAV_CMD_DO_SET_SERVO};

    fn test_params() -> LinkParams {
        LinkParams {
            settle_time_s: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_handshake_timeout() {
        let mut driver = SimDriver::new();
        driver.fail_handshake();

        match MavLink::connect(driver, test_params()) {
            Err(LinkError::HandshakeTimeout(_)) => (),
            other => panic!("Expected a handshake timeout, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_pause_resume_round_trip() {
        let mut link = MavLink::connect(SimDriver::new(), test_params()).unwrap();

        let ack = link.pause_mission().unwrap();
        assert_eq!(ack.command, MAV_CMD_DO_PAUSE_CONTINUE);
        assert!(ack.result.is_accepted());

        let ack = link.resume_mission().unwrap();
        assert!(ack.result.is_accepted());

        let sent = link.driver().sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].params[0], 1.0);
        assert_eq!(sent[1].params[0], 0.0);
    }

    #[test]
    fn test_set_servo_records_channel_write() {
        let mut link = MavLink::connect(SimDriver::new(), test_params()).unwrap();

        link.set_servo(3, PulseWidthUs::new(1900).unwrap()).unwrap();

        let sent = link.driver().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].command, MAV_CMD_DO_SET_SERVO);
        assert_eq!(sent[0].params[0], 3.0);
        assert_eq!(sent[0].params[1], 1900.0);
    }

    #[test]
    fn test_commands_fail_fast_after_disconnect() {
        let mut link = MavLink::connect(SimDriver::new(), test_params()).unwrap();

        link.driver_mut().disconnect();

        match link.set_servo(1, PulseWidthUs::new(1500).unwrap()) {
            Err(LinkError::Disconnected) => (),
            other => panic!("Expected Disconnected, got {:?}", other),
        }
        assert!(!link.is_connected());

        // Once the link has dropped further commands must not reach the driver
        match link.pause_mission() {
            Err(LinkError::NotConnected) => (),
            other => panic!("Expected NotConnected, got {:?}", other.map(|_| ())),
        }
        assert_eq!(link.driver().sent().len(), 0);
    }

    #[test]
    fn test_rejected_ack_is_surfaced() {
        let mut driver = SimDriver::new();
        driver.queue_ack_result(AckResult::Denied);

        let mut link = MavLink::connect(driver, test_params()).unwrap();

        let ack = link.pause_mission().unwrap();
        assert!(!ack.result.is_accepted());
    }
}
