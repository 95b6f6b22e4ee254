//! # Autopilot command types
//!
//! Typed commands issued over the vessel link, and the acknowledgements the
//! autopilot returns for them. Commands are encoded into the wire-level
//! [`CommandLong`] frame by [`MavCmd::to_command_long`]; the transport below
//! the [`crate::link::LinkDriver`] trait is responsible for the actual byte
//! framing.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Command id of `DO_SET_SERVO`: set an actuator output channel directly.
pub const MAV_CMD_DO_SET_SERVO: u16 = 183;

/// Command id of `DO_PAUSE_CONTINUE`: hold or continue the current mission.
pub const MAV_CMD_DO_PAUSE_CONTINUE: u16 = 193;

/// Minimum accepted actuator pulse width in microseconds.
pub const PULSE_WIDTH_MIN_US: u16 = 1000;

/// Maximum accepted actuator pulse width in microseconds.
pub const PULSE_WIDTH_MAX_US: u16 = 2000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An actuator pulse width validated into the accepted range.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseWidthUs(u16);

/// A generic long command as accepted by the autopilot's command surface.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandLong {
    /// The command id
    pub command: u16,

    /// The command's seven parameters. Unused parameters are zero.
    pub params: [f32; 7],
}

/// Acknowledgement returned by the autopilot for a long command.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAck {
    /// Id of the command being acknowledged
    pub command: u16,

    /// Result of the command
    pub result: AckResult,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Commands which can be issued over the vessel link.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum MavCmd {
    /// Set an actuator output channel to the given pulse width.
    DoSetServo {
        channel: u8,
        pulse_width: PulseWidthUs,
    },

    /// Hold (`hold = true`) or continue (`hold = false`) the current mission.
    DoPauseContinue { hold: bool },
}

/// Result carried by a command acknowledgement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckResult {
    /// Command accepted and will be executed
    Accepted,

    /// Command valid but cannot be executed right now
    TemporarilyRejected,

    /// Command rejected
    Denied,

    /// Command not supported by the autopilot
    Unsupported,

    /// Command execution failed
    Failed,
}

/// Flight mode reported by the autopilot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightMode {
    /// Direct operator control
    Manual,

    /// Holding position, mission suspended
    Hold,

    /// Executing the loaded mission
    Auto,

    /// Returning to the launch point
    ReturnToLaunch,

    /// A mode this software doesn't know about
    Unknown(u8),
}

/// Possible command construction errors.
#[derive(Debug, Error)]
pub enum CmdError {
    #[error("Pulse width {0} us is outside the accepted range (1000-2000 us)")]
    InvalidPulseWidth(u16),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PulseWidthUs {
    /// Create a new pulse width, rejecting values outside the accepted range.
    pub fn new(us: u16) -> Result<Self, CmdError> {
        if us < PULSE_WIDTH_MIN_US || us > PULSE_WIDTH_MAX_US {
            return Err(CmdError::InvalidPulseWidth(us));
        }
        Ok(Self(us))
    }

    /// Create a pulse width without range checking.
    ///
    /// For compile-time channel-table constants only. A value outside the
    /// accepted range will be rejected by the autopilot.
    pub const fn new_unchecked(us: u16) -> Self {
        Self(us)
    }

    /// The pulse width in microseconds.
    pub fn us(&self) -> u16 {
        self.0
    }
}

impl MavCmd {
    /// Encode this command into the wire-level long command frame.
    pub fn to_command_long(&self) -> CommandLong {
        match *self {
            MavCmd::DoSetServo {
                channel,
                pulse_width,
            } => CommandLong {
                command: MAV_CMD_DO_SET_SERVO,
                params: [
                    channel as f32,
                    pulse_width.us() as f32,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                ],
            },
            MavCmd::DoPauseContinue { hold } => CommandLong {
                command: MAV_CMD_DO_PAUSE_CONTINUE,
                params: [if hold { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            },
        }
    }
}

impl AckResult {
    /// True if the command was accepted by the autopilot.
    pub fn is_accepted(&self) -> bool {
        matches!(self, AckResult::Accepted)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
