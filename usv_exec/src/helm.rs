//! # Helm module
//!
//! Maps discrete manoeuvre commands onto the vessel's actuator channels.
//! The drive is differential: a steer channel and a throttle channel, each
//! commanded as a pulse width. Every helm command is exactly two logical
//! channel writes, issued over the shared autopilot link.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

// Internal
use mav_if::cmd::PulseWidthUs;
use mav_if::link::{LinkDriver, LinkError, MavLink};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Actuator channel driving the steering output.
pub const STEER_CHANNEL: u8 = 1;

/// Actuator channel driving the throttle output.
pub const THROTTLE_CHANNEL: u8 = 3;

/// Full port deflection of the steering channel.
const STEER_PORT: PulseWidthUs = PulseWidthUs::new_unchecked(1100);

/// Full starboard deflection of the steering channel.
const STEER_STARBOARD: PulseWidthUs = PulseWidthUs::new_unchecked(1900);

/// Neutral (centre) position on either channel.
const NEUTRAL: PulseWidthUs = PulseWidthUs::new_unchecked(1500);

/// Ahead throttle.
const THROTTLE_AHEAD: PulseWidthUs = PulseWidthUs::new_unchecked(1900);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Discrete helm commands available during a manual override.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HelmCmd {
    /// Steering hard to port, throttle neutral.
    SteerLeft,

    /// Steering hard to starboard, throttle neutral.
    SteerRight,

    /// Steering centred, throttle ahead.
    Forward,

    /// Both channels neutral.
    AllStop,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl HelmCmd {
    /// The channel writes for this command, as (steer, throttle) pulse widths.
    pub fn channel_outputs(&self) -> (PulseWidthUs, PulseWidthUs) {
        match self {
            HelmCmd::SteerLeft => (STEER_PORT, NEUTRAL),
            HelmCmd::SteerRight => (STEER_STARBOARD, NEUTRAL),
            HelmCmd::Forward => (NEUTRAL, THROTTLE_AHEAD),
            HelmCmd::AllStop => (NEUTRAL, NEUTRAL),
        }
    }

    /// Issue this command over the vessel link as two channel writes.
    pub fn issue<D: LinkDriver>(&self, link: &mut MavLink<D>) -> Result<(), LinkError> {
        let (steer, throttle) = self.channel_outputs();

        link.set_servo(STEER_CHANNEL, steer)?;
        link.set_servo(THROTTLE_CHANNEL, throttle)
    }
}

impl Display for HelmCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HelmCmd::SteerLeft => write!(f, "steer left"),
            HelmCmd::SteerRight => write!(f, "steer right"),
            HelmCmd::Forward => write!(f, "forward"),
            HelmCmd::AllStop => write!(f, "all stop"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
