//! Override manager parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the override manager.
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideMgrParams {
    /// Minimum time a manoeuvre is held before the helm is neutralised and
    /// control returns to the autopilot, in seconds.
    pub dwell_time_s: f64,

    /// Hold time of each leg of the turn-around sequence, in seconds.
    pub turn_around_leg_time_s: f64,

    /// Backoff before retrying a failed link command, in seconds.
    pub retry_backoff_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for OverrideMgrParams {
    fn default() -> Self {
        Self {
            dwell_time_s: 2.0,
            turn_around_leg_time_s: 1.5,
            retry_backoff_s: 0.1,
        }
    }
}
