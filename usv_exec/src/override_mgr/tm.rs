//! Override manager telemetry

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use crate::decision::ManeuverIntent;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Summary of the override manager's activity, saved to the session
/// directory at session end.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverrideTm {
    /// True if an override was in command at the time of the snapshot.
    pub overriding: bool,

    /// Number of override episodes begun this session.
    pub num_override_episodes: u64,

    /// The intent of the most recent episode.
    pub last_intent: Option<ManeuverIntent>,

    /// Number of override attempts abandoned because the mission pause
    /// failed.
    pub num_pause_failures: u64,
}
