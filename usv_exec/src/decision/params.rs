//! Decision policy parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the decision policy.
///
/// Two policy variants are deployed across vessel configurations, differing
/// in the deadband shape and in what to do when no target is in view. Both
/// choices are explicit here - neither is hardcoded.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionParams {
    /// The deadband around frame centre within which no correction is issued.
    pub deadband: DeadbandPolicy,

    /// Behaviour when the sample carries no target.
    pub no_target: NoTargetPolicy,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Shape of the deadband around frame centre.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
pub enum DeadbandPolicy {
    /// A fixed width in pixels
    FixedPx(u32),

    /// A fraction of the frame width
    FractionOfWidth(f64),
}

/// Behaviour when no target is in view.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum NoTargetPolicy {
    /// Treat a lost target as an obstacle and turn around.
    FailSafe,

    /// Keep the route and wait for the target to reappear.
    FailOpen,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DeadbandPolicy {
    /// Deadband width in pixels for the given frame width.
    pub fn width_px(&self, frame_width_px: u32) -> u32 {
        match *self {
            DeadbandPolicy::FixedPx(px) => px,
            DeadbandPolicy::FractionOfWidth(frac) => (frame_width_px as f64 * frac) as u32,
        }
    }
}

impl Default for DecisionParams {
    fn default() -> Self {
        Self {
            deadband: DeadbandPolicy::FixedPx(50),
            no_target: NoTargetPolicy::FailSafe,
        }
    }
}
