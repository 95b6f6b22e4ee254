//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::decision::{DecisionCtrl, ManeuverIntent, StatusReport};
use crate::perception::PerceptionSample;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    // Perception
    /// The sample recieved this cycle, if any
    pub sample: Option<PerceptionSample>,

    /// Number of cycles since a sample was last recieved
    pub cycles_since_sample: u64,

    // Decision
    pub decision_ctrl: DecisionCtrl,
    pub intent: Option<ManeuverIntent>,
    pub decision_status_rpt: StatusReport,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Clear items that need wiping at the start of the cycle.
    pub fn cycle_start(&mut self) {
        self.sample = None;
        self.intent = None;
    }
}
