//! # Vessel library.
//!
//! This library allows other crates in the workspace, and the tests, to
//! access items defined inside the vessel executable.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Global data store for the executable
pub mod data_store;

/// Decision policy - maps a perception sample to a manoeuvre intent
pub mod decision;

/// Helm - maps manoeuvre commands onto the vessel's actuator channels
pub mod helm;

/// Override manager - coordinates autopilot pause/resume around direct steering
pub mod override_mgr;

/// Perception intake - sample contract, single-slot channel, and the sampler worker
pub mod perception;
