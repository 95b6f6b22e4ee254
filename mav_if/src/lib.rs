//! # Autopilot Interface
//!
//! This library provides the command surface of the vessel's autopilot link
//! and the mission plan document consumed by the ground control software.
//!
//! The byte transport itself (serial or UDP framing, heartbeat negotiation,
//! arming) is provided by the vessel platform and sits behind the
//! [`link::LinkDriver`] trait.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod cmd;
pub mod link;
pub mod plan;
