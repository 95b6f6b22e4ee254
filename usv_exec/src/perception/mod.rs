//! # Perception intake module
//!
//! The perception algorithm itself (segmentation of the camera frame into a
//! tracked buoy position) is an external collaborator. This module defines
//! its output contract and moves samples from the sensing thread to the
//! control thread without any shared mutable state: the sensing thread owns
//! the source exclusively and publishes immutable snapshots through a
//! single-slot channel.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod channel;
mod replay;
mod worker;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use channel::{sample_slot, SampleReceiver, SampleSender, SlotRead};
pub use replay::{ReplayLoadError, ReplaySource};
pub use worker::spawn_sampler;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single perception sample, produced once per frame.
///
/// `target_px` is the horizontal pixel position of the tracked feature within
/// the frame, or `None` when no target is in view - without a target there is
/// no offset to steer by.
///
/// Samples are self-contained: each one is handed by value into the decision
/// policy and never retained across cycles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerceptionSample {
    /// Horizontal position of the tracked target, if one is in view
    pub target_px: Option<i32>,

    /// Width of the frame the position is measured in
    pub frame_width_px: u32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible errors raised by a perception source.
#[derive(Debug, Error)]
pub enum PerceptionError {
    /// The source has no more frames - end of a recording, or the camera has
    /// disconnected. This ends the session cleanly rather than being treated
    /// as a fault.
    #[error("The perception source is exhausted")]
    SourceExhausted,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of perception samples.
///
/// `next_sample` may block for up to one frame interval.
pub trait PerceptionSource {
    fn next_sample(&mut self) -> Result<PerceptionSample, PerceptionError>;
}
