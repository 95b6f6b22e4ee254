//! Single-slot sample channel
//!
//! Latest-value handoff between the sensing thread and the control thread.
//! A newly published sample replaces any unconsumed one, so the control
//! thread always decides on the freshest snapshot and neither thread ever
//! blocks on the other.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, Mutex, MutexGuard};

use super::PerceptionSample;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Sensing-side handle to the sample slot.
pub struct SampleSender {
    slot: Arc<Mutex<Slot>>,
}

/// Control-side handle to the sample slot.
pub struct SampleReceiver {
    slot: Arc<Mutex<Slot>>,
}

#[derive(Default)]
struct Slot {
    sample: Option<PerceptionSample>,
    closed: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Result of polling the slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlotRead {
    /// A sample was waiting
    Sample(PerceptionSample),

    /// No new sample since the last take
    Empty,

    /// The source is exhausted and no further samples will arrive
    Closed,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create a connected sender/reciever pair around a single sample slot.
pub fn sample_slot() -> (SampleSender, SampleReceiver) {
    let slot = Arc::new(Mutex::new(Slot::default()));

    (
        SampleSender { slot: slot.clone() },
        SampleReceiver { slot },
    )
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SampleSender {
    /// Publish a new snapshot, replacing any unconsumed one.
    pub fn publish(&self, sample: PerceptionSample) {
        self.lock().sample = Some(sample);
    }

    /// Mark the source exhausted. A sample already in the slot is still
    /// delivered before the reciever sees [`SlotRead::Closed`].
    pub fn close(&self) {
        self.lock().closed = true;
    }

    fn lock(&self) -> MutexGuard<Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SampleReceiver {
    /// Take the latest sample, if one is waiting.
    pub fn take(&self) -> SlotRead {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());

        match slot.sample.take() {
            Some(s) => SlotRead::Sample(s),
            None if slot.closed => SlotRead::Closed,
            None => SlotRead::Empty,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
