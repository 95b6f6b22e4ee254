//! Replay perception source
//!
//! Plays a recorded sample stream from a JSON file at a fixed frame
//! interval, then reports exhaustion. Used for bench sessions and testing
//! without the camera pipeline attached.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use thiserror::Error;

use super::{PerceptionError, PerceptionSample, PerceptionSource};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A perception source which replays a recorded sample stream.
pub struct ReplaySource {
    samples: VecDeque<PerceptionSample>,
    frame_interval: Duration,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible errors raised while loading a replay file.
#[derive(Debug, Error)]
pub enum ReplayLoadError {
    #[error("Could not find the replay file at {0:?}")]
    FileNotFound(PathBuf),

    #[error("Could not load the replay file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Could not parse the replay file: {0}")]
    ParseError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ReplaySource {
    /// Load a replay from the given JSON file (an array of samples).
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        frame_interval: Duration,
    ) -> Result<Self, ReplayLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ReplayLoadError::FileNotFound(path.to_path_buf()));
        }

        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => return Err(ReplayLoadError::FileLoadError(e)),
        };

        let samples: Vec<PerceptionSample> = match serde_json::from_str(&contents) {
            Ok(s) => s,
            Err(e) => return Err(ReplayLoadError::ParseError(e)),
        };

        Ok(Self::from_samples(samples, frame_interval))
    }

    /// Create a replay directly from a sample sequence.
    pub fn from_samples(samples: Vec<PerceptionSample>, frame_interval: Duration) -> Self {
        Self {
            samples: samples.into(),
            frame_interval,
        }
    }

    /// Number of samples remaining.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if no samples remain.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl PerceptionSource for ReplaySource {
    fn next_sample(&mut self) -> Result<PerceptionSample, PerceptionError> {
        match self.samples.pop_front() {
            Some(sample) => {
                // Pace the replay like a live camera
                thread::sleep(self.frame_interval);
                Ok(sample)
            }
            None => Err(PerceptionError::SourceExhausted),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
