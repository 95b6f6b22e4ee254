//! Sampler worker thread
//!
//! Runs the perception source on its own thread so that a blocking frame
//! grab never stalls the control loop. The thread takes exclusive ownership
//! of the source - nothing else may touch it for the session lifetime.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::{PerceptionError, PerceptionSource, SampleSender};

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Spawn the background sampler thread.
///
/// Each sample is published into the slot as an immutable snapshot. The
/// thread exits, closing the slot, when the source is exhausted or the stop
/// flag is raised.
pub fn spawn_sampler(
    mut source: Box<dyn PerceptionSource + Send>,
    sender: SampleSender,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        if stop.load(Ordering::Relaxed) {
            info!("Sampler stop requested");
            sender.close();
            break;
        }

        match source.next_sample() {
            Ok(sample) => sender.publish(sample),
            Err(PerceptionError::SourceExhausted) => {
                info!("Perception source exhausted");
                sender.close();
                break;
            }
        }
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::{sample_slot, PerceptionSample, ReplaySource, SlotRead};
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_sampler_drains_source_then_closes() {
        let samples = vec![
            PerceptionSample {
                target_px: Some(100),
                frame_width_px: 640,
            },
            PerceptionSample {
                target_px: None,
                frame_width_px: 640,
            },
        ];
        let source = ReplaySource::from_samples(samples, Duration::from_millis(0));

        let (tx, rx) = sample_slot();
        let stop = Arc::new(AtomicBool::new(false));

        let handle = spawn_sampler(Box::new(source), tx, stop);
        handle.join().unwrap();

        // With a zero frame interval only the last sample survives in the
        // slot, followed by the close
        assert_eq!(
            rx.take(),
            SlotRead::Sample(PerceptionSample {
                target_px: None,
                frame_width_px: 640,
            })
        );
        assert_eq!(rx.take(), SlotRead::Closed);
    }

    #[test]
    fn test_sampler_observes_stop_flag() {
        // A source that never runs out
        struct Endless;
        impl super::super::PerceptionSource for Endless {
            fn next_sample(
                &mut self,
            ) -> Result<PerceptionSample, super::super::PerceptionError> {
                std::thread::sleep(Duration::from_millis(1));
                Ok(PerceptionSample {
                    target_px: Some(0),
                    frame_width_px: 640,
                })
            }
        }

        let (tx, rx) = sample_slot();
        let stop = Arc::new(AtomicBool::new(false));

        let handle = spawn_sampler(Box::new(Endless), tx, stop.clone());

        stop.store(true, Ordering::Relaxed);
        handle.join().unwrap();

        // Slot ends closed once the pending sample (if any) is drained
        loop {
            match rx.take() {
                SlotRead::Closed => break,
                SlotRead::Sample(_) | SlotRead::Empty => continue,
            }
        }
    }
}
