//! # Overriding state
//!
//! Phase bookkeeping for an active override episode. Phase deadlines are
//! monotonic-clock comparisons polled by the manager once per cycle - never
//! sleeps - so perception sampling and cancellation stay live while a
//! manoeuvre is held.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::params::OverrideMgrParams;
use crate::decision::ManeuverIntent;
use crate::helm::HelmCmd;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single helm phase of an override manoeuvre.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HelmPhase {
    /// Command held during this phase.
    pub cmd: HelmCmd,

    /// How long the command is held.
    pub hold: Duration,
}

/// An override episode in progress.
#[derive(Debug)]
pub struct Overriding {
    /// The intent that triggered this episode.
    pub intent: ManeuverIntent,

    /// Deadline of the phase currently driving the helm.
    deadline: Instant,

    /// Phases still to run after the current one.
    remaining: VecDeque<HelmPhase>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Result of advancing the phase clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PhaseStep {
    /// The current phase is still being held
    Holding,

    /// The current phase expired and the given command starts the next one
    NextPhase(HelmCmd),

    /// The last phase expired, the episode is complete
    Complete,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Overriding {
    /// Begin an episode for the given intent.
    ///
    /// Returns the episode and the helm command of its first phase, which the
    /// caller must issue once the mission pause is acknowledged. `KeepRoute`
    /// never overrides and returns `None`.
    pub fn begin(
        intent: ManeuverIntent,
        params: &OverrideMgrParams,
        now: Instant,
    ) -> Option<(Self, HelmCmd)> {
        let mut script = Self::script(intent, params)?;

        // Scripts always have at least one phase
        let first = script.pop_front()?;

        Some((
            Self {
                intent,
                deadline: now + first.hold,
                remaining: script,
            },
            first.cmd,
        ))
    }

    /// Advance the phase clock to `now`.
    pub fn advance(&mut self, now: Instant) -> PhaseStep {
        if now < self.deadline {
            return PhaseStep::Holding;
        }

        match self.remaining.pop_front() {
            Some(phase) => {
                self.deadline = now + phase.hold;
                PhaseStep::NextPhase(phase.cmd)
            }
            None => PhaseStep::Complete,
        }
    }

    /// The helm phase script for an intent, or `None` for `KeepRoute`.
    fn script(intent: ManeuverIntent, params: &OverrideMgrParams) -> Option<VecDeque<HelmPhase>> {
        let dwell = Duration::from_secs_f64(params.dwell_time_s);
        let leg = Duration::from_secs_f64(params.turn_around_leg_time_s);

        let mut phases = VecDeque::new();

        match intent {
            ManeuverIntent::KeepRoute => return None,
            ManeuverIntent::TurnLeft => phases.push_back(HelmPhase {
                cmd: HelmCmd::SteerLeft,
                hold: dwell,
            }),
            ManeuverIntent::TurnRight => phases.push_back(HelmPhase {
                cmd: HelmCmd::SteerRight,
                hold: dwell,
            }),
            ManeuverIntent::TurnAround => {
                phases.push_back(HelmPhase {
                    cmd: HelmCmd::SteerLeft,
                    hold: leg,
                });
                phases.push_back(HelmPhase {
                    cmd: HelmCmd::SteerRight,
                    hold: leg,
                });
            }
            ManeuverIntent::Stop => phases.push_back(HelmPhase {
                cmd: HelmCmd::AllStop,
                hold: dwell,
            }),
        }

        Some(phases)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn params() -> OverrideMgrParams {
        OverrideMgrParams {
            dwell_time_s: 2.0,
            turn_around_leg_time_s: 1.5,
            retry_backoff_s: 0.0,
        }
    }

    #[test]
    fn test_keep_route_has_no_script() {
        let t0 = Instant::now();
        assert!(Overriding::begin(ManeuverIntent::KeepRoute, &params(), t0).is_none());
    }

    #[test]
    fn test_single_phase_dwell() {
        let t0 = Instant::now();
        let (mut ep, first) =
            Overriding::begin(ManeuverIntent::TurnRight, &params(), t0).unwrap();

        assert_eq!(first, HelmCmd::SteerRight);

        assert_eq!(ep.advance(t0 + Duration::from_millis(100)), PhaseStep::Holding);
        assert_eq!(ep.advance(t0 + Duration::from_millis(1999)), PhaseStep::Holding);
        assert_eq!(ep.advance(t0 + Duration::from_millis(2000)), PhaseStep::Complete);
    }

    #[test]
    fn test_turn_around_runs_both_legs() {
        let t0 = Instant::now();
        let (mut ep, first) =
            Overriding::begin(ManeuverIntent::TurnAround, &params(), t0).unwrap();

        assert_eq!(first, HelmCmd::SteerLeft);

        // First leg held for 1.5 s
        assert_eq!(ep.advance(t0 + Duration::from_millis(1000)), PhaseStep::Holding);

        // Second leg starts at the leg boundary
        let t1 = t0 + Duration::from_millis(1500);
        assert_eq!(ep.advance(t1), PhaseStep::NextPhase(HelmCmd::SteerRight));

        // And is held for its own leg time measured from the boundary
        assert_eq!(ep.advance(t1 + Duration::from_millis(1000)), PhaseStep::Holding);
        assert_eq!(
            ep.advance(t1 + Duration::from_millis(1500)),
            PhaseStep::Complete
        );
    }

    #[test]
    fn test_stop_neutralises_for_the_dwell() {
        let t0 = Instant::now();
        let (mut ep, first) = Overriding::begin(ManeuverIntent::Stop, &params(), t0).unwrap();

        assert_eq!(first, HelmCmd::AllStop);
        assert_eq!(ep.advance(t0 + Duration::from_secs(2)), PhaseStep::Complete);
    }
}
