//! # Decision policy module
//!
//! Maps a perception sample to a manoeuvre intent. The policy itself is the
//! pure function [`decide`], total over all samples, so it can be tested with
//! synthetic inputs in isolation. [`DecisionCtrl`] wraps it as a cyclic
//! module with parameter loading and a status report for telemetry.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::{DeadbandPolicy, DecisionParams, NoTargetPolicy};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

// Internal
use crate::perception::PerceptionSample;
use util::{module::State, session::Session};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A manoeuvre the vessel can be asked to perform.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManeuverIntent {
    /// Continue the autopilot mission unmodified.
    KeepRoute,

    /// Steer to port.
    TurnLeft,

    /// Steer to starboard.
    TurnRight,

    /// Reverse heading with a port-then-starboard sequence.
    TurnAround,

    /// Bring the vessel to a stop.
    Stop,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Decision module state.
#[derive(Default)]
pub struct DecisionCtrl {
    params: DecisionParams,

    report: StatusReport,
}

/// Status report for decision processing.
#[derive(Debug, Copy, Clone, Default, Serialize)]
pub struct StatusReport {
    /// Offset of the target from frame centre, if a target was in view.
    pub offset_px: Option<i32>,

    /// Deadband width used for the decision.
    pub deadband_px: u32,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Decide the manoeuvre intent for a single sample.
///
/// Pure and total: every sample yields exactly one intent, with no side
/// effects. Offsets strictly inside the deadband keep the route; an offset
/// exactly at the deadband boundary steers.
pub fn decide(params: &DecisionParams, sample: PerceptionSample) -> ManeuverIntent {
    let target_px = match sample.target_px {
        Some(px) => px,
        None => {
            return match params.no_target {
                NoTargetPolicy::FailSafe => ManeuverIntent::TurnAround,
                NoTargetPolicy::FailOpen => ManeuverIntent::KeepRoute,
            }
        }
    };

    let centre_px = (sample.frame_width_px / 2) as i32;
    let deadband_px = params.deadband.width_px(sample.frame_width_px) as i32;

    if (target_px - centre_px).abs() < deadband_px {
        ManeuverIntent::KeepRoute
    } else if target_px < centre_px {
        ManeuverIntent::TurnLeft
    } else {
        ManeuverIntent::TurnRight
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ManeuverIntent {
    /// True if this intent requires a manual override of the autopilot.
    pub fn requires_override(&self) -> bool {
        !matches!(self, ManeuverIntent::KeepRoute)
    }
}

impl State for DecisionCtrl {
    type InitData = &'static str;
    type InitError = util::params::LoadError;

    type InputData = PerceptionSample;
    type OutputData = ManeuverIntent;
    type StatusReport = StatusReport;
    type ProcError = Infallible;

    /// Initialise the decision module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        self.params = util::params::load(init_data)?;
        Ok(())
    }

    /// Decide the intent for this cycle's sample.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let sample = *input_data;
        let intent = decide(&self.params, sample);

        self.report = StatusReport {
            offset_px: sample
                .target_px
                .map(|px| px - (sample.frame_width_px / 2) as i32),
            deadband_px: self.params.deadband.width_px(sample.frame_width_px),
        };

        Ok((intent, self.report))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn sample(target_px: i32) -> PerceptionSample {
        PerceptionSample {
            target_px: Some(target_px),
            frame_width_px: 640,
        }
    }

    const NO_TARGET: PerceptionSample = PerceptionSample {
        target_px: None,
        frame_width_px: 640,
    };

    fn fixed_50() -> DecisionParams {
        DecisionParams {
            deadband: DeadbandPolicy::FixedPx(50),
            no_target: NoTargetPolicy::FailSafe,
        }
    }

    #[test]
    fn test_no_target_fail_safe_is_consistent() {
        let params = fixed_50();

        for width in &[320u32, 640, 1280] {
            let s = PerceptionSample {
                target_px: None,
                frame_width_px: *width,
            };
            assert_eq!(decide(&params, s), ManeuverIntent::TurnAround);
        }
    }

    #[test]
    fn test_no_target_fail_open_keeps_route() {
        let params = DecisionParams {
            no_target: NoTargetPolicy::FailOpen,
            ..fixed_50()
        };

        assert_eq!(decide(&params, NO_TARGET), ManeuverIntent::KeepRoute);
    }

    #[test]
    fn test_deadband_boundary_is_exclusive() {
        let params = fixed_50();

        // Centre is 320; offsets of 49 px keep route, exactly 50 px steers
        assert_eq!(decide(&params, sample(369)), ManeuverIntent::KeepRoute);
        assert_eq!(decide(&params, sample(370)), ManeuverIntent::TurnRight);
        assert_eq!(decide(&params, sample(271)), ManeuverIntent::KeepRoute);
        assert_eq!(decide(&params, sample(270)), ManeuverIntent::TurnLeft);
    }

    #[test]
    fn test_fractional_deadband() {
        let params = DecisionParams {
            deadband: DeadbandPolicy::FractionOfWidth(0.1),
            no_target: NoTargetPolicy::FailSafe,
        };

        // 10% of 640 is 64 px either side of centre
        assert_eq!(decide(&params, sample(383)), ManeuverIntent::KeepRoute);
        assert_eq!(decide(&params, sample(384)), ManeuverIntent::TurnRight);
        assert_eq!(decide(&params, sample(257)), ManeuverIntent::KeepRoute);
        assert_eq!(decide(&params, sample(256)), ManeuverIntent::TurnLeft);
    }

    #[test]
    fn test_buoy_pass_scenario() {
        // A target drifting starboard, re-centred, then lost
        let params = fixed_50();

        let stream = [sample(400), sample(330), NO_TARGET];
        let intents: Vec<_> = stream.iter().map(|s| decide(&params, *s)).collect();

        assert_eq!(
            intents,
            vec![
                ManeuverIntent::TurnRight,
                ManeuverIntent::KeepRoute,
                ManeuverIntent::TurnAround,
            ]
        );
    }

    #[test]
    fn test_proc_reports_offset_and_deadband() {
        let mut ctrl = DecisionCtrl {
            params: fixed_50(),
            report: StatusReport::default(),
        };

        let (intent, report) = ctrl.proc(&sample(400)).unwrap();

        assert_eq!(intent, ManeuverIntent::TurnRight);
        assert_eq!(report.offset_px, Some(80));
        assert_eq!(report.deadband_px, 50);
    }
}
