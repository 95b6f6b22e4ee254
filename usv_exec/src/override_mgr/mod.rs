//! # Override manager module
//!
//! This module implements the state machine coordinating "autopilot in
//! command" against "manual override in command". It is stepped once per
//! control cycle with the intent decided from that cycle's perception
//! sample, and it is the only owner of the vessel link for the session.
//!
//! The ordering contract is absolute:
//!
//! 1. The mission pause must be acknowledged before any steering output is
//!    issued - otherwise the autopilot would fight the helm.
//! 2. The helm must be neutralised before the mission is resumed - otherwise
//!    a manual command would keep driving into an autopilot-controlled leg.
//!
//! States:
//!
//! - `Autonomous` - the autopilot is executing the mission. Any intent other
//!   than `KeepRoute` starts an override episode.
//! - `Overriding` - a manoeuvre is held on the helm. New intents are ignored
//!   until the episode's phase script completes, then the helm is
//!   neutralised and the mission resumed.
//!
//! A link failure while an override is in command is fatal for the session:
//! a last-resort all-stop is attempted and the error is surfaced, so the
//! vessel is never left under un-neutralised manual actuation.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod overriding;
mod params;
pub mod tm;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use overriding::{HelmPhase, Overriding, PhaseStep};
pub use params::OverrideMgrParams;
pub use tm::OverrideTm;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use std::fmt::{self, Display};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

// Internal
use crate::decision::ManeuverIntent;
use crate::helm::HelmCmd;
use mav_if::cmd::AckResult;
use mav_if::link::{LinkDriver, LinkError, MavLink};
use util::mission_log::MissionLog;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Override manager.
///
/// Exclusively owns the vessel link: no other writer may issue link commands
/// while the session runs.
pub struct OverrideMgr<D: LinkDriver> {
    params: OverrideMgrParams,

    link: MavLink<D>,

    state: ControlState,

    tm: OverrideTm,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Who is in command of the vessel.
pub enum ControlState {
    /// The autopilot is executing the mission.
    Autonomous,

    /// A manual override manoeuvre is driving the helm.
    Overriding(Overriding),
}

/// Errors that are fatal to the control session.
///
/// Recoverable link trouble (a pause that fails while the autopilot is still
/// in command) is logged and absorbed. An error from the manager means the
/// session must end; a last-resort all-stop has already been attempted by
/// the time one is returned.
#[derive(Debug, Error)]
pub enum OverrideMgrError {
    #[error("Link failed while a manual override was in command: {0}")]
    LinkFailedWhileOverriding(LinkError),

    #[error("Could not resume the mission after an override: {0}")]
    ResumeFailed(LinkError),

    #[error("Mission resume was not accepted by the autopilot: {0:?}")]
    ResumeRejected(AckResult),
}

/// Why a pause attempt did not take effect.
#[derive(Debug, Error)]
enum PauseFailure {
    #[error("{0}")]
    Link(#[from] LinkError),

    #[error("pause rejected by the autopilot: {0:?}")]
    Rejected(AckResult),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<D: LinkDriver> OverrideMgr<D> {
    /// Create a new manager in the `Autonomous` state, taking ownership of
    /// the link for the session.
    pub fn new(params: OverrideMgrParams, link: MavLink<D>) -> Self {
        Self {
            params,
            link,
            state: ControlState::Autonomous,
            tm: OverrideTm::default(),
        }
    }

    /// True if a manual override is currently in command.
    pub fn is_overriding(&self) -> bool {
        matches!(self.state, ControlState::Overriding(_))
    }

    /// The current telemetry snapshot.
    pub fn tm(&self) -> &OverrideTm {
        &self.tm
    }

    /// Step the state machine for one control cycle.
    pub fn step(
        &mut self,
        intent: Option<ManeuverIntent>,
        mission_log: &mut MissionLog,
    ) -> Result<(), OverrideMgrError> {
        self.step_at(Instant::now(), intent, mission_log)
    }

    /// Step the state machine with an explicit cycle time.
    pub fn step_at(
        &mut self,
        now: Instant,
        intent: Option<ManeuverIntent>,
        mission_log: &mut MissionLog,
    ) -> Result<(), OverrideMgrError> {
        match self.state {
            ControlState::Autonomous => match intent {
                Some(i) if i.requires_override() => self.begin_override(now, i, mission_log),
                _ => Ok(()),
            },
            ControlState::Overriding(_) => {
                // No nested overrides: intents are ignored until the current
                // episode completes
                if let Some(i) = intent {
                    if i.requires_override() {
                        debug!("Intent {:?} ignored, override in progress", i);
                    }
                }
                self.continue_override(now, mission_log)
            }
        }
    }

    /// Safe the vessel before session end.
    ///
    /// If an override is in command the helm is neutralised and a mission
    /// resume is attempted - termination must never leave a manual command
    /// driving the actuators. In `Autonomous` the helm is already neutral
    /// and the autopilot already in command, so there is nothing to do.
    pub fn shutdown(&mut self, mission_log: &mut MissionLog) {
        if !self.is_overriding() {
            return;
        }

        if let Err(e) = HelmCmd::AllStop.issue(&mut self.link) {
            warn!("Could not neutralise the helm during shutdown: {}", e);
        } else {
            mission_log.log("Helm neutralised for shutdown");
        }

        match self.link.resume_mission() {
            Ok(_) => mission_log.log("Mission resumed before shutdown"),
            Err(e) => {
                warn!("Could not resume the mission during shutdown: {}", e);
                mission_log.log(&format!("Mission resume failed during shutdown: {}", e));
            }
        }

        self.state = ControlState::Autonomous;
        self.tm.overriding = false;
    }

    // --------------------------------------------------------------------------------------------
    // PRIVATE METHODS
    // --------------------------------------------------------------------------------------------

    /// Start an override episode for the given intent.
    fn begin_override(
        &mut self,
        now: Instant,
        intent: ManeuverIntent,
        mission_log: &mut MissionLog,
    ) -> Result<(), OverrideMgrError> {
        let (episode, first_cmd) = match Overriding::begin(intent, &self.params, now) {
            Some(x) => x,
            None => return Ok(()),
        };

        // Pause must be acknowledged before any steering output. If it
        // fails the autopilot remains in command and nothing is issued to
        // the helm.
        if let Err(e) = self.pause_acked() {
            warn!("Mission pause failed, the autopilot remains in command: {}", e);
            mission_log.log(&format!("Override abandoned, pause failed: {}", e));
            self.tm.num_pause_failures += 1;
            return Ok(());
        }

        info!("Overriding: {:?}", intent);
        mission_log.log(&format!("Mission paused, overriding: {:?}", intent));

        // Enter Overriding before the helm is touched: steering output only
        // ever happens in this state
        self.state = ControlState::Overriding(episode);
        self.tm.overriding = true;
        self.tm.num_override_episodes += 1;
        self.tm.last_intent = Some(intent);

        if let Err(e) = self.issue_helm(first_cmd) {
            // The mission is already held: neutralise and hand back before
            // surfacing
            return Err(self.bail_out(e, mission_log));
        }
        mission_log.log(&format!("Helm: {}", first_cmd));

        Ok(())
    }

    /// Continue the episode in progress.
    fn continue_override(
        &mut self,
        now: Instant,
        mission_log: &mut MissionLog,
    ) -> Result<(), OverrideMgrError> {
        let step = match self.state {
            ControlState::Overriding(ref mut episode) => episode.advance(now),
            ControlState::Autonomous => return Ok(()),
        };

        match step {
            PhaseStep::Holding => Ok(()),
            PhaseStep::NextPhase(cmd) => {
                if let Err(e) = self.issue_helm(cmd) {
                    return Err(self.bail_out(e, mission_log));
                }
                mission_log.log(&format!("Helm: {}", cmd));
                Ok(())
            }
            PhaseStep::Complete => self.finish_override(mission_log),
        }
    }

    /// Neutralise the helm and hand command back to the autopilot.
    fn finish_override(&mut self, mission_log: &mut MissionLog) -> Result<(), OverrideMgrError> {
        // Neutral before resume, always
        if let Err(e) = self.issue_helm(HelmCmd::AllStop) {
            return Err(self.bail_out(e, mission_log));
        }
        mission_log.log("Override complete, helm neutralised");

        match self.resume_acked() {
            Ok(()) => {
                self.state = ControlState::Autonomous;
                self.tm.overriding = false;

                info!("Autopilot back in command");
                mission_log.log("Mission resumed");
                Ok(())
            }
            Err(e) => {
                // The session must not continue with the mission held and
                // nobody in command. Re-neutralise and surface.
                mission_log.log(&format!("Mission resume failed: {}", e));
                if HelmCmd::AllStop.issue(&mut self.link).is_err() {
                    warn!("Last-resort all-stop could not be issued");
                }
                Err(e)
            }
        }
    }

    /// Pause the mission, retrying once after the backoff on a link error.
    fn pause_acked(&mut self) -> Result<(), PauseFailure> {
        let ack = match self.link.pause_mission() {
            Ok(a) => a,
            Err(first) => {
                warn!("Mission pause failed, retrying: {}", first);
                self.backoff();
                self.link.pause_mission()?
            }
        };

        if ack.result.is_accepted() {
            Ok(())
        } else {
            Err(PauseFailure::Rejected(ack.result))
        }
    }

    /// Resume the mission, retrying once after the backoff on a link error.
    fn resume_acked(&mut self) -> Result<(), OverrideMgrError> {
        let ack = match self.link.resume_mission() {
            Ok(a) => a,
            Err(first) => {
                warn!("Mission resume failed, retrying: {}", first);
                self.backoff();
                self.link
                    .resume_mission()
                    .map_err(OverrideMgrError::ResumeFailed)?
            }
        };

        if ack.result.is_accepted() {
            Ok(())
        } else {
            Err(OverrideMgrError::ResumeRejected(ack.result))
        }
    }

    /// Issue a helm command, retrying once after the backoff on a link error.
    fn issue_helm(&mut self, cmd: HelmCmd) -> Result<(), LinkError> {
        match cmd.issue(&mut self.link) {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!("Helm command '{}' failed, retrying: {}", cmd, first);
                self.backoff();
                cmd.issue(&mut self.link)
            }
        }
    }

    /// Last-resort safing after a link failure mid-override: neutralise the
    /// helm, attempt to hand back to the autopilot, and surface the original
    /// error.
    fn bail_out(&mut self, cause: LinkError, mission_log: &mut MissionLog) -> OverrideMgrError {
        mission_log.log(&format!("Link failure while overriding: {}", cause));

        if HelmCmd::AllStop.issue(&mut self.link).is_err() {
            warn!("Last-resort all-stop could not be issued");
        } else {
            mission_log.log("Helm neutralised (last resort)");
        }

        if self.link.resume_mission().is_err() {
            warn!("Last-resort mission resume could not be issued");
        }

        self.state = ControlState::Autonomous;
        self.tm.overriding = false;

        OverrideMgrError::LinkFailedWhileOverriding(cause)
    }

    fn backoff(&self) {
        thread::sleep(Duration::from_secs_f64(self.params.retry_backoff_s));
    }
}

impl Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlState::Autonomous => write!(f, "Autonomous"),
            ControlState::Overriding(_) => write!(f, "Overriding"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use mav_if::cmd::{MAV_CMD_DO_PAUSE_CONTINUE, MAV_CMD_DO_SET_SERVO};
    use mav_if::link::sim::SimDriver;
    use mav_if::link::LinkParams;

    /// Dwell of 2.0 s and legs of 1.5 s, with no retry backoff so tests run
    /// instantly.
    fn test_mgr() -> OverrideMgr<SimDriver> {
        let link_params = LinkParams {
            settle_time_s: 0.0,
            ..Default::default()
        };
        let link = MavLink::connect(SimDriver::new(), link_params).unwrap();

        let params = OverrideMgrParams {
            dwell_time_s: 2.0,
            turn_around_leg_time_s: 1.5,
            retry_backoff_s: 0.0,
        };

        OverrideMgr::new(params, link)
    }

    fn pauses(mgr: &OverrideMgr<SimDriver>) -> Vec<f32> {
        mgr.link
            .driver()
            .sent()
            .iter()
            .filter(|c| c.command == MAV_CMD_DO_PAUSE_CONTINUE)
            .map(|c| c.params[0])
            .collect()
    }

    fn servo_writes(mgr: &OverrideMgr<SimDriver>) -> Vec<(f32, f32)> {
        mgr.link
            .driver()
            .sent()
            .iter()
            .filter(|c| c.command == MAV_CMD_DO_SET_SERVO)
            .map(|c| (c.params[0], c.params[1]))
            .collect()
    }

    #[test]
    fn test_keep_route_issues_nothing() {
        let mut mgr = test_mgr();
        let mut log = MissionLog::new();

        for intent in &[None, Some(ManeuverIntent::KeepRoute), None] {
            mgr.step(*intent, &mut log).unwrap();
        }

        assert!(!mgr.is_overriding());
        assert_eq!(mgr.link.driver().sent().len(), 0);
    }

    #[test]
    fn test_pause_acked_before_steering() {
        let mut mgr = test_mgr();
        let mut log = MissionLog::new();

        mgr.step(Some(ManeuverIntent::TurnRight), &mut log).unwrap();

        assert!(mgr.is_overriding());

        let sent = mgr.link.driver().sent();
        assert_eq!(sent.len(), 3);

        // Pause first, then the two channel writes for steer right
        assert_eq!(sent[0].command, MAV_CMD_DO_PAUSE_CONTINUE);
        assert_eq!(sent[0].params[0], 1.0);
        assert_eq!(sent[1].command, MAV_CMD_DO_SET_SERVO);
        assert_eq!((sent[1].params[0], sent[1].params[1]), (1.0, 1900.0));
        assert_eq!((sent[2].params[0], sent[2].params[1]), (3.0, 1500.0));
    }

    #[test]
    fn test_intents_ignored_mid_override() {
        let mut mgr = test_mgr();
        let mut log = MissionLog::new();

        let t0 = Instant::now();
        mgr.step_at(t0, Some(ManeuverIntent::TurnRight), &mut log)
            .unwrap();
        let sent_after_start = mgr.link.driver().sent().len();

        // A contradictory intent mid-dwell must not re-pause or re-steer
        mgr.step_at(
            t0 + Duration::from_millis(500),
            Some(ManeuverIntent::TurnLeft),
            &mut log,
        )
        .unwrap();

        assert!(mgr.is_overriding());
        assert_eq!(mgr.link.driver().sent().len(), sent_after_start);
        assert_eq!(mgr.tm().num_override_episodes, 1);
    }

    #[test]
    fn test_dwell_then_neutral_before_resume() {
        let mut mgr = test_mgr();
        let mut log = MissionLog::new();

        let t0 = Instant::now();
        mgr.step_at(t0, Some(ManeuverIntent::TurnRight), &mut log)
            .unwrap();

        // Mid-dwell cycles issue nothing further
        mgr.step_at(t0 + Duration::from_millis(1000), None, &mut log)
            .unwrap();
        assert_eq!(mgr.link.driver().sent().len(), 3);

        // Dwell expiry: all-stop on both channels, then resume, in that order
        mgr.step_at(t0 + Duration::from_millis(2000), None, &mut log)
            .unwrap();

        assert!(!mgr.is_overriding());

        let sent = mgr.link.driver().sent();
        assert_eq!(sent.len(), 6);
        assert_eq!((sent[3].params[0], sent[3].params[1]), (1.0, 1500.0));
        assert_eq!((sent[4].params[0], sent[4].params[1]), (3.0, 1500.0));
        assert_eq!(sent[5].command, MAV_CMD_DO_PAUSE_CONTINUE);
        assert_eq!(sent[5].params[0], 0.0);

        // Exactly one pause and one resume across the episode
        assert_eq!(pauses(&mgr), vec![1.0, 0.0]);
    }

    #[test]
    fn test_pause_link_failure_stays_autonomous() {
        let mut mgr = test_mgr();
        let mut log = MissionLog::new();

        // Both the attempt and the retry fail
        mgr.link.driver_mut().queue_send_error(LinkError::SendTimeout);
        mgr.link.driver_mut().queue_send_error(LinkError::SendTimeout);

        mgr.step(Some(ManeuverIntent::TurnLeft), &mut log).unwrap();

        assert!(!mgr.is_overriding());
        assert_eq!(servo_writes(&mgr).len(), 0);
        assert_eq!(mgr.tm().num_pause_failures, 1);

        // Exactly one mission log entry records the failed pause
        let failures: Vec<_> = log
            .entries()
            .iter()
            .filter(|e| e.contains("pause failed"))
            .collect();
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn test_pause_retry_succeeds() {
        let mut mgr = test_mgr();
        let mut log = MissionLog::new();

        mgr.link.driver_mut().queue_send_error(LinkError::SendTimeout);

        mgr.step(Some(ManeuverIntent::TurnLeft), &mut log).unwrap();

        assert!(mgr.is_overriding());
        assert_eq!(pauses(&mgr), vec![1.0]);
    }

    #[test]
    fn test_pause_rejection_stays_autonomous() {
        let mut mgr = test_mgr();
        let mut log = MissionLog::new();

        mgr.link.driver_mut().queue_ack_result(AckResult::Denied);

        mgr.step(Some(ManeuverIntent::TurnRight), &mut log).unwrap();

        assert!(!mgr.is_overriding());
        assert_eq!(servo_writes(&mgr).len(), 0);
    }

    #[test]
    fn test_turn_around_single_pause_two_legs() {
        let mut mgr = test_mgr();
        let mut log = MissionLog::new();

        let t0 = Instant::now();
        mgr.step_at(t0, Some(ManeuverIntent::TurnAround), &mut log)
            .unwrap();

        // First leg: steer left
        assert_eq!(servo_writes(&mgr)[0], (1.0, 1100.0));

        // Second leg: steer right at the leg boundary
        let t1 = t0 + Duration::from_millis(1500);
        mgr.step_at(t1, None, &mut log).unwrap();
        assert_eq!(servo_writes(&mgr)[2], (1.0, 1900.0));
        assert!(mgr.is_overriding());

        // Completion after the second leg
        mgr.step_at(t1 + Duration::from_millis(1500), None, &mut log)
            .unwrap();
        assert!(!mgr.is_overriding());

        // One pause, one resume - the sequence is a single episode
        assert_eq!(pauses(&mgr), vec![1.0, 0.0]);
    }

    #[test]
    fn test_resume_rejection_is_fatal_and_reneutralises() {
        let mut mgr = test_mgr();
        let mut log = MissionLog::new();

        let t0 = Instant::now();
        mgr.step_at(t0, Some(ManeuverIntent::TurnRight), &mut log)
            .unwrap();

        // The resume's ack will be a denial
        mgr.link.driver_mut().queue_ack_result(AckResult::Denied);

        let result = mgr.step_at(t0 + Duration::from_millis(2000), None, &mut log);

        match result {
            Err(OverrideMgrError::ResumeRejected(AckResult::Denied)) => (),
            other => panic!("Expected ResumeRejected, got {:?}", other),
        }

        // The last commands on the link are a re-issued neutral
        let writes = servo_writes(&mgr);
        let last_two = &writes[writes.len() - 2..];
        assert_eq!(last_two, &[(1.0, 1500.0), (3.0, 1500.0)]);
    }

    #[test]
    fn test_steer_failure_mid_override_is_fatal_after_safing() {
        let mut mgr = test_mgr();
        let mut log = MissionLog::new();

        let t0 = Instant::now();
        mgr.step_at(t0, Some(ManeuverIntent::TurnAround), &mut log)
            .unwrap();

        // Make the second leg's write fail on both the attempt and the retry
        mgr.link.driver_mut().queue_send_error(LinkError::SendTimeout);
        mgr.link.driver_mut().queue_send_error(LinkError::SendTimeout);

        let result = mgr.step_at(t0 + Duration::from_millis(1500), None, &mut log);

        match result {
            Err(OverrideMgrError::LinkFailedWhileOverriding(_)) => (),
            other => panic!("Expected LinkFailedWhileOverriding, got {:?}", other),
        }
        assert!(!mgr.is_overriding());

        // The last-resort neutral went out once the queued faults drained
        let writes = servo_writes(&mgr);
        let last_two = &writes[writes.len() - 2..];
        assert_eq!(last_two, &[(1.0, 1500.0), (3.0, 1500.0)]);
    }

    #[test]
    fn test_shutdown_mid_override_neutralises_and_resumes() {
        let mut mgr = test_mgr();
        let mut log = MissionLog::new();

        mgr.step(Some(ManeuverIntent::TurnRight), &mut log).unwrap();
        assert!(mgr.is_overriding());

        mgr.shutdown(&mut log);

        assert!(!mgr.is_overriding());

        let sent = mgr.link.driver().sent();
        let n = sent.len();
        // Neutral on both channels, then resume, as the final commands
        assert_eq!((sent[n - 3].params[0], sent[n - 3].params[1]), (1.0, 1500.0));
        assert_eq!((sent[n - 2].params[0], sent[n - 2].params[1]), (3.0, 1500.0));
        assert_eq!(sent[n - 1].command, MAV_CMD_DO_PAUSE_CONTINUE);
        assert_eq!(sent[n - 1].params[0], 0.0);
    }

    #[test]
    fn test_shutdown_while_autonomous_is_quiet() {
        let mut mgr = test_mgr();
        let mut log = MissionLog::new();

        mgr.shutdown(&mut log);

        assert_eq!(mgr.link.driver().sent().len(), 0);
    }
}
