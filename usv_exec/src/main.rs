//! Main vessel-side executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and modules
//!     - Build the mission plan (if a waypoint CSV was given)
//!     - Connect to the autopilot link and hand it to the override manager
//!     - Spawn the perception sampler thread
//!     - Main loop:
//!         - Sample intake from the single-slot channel
//!         - Decision processing
//!         - Override management (pause/steer/neutralise/resume)
//!     - Safe the vessel, flush the mission log, save telemetry
//!
//! The loop ends cleanly when the perception source is exhausted or the
//! operator requests a stop, and fatally when the link fails during an
//! override.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use usv_lib::{
    data_store::DataStore,
    override_mgr::{OverrideMgr, OverrideMgrParams},
    perception::{sample_slot, spawn_sampler, ReplaySource, SampleReceiver, SlotRead},
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use mav_if::link::{sim::SimDriver, LinkDriver, LinkParams, MavLink};
use mav_if::plan;
use util::{
    logger::{logger_init, LevelFilter},
    mission_log::MissionLog,
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one control cycle.
const CYCLE_PERIOD_S: f64 = 0.2;

/// Pace at which replayed perception frames are delivered.
const FRAME_INTERVAL_S: f64 = 0.2;

/// Number of sampleless cycles after which signal loss is flagged.
const SAMPLE_LOSS_WARN_CYCLES: u64 = 25;

/// Name of the mission log file within the session directory.
const MISSION_LOG_FILE_NAME: &str = "mission_log.txt";

/// Name of the override telemetry snapshot within the session directory.
const OVERRIDE_TM_FILE_NAME: &str = "override_tm.json";

// ---------------------------------------------------------------------------
// CLI OPTIONS
// ---------------------------------------------------------------------------

/// Vessel control executable
#[derive(Debug, StructOpt)]
#[structopt(name = "usv_exec")]
struct Opt {
    /// Waypoint CSV to convert into a mission plan before the session starts
    #[structopt(long)]
    mission_csv: Option<PathBuf>,

    /// Where to write the converted plan (defaults into the session directory)
    #[structopt(long)]
    plan_out: Option<PathBuf>,

    /// Recorded perception samples to play instead of a live camera feed
    #[structopt(long)]
    replay: PathBuf,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("usv_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Njord USV Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    let opt = Opt::from_args();
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let link_params: LinkParams =
        util::params::load("link.toml").wrap_err("Could not load link params")?;
    let override_params: OverrideMgrParams =
        util::params::load("override_mgr.toml").wrap_err("Could not load override_mgr params")?;

    info!("Exec parameters loaded");

    // ---- MISSION PLAN ----

    // Plan generation runs before any hardware interaction: a bad waypoint
    // file aborts here, with nothing written and the vessel untouched.
    if let Some(ref csv_path) = opt.mission_csv {
        let profile: plan::PlanProfile =
            util::params::load("plan.toml").wrap_err("Could not load plan profile params")?;

        let waypoints = plan::waypoints_from_csv(csv_path, profile.default_alt_m)
            .wrap_err("Could not read the waypoint CSV")?;

        let doc = plan::build(&waypoints, &profile).wrap_err("Could not build the mission plan")?;

        let out_path = match opt.plan_out {
            Some(ref p) => p.clone(),
            None => session.session_root.join("mission.plan"),
        };
        doc.save(&out_path).wrap_err("Could not write the mission plan")?;

        info!(
            "Mission plan with {} items written to {:?}",
            doc.num_items(),
            out_path
        );
    }

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    ds.decision_ctrl
        .init("decision.toml", &session)
        .wrap_err("Failed to initialise DecisionCtrl")?;
    info!("DecisionCtrl init complete");

    let mut mission_log = MissionLog::new();

    // ---- CONNECT LINK ----

    info!("Connecting to the autopilot link ({})", link_params.endpoint);

    // The physical transport ships with the vessel platform; bench sessions
    // run against the simulated driver.
    let mut link = MavLink::connect(SimDriver::new(), link_params)
        .wrap_err("Autopilot link handshake failed")?;

    match link.flight_mode() {
        Ok(mode) => info!("Autopilot flight mode: {:?}", mode),
        Err(e) => warn!("Could not query the flight mode: {}", e),
    }

    let mut mgr = OverrideMgr::new(override_params, link);
    mission_log.log("Mission control started");

    // ---- PERCEPTION ----

    let stop = Arc::new(AtomicBool::new(false));
    let (sample_tx, sample_rx) = sample_slot();

    let source = ReplaySource::from_file(&opt.replay, Duration::from_secs_f64(FRAME_INTERVAL_S))
        .wrap_err("Failed to load the replay source")?;
    info!("Replaying {} recorded perception samples", source.len());

    let sampler = spawn_sampler(Box::new(source), sample_tx, stop.clone());

    // Operator quit request via stdin
    spawn_quit_watcher(stop.clone());

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let session_result = run_loop(&mut ds, &mut mgr, &sample_rx, &stop, &mut mission_log);

    // ---- SHUTDOWN ----

    stop.store(true, Ordering::Relaxed);

    mgr.shutdown(&mut mission_log);
    mission_log.log("Mission ended");

    let log_path = session.session_root.join(MISSION_LOG_FILE_NAME);
    mission_log
        .save(&log_path)
        .wrap_err("Failed to save the mission log")?;
    info!("Mission log saved to {:?}", log_path);

    session
        .save_json(OVERRIDE_TM_FILE_NAME, mgr.tm())
        .wrap_err("Failed to save override telemetry")?;

    if sampler.join().is_err() {
        warn!("Sampler thread panicked");
    }

    // A fatal loop error surfaces only after the vessel is safed and the
    // session artefacts are on disk
    session_result?;

    info!("End of execution");

    Ok(())
}

/// Run the control loop until a terminal condition.
fn run_loop<D: LinkDriver>(
    ds: &mut DataStore,
    mgr: &mut OverrideMgr<D>,
    sample_rx: &SampleReceiver,
    stop: &AtomicBool,
    mission_log: &mut MissionLog,
) -> Result<(), Report> {
    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start();

        // ---- STOP REQUEST ----

        if stop.load(Ordering::Relaxed) {
            mission_log.log("Operator stop request");
            return Ok(());
        }

        // ---- SAMPLE INTAKE ----

        match sample_rx.take() {
            SlotRead::Sample(s) => {
                ds.sample = Some(s);
                ds.cycles_since_sample = 0;
            }
            SlotRead::Empty => {
                // Intermittent signal loss: no decision this cycle, the
                // current state simply carries on
                ds.cycles_since_sample += 1;
                if ds.cycles_since_sample == SAMPLE_LOSS_WARN_CYCLES {
                    warn!("No perception sample for {} cycles", ds.cycles_since_sample);
                }
            }
            SlotRead::Closed => {
                mission_log.log("Perception source exhausted, mission complete");
                return Ok(());
            }
        }

        // ---- DECISION PROCESSING ----

        if let Some(sample) = ds.sample {
            let (intent, report) = ds
                .decision_ctrl
                .proc(&sample)
                .wrap_err("Error during DecisionCtrl processing")?;

            ds.intent = Some(intent);
            ds.decision_status_rpt = report;

            debug!(
                "Decision: {:?} (offset {:?}, deadband {} px)",
                intent, report.offset_px, report.deadband_px
            );
            mission_log.log(&format!("Decision: {:?}", intent));
        }

        // ---- OVERRIDE MANAGEMENT ----

        mgr.step(ds.intent, mission_log)
            .wrap_err("Override manager failure, ending session")?;

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }
}

/// Watch stdin for an operator quit request (`q` or `quit`).
fn spawn_quit_watcher(stop: Arc<AtomicBool>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();

        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if matches!(line.trim(), "q" | "quit") {
                        info!("Operator quit requested");
                        stop.store(true, Ordering::Relaxed);
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
}
