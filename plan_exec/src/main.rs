//! # Mission Plan Conversion Tool
//!
//! Converts an ordered waypoint CSV into the plan document consumed by the
//! ground control software. Runs entirely offline - this tool never touches
//! the vessel link, so a bad waypoint file can be fixed and re-run without
//! consequence.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use std::path::PathBuf;
use structopt::StructOpt;

// Internal
use mav_if::plan::{self, PlanProfile};

// ------------------------------------------------------------------------------------------------
// CLI OPTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a waypoint CSV into a ground-control mission plan
#[derive(Debug, StructOpt)]
#[structopt(name = "plan_exec")]
struct Opt {
    /// Waypoint CSV with latitude/longitude columns
    csv: PathBuf,

    /// Output plan file path
    #[structopt(short, long, default_value = "mission.plan")]
    output: PathBuf,

    /// Override the profile's default waypoint altitude, in metres
    #[structopt(short, long)]
    altitude: Option<f64>,

    /// Load a plan profile from the params directory instead of using the
    /// built-in surface vessel profile
    #[structopt(long)]
    profile: Option<String>,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    let opt = Opt::from_args();

    let mut profile: PlanProfile = match opt.profile {
        Some(ref name) => {
            util::params::load(name).wrap_err("Could not load the plan profile params")?
        }
        None => PlanProfile::default(),
    };

    if let Some(alt) = opt.altitude {
        profile.default_alt_m = alt;
    }

    let waypoints = plan::waypoints_from_csv(&opt.csv, profile.default_alt_m)
        .wrap_err("Could not read the waypoint CSV")?;

    let doc = plan::build(&waypoints, &profile).wrap_err("Could not build the mission plan")?;

    doc.save(&opt.output).wrap_err("Could not write the plan file")?;

    println!(
        "Converted {:?} to {:?}: {} items, home position {:?}",
        opt.csv,
        opt.output,
        doc.num_items(),
        doc.planned_home_position()
    );

    Ok(())
}
