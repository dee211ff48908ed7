//! Navigation executable entry point.
//!
//! # Architecture
//!
//! The executable replays a recorded log through the navigation core. Each sentence in the log
//! is one tick:
//!
//!     - Operator command processing, edits are posted to the field manager
//!     - Sentence framing and pose update
//!     - Field snapshot acquisition
//!     - Guidance processing
//!     - Section control processing
//!     - Archiving
//!
//! # Modules
//!
//! All tick stages (e.g. `guidance`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!     2. Implement `util::archive::Archived` to write one record per tick.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use nav_lib::{
    coverage::{section_ctrl, SectionCtrlParams},
    data_store::DataStore,
    guidance::{self, GuidanceParams},
    headland::{FieldMgr, FieldMgrError, HeadlandParams},
    loc::{LocParams, PoseStore},
    replay::ReplayLog,
    sentence::ParseStats,
    track::TrackParams,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use nav_if::cmd::NavCmd;
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use util::{
    archive::Archived,
    logger::{logger_init_with, LevelFilter, LoggerOptions},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Replay a recorded sentence log through the navigation core.
#[derive(Debug, StructOpt)]
#[structopt(name = "nav_exec")]
struct Args {
    /// Path to the replay log
    #[structopt(parse(from_os_str))]
    log_path: PathBuf,

    /// Only write the log to the session's log file
    #[structopt(short, long)]
    quiet: bool,

    /// Replay at this tick rate instead of as fast as possible
    #[structopt(long)]
    rate_hz: Option<f64>,

    /// How long to wait for the field manager to publish after each command
    #[structopt(long, default_value = "5.0")]
    cmd_timeout_s: f64,

    /// Directory containing the parameter files, instead of `$AGNAV_SW_ROOT/params`
    #[structopt(long, parse(from_os_str))]
    params_dir: Option<PathBuf>,
}

/// Summary of a replay, saved into the session at the end.
#[derive(Serialize)]
struct ReplaySummary {
    num_ticks: u64,
    parse_stats: ParseStats,
    num_framer_overflows: u64,
    num_guidance_errors: u64,
    num_section_ctrl_errors: u64,
    num_archive_errors: u64,
    num_applied_patches: usize,
    applied_area_m2: f64,
    field_version: u64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("nav_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger, the per-sentence parser is kept quiet
    logger_init_with(
        LoggerOptions {
            min_level: LevelFilter::Debug,
            to_stdout: !args.quiet,
            target_levels: vec![("nav_lib::sentence".into(), LevelFilter::Info)],
        },
        &session,
    )
    .wrap_err("Failed to initialise logging")?;

    info!("AgNav Navigation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", args);

    // ---- LOAD PARAMETERS ----

    let loc_params: LocParams = load_params(&args, "loc.toml").wrap_err("Could not load loc params")?;
    let track_params: TrackParams =
        load_params(&args, "track.toml").wrap_err("Could not load track params")?;
    let guidance_params: GuidanceParams =
        load_params(&args, "guidance.toml").wrap_err("Could not load guidance params")?;
    let headland_params: HeadlandParams =
        load_params(&args, "headland.toml").wrap_err("Could not load headland params")?;
    let section_ctrl_params: SectionCtrlParams =
        load_params(&args, "section_ctrl.toml").wrap_err("Could not load section control params")?;

    info!("Exec parameters loaded");

    // ---- LOAD REPLAY ----

    info!("Loading replay log from {:?}", args.log_path);

    let mut replay = ReplayLog::new(&args.log_path).wrap_err("Failed to load the replay log")?;

    info!("Loaded replay log containing {} ticks\n", replay.num_ticks());

    if !replay.trailing_cmds().is_empty() {
        warn!(
            "{} commands after the last sentence will not be applied",
            replay.trailing_cmds().len()
        );
    }

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ds = DataStore {
        pose_store: PoseStore::new(&loc_params),
        ..Default::default()
    };

    ds.guidance
        .init(guidance_params, Some(&session))
        .wrap_err("Failed to initialise Guidance")?;
    info!("Guidance init complete");

    ds.section_ctrl
        .init(section_ctrl_params, Some(&session))
        .wrap_err("Failed to initialise SectionCtrl")?;
    info!("SectionCtrl init complete");

    let mut field_mgr =
        FieldMgr::new(headland_params, track_params).wrap_err("Failed to start the FieldMgr")?;
    info!("FieldMgr init complete");

    info!("Module initialisation complete\n");

    let tick_period = match args.rate_hz {
        Some(r) if r > 0.0 => Some(duration_from_secs(1.0 / r).wrap_err("Invalid replay rate")?),
        Some(r) => return Err(eyre!("Replay rate must be positive, got {}", r)),
        None => None,
    };
    let cmd_timeout = duration_from_secs(args.cmd_timeout_s).wrap_err("Invalid command timeout")?;

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    while let Some(tick) = replay.next_tick() {
        let tick_start_instant = Instant::now();

        ds.tick_start();

        // ---- COMMAND PROCESSING ----

        for cmd in tick.cmds.iter() {
            exec_cmd(&mut ds, &mut field_mgr, cmd, cmd_timeout)?;
        }

        // ---- DATA INPUT ----

        ds.ingest_bytes(&tick.sentence);

        if ds.num_sentences == 0 {
            warn!("Line {} did not complete a sentence", tick.line);
        }

        // ---- FIELD SNAPSHOT ----

        field_mgr.poll().wrap_err("The FieldMgr has failed")?;
        let snapshot = field_mgr.snapshot().wrap_err("Could not get the field snapshot")?;

        let pose = ds.pose_store.pose().copied();
        let speed_ms = ds.pose_store.speed_ms();

        // ---- GUIDANCE ----

        ds.guidance_input = guidance::InputData {
            pose,
            speed_ms,
            track: snapshot.track.clone(),
        };

        match ds.guidance.proc(&ds.guidance_input) {
            Ok((o, r)) => {
                ds.guidance_output = o;
                ds.guidance_status_rpt = r;
            }
            Err(e) => {
                // Usually a bad pose, the previous output is not reused
                ds.num_guidance_errors += 1;
                warn!("Error during Guidance processing: {}", e)
            }
        }

        // ---- SECTION CONTROL ----

        ds.section_ctrl_input = section_ctrl::InputData {
            pose,
            speed_ms,
            snapshot,
            reset_applied: std::mem::take(&mut ds.reset_applied),
        };

        match ds.section_ctrl.proc(&ds.section_ctrl_input) {
            Ok((o, r)) => {
                ds.section_ctrl_output = o;
                ds.section_ctrl_status_rpt = r;
            }
            Err(e) => {
                ds.num_section_ctrl_errors += 1;
                warn!("Error during SectionCtrl processing: {}", e)
            }
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ds.guidance.write() {
            ds.num_archive_errors += 1;
            warn!("Could not write the Guidance archive: {}", e);
        }
        if let Err(e) = ds.section_ctrl.write() {
            ds.num_archive_errors += 1;
            warn!("Could not write the SectionCtrl archive: {}", e);
        }

        // ---- TICK MANAGEMENT ----

        if let Some(period) = tick_period {
            let tick_dur = Instant::now() - tick_start_instant;

            match period.checked_sub(tick_dur) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Tick overran by {:.06} s",
                    tick_dur.as_secs_f64() - period.as_secs_f64()
                ),
            }
        }

        ds.tick_end();
    }

    // ---- SHUTDOWN ----

    let summary = ReplaySummary {
        num_ticks: ds.num_ticks,
        parse_stats: *ds.pose_store.stats(),
        num_framer_overflows: ds.framer.num_overflows(),
        num_guidance_errors: ds.num_guidance_errors,
        num_section_ctrl_errors: ds.num_section_ctrl_errors,
        num_archive_errors: ds.num_archive_errors,
        num_applied_patches: ds.section_ctrl.applied().len(),
        applied_area_m2: ds.section_ctrl.applied().gross_area_m2(),
        field_version: field_mgr
            .snapshot()
            .wrap_err("Could not get the field snapshot")?
            .version,
    };

    info!("End of replay after {} ticks", summary.num_ticks);
    info!(
        "    Sentences: {} fixes, {} rejected",
        summary.parse_stats.num_fixes,
        summary.parse_stats.num_errors()
    );
    info!("    Applied area: {:.1} m^2", summary.applied_area_m2);

    session.save("summary.json", summary);
    session.save("coverage/applied.json", ds.section_ctrl.applied().clone());

    // Stop the worker before the session's save thread
    drop(field_mgr);

    session.exit();

    info!("End of execution");

    Ok(())
}

/// Apply one operator command.
///
/// Edits are waited for so the replay is deterministic. Invalid commands are rejected with a
/// warning, only a failed field manager is an error.
fn exec_cmd(
    ds: &mut DataStore,
    field_mgr: &mut FieldMgr,
    cmd: &NavCmd,
    timeout: Duration,
) -> Result<(), Report> {
    debug!("Executing command: {:?}", cmd);

    match field_mgr.apply(cmd) {
        Ok(Some(version)) => {
            let published = field_mgr
                .wait_for(version, timeout)
                .wrap_err("The FieldMgr has failed")?;

            if !published {
                warn!("Field edit {} was not published within {:?}", version, timeout);
            }
        }
        Ok(None) => {
            if let NavCmd::ResetApplied = cmd {
                info!("Applied area reset requested");
                ds.reset_applied = true;
            }
        }
        Err(e @ FieldMgrError::WorkerStopped) | Err(e @ FieldMgrError::SendError(_)) => {
            return Err(e).wrap_err("The FieldMgr has failed")
        }
        Err(e) => warn!("Rejected command {:?}: {}", cmd, e),
    }

    Ok(())
}

/// Convert a CLI duration in seconds, rejecting negative, infinite and NaN values.
fn duration_from_secs(secs: f64) -> Result<Duration, Report> {
    Duration::try_from_secs_f64(secs).map_err(|e| eyre!("{} s is not a duration: {}", secs, e))
}

/// Load a parameter file, from the `--params-dir` directory if given.
fn load_params<P>(args: &Args, file_name: &str) -> Result<P, util::params::LoadError>
where
    P: serde::de::DeserializeOwned,
{
    match args.params_dir {
        Some(ref dir) => util::params::load_from(dir.join(file_name)),
        None => util::params::load(file_name),
    }
}
