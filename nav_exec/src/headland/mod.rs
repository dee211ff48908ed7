//! # Headland module
//!
//! Boundary offset geometry and the field manager which keeps it up to date.
//!
//! Headland rings are too expensive to compute during a tick, so edits to the track, boundary
//! or headland setup are posted to a background worker. The worker publishes each finished
//! result as an immutable [`FieldSnapshot`] which the tick picks up by cloning an `Arc`.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod offset;
mod params;
mod worker;

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{channel, Receiver, RecvTimeoutError, SendError, Sender, TryRecvError},
        Arc, PoisonError, RwLock,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{error, info, warn};
use nav_if::cmd::{JoinStyle, NavCmd};
use serde::Serialize;

use crate::field::{BoundaryError, Field};
use crate::geom::Point;
use crate::track::{Track, TrackError, TrackParams};

use self::worker::{worker_thread, WorkerSignal};

pub use self::offset::{
    inward_offset, line_offset, multi_pass_inward, outward_offset, point_headings,
};
pub use self::params::HeadlandParams;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Manages the field geometry and its background recomputation.
#[derive(Debug)]
pub struct FieldMgr {
    shared: Arc<Shared>,

    worker_jh: Option<JoinHandle<Result<(), FieldMgrError>>>,

    worker_sender: Sender<WorkerSignal>,
    worker_reciever: Receiver<WorkerSignal>,

    track_params: TrackParams,
}

/// An immutable, versioned copy of the field geometry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldSnapshot {
    /// Version of the last edit included in this snapshot.
    pub version: u64,

    /// The guidance track with all nudges applied.
    pub track: Option<Arc<Track>>,

    pub field: Option<Field>,

    /// The headland setup the rings were built with.
    pub headland: Option<HeadlandSpec>,

    /// Headland rings, outermost first.
    pub headland_rings: Vec<Vec<Point>>,

    /// Each island grown by the full headland width, in island order.
    pub island_rings: Vec<Vec<Point>>,
}

/// Headland setup from the operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeadlandSpec {
    pub pass_width_m: f64,
    pub num_passes: usize,
    pub join: JoinStyle,
}

#[derive(Debug)]
struct Shared {
    params: HeadlandParams,
    track_params: TrackParams,

    /// Latest version posted to the worker.
    requested_version: AtomicU64,

    snapshot: RwLock<Arc<FieldSnapshot>>,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

/// A validated edit to the field geometry.
#[derive(Debug, Clone)]
pub enum FieldEdit {
    SetTrack(Track),
    NudgeTrack(f64),
    ClearTrack,
    SetField(Field),
    SetHeadland(HeadlandSpec),
}

#[derive(Debug, thiserror::Error)]
pub enum FieldMgrError {
    #[error("Sync primitive is poisoned")]
    PoisonError,

    #[error("Failed to send signal {0:?} between threads")]
    SendError(Box<WorkerSignal>),

    #[error("Failed to receive signal between threads")]
    RecvError,

    #[error("Couldn't start the worker thread: {0}")]
    SpawnError(std::io::Error),

    #[error("The worker thread has stopped")]
    WorkerStopped,

    #[error("Invalid track: {0}")]
    TrackError(TrackError),

    #[error("Invalid boundary: {0}")]
    BoundaryError(BoundaryError),

    #[error("Invalid headland setup: {0} passes of {1} m")]
    InvalidHeadland(usize, f64),

    #[error("Cannot nudge by {0} m")]
    InvalidNudge(f64),

    #[error("There is no track to nudge")]
    NoTrack,

    #[error("Invalid headland parameters: {0:?}")]
    InvalidParams(HeadlandParams),
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl FieldMgr {
    /// Create a new field manager and start its worker.
    pub fn new(params: HeadlandParams, track_params: TrackParams) -> Result<Self, FieldMgrError> {
        if !params.is_valid() {
            return Err(FieldMgrError::InvalidParams(params));
        }

        let shared = Arc::new(Shared {
            params,
            track_params: track_params.clone(),
            requested_version: AtomicU64::new(0),
            snapshot: RwLock::new(Arc::new(FieldSnapshot::default())),
        });
        let shared_worker = shared.clone();

        let (worker_sender, rx) = channel();
        let (tx, worker_reciever) = channel();

        let worker_jh = thread::Builder::new()
            .name("headland::worker".into())
            .spawn(move || worker_thread(shared_worker, tx, rx))
            .map_err(FieldMgrError::SpawnError)?;

        Ok(Self {
            shared,
            worker_jh: Some(worker_jh),
            worker_sender,
            worker_reciever,
            track_params,
        })
    }

    /// Apply an operator command.
    ///
    /// The command is validated here and then posted to the worker, the new geometry is
    /// published some time later. Returns the version of the posted edit, or `None` if the
    /// command doesn't edit the field.
    pub fn apply(&mut self, cmd: &NavCmd) -> Result<Option<u64>, FieldMgrError> {
        let edit = match cmd {
            NavCmd::SetLine { a, b } => {
                FieldEdit::SetTrack(Track::from_line_coords(*a, *b, &self.track_params)?)
            }
            NavCmd::SetCurve { points, closed } => {
                FieldEdit::SetTrack(Track::from_curve_coords(points, *closed)?)
            }
            NavCmd::NudgeTrack { offset_m } => {
                if !offset_m.is_finite() {
                    return Err(FieldMgrError::InvalidNudge(*offset_m));
                }
                FieldEdit::NudgeTrack(*offset_m)
            }
            NavCmd::ClearTrack => FieldEdit::ClearTrack,
            NavCmd::SetBoundary { outer, islands } => {
                FieldEdit::SetField(Field::from_coords(outer, islands)?)
            }
            NavCmd::SetHeadland {
                pass_width_m,
                num_passes,
                join,
            } => {
                if !pass_width_m.is_finite() || *pass_width_m < 0.0 {
                    return Err(FieldMgrError::InvalidHeadland(*num_passes, *pass_width_m));
                }
                FieldEdit::SetHeadland(HeadlandSpec {
                    pass_width_m: *pass_width_m,
                    num_passes: *num_passes,
                    join: *join,
                })
            }
            NavCmd::ResetApplied => return Ok(None),
        };

        self.post(edit).map(Some)
    }

    /// Post an edit to the worker, returning its version.
    pub fn post(&mut self, edit: FieldEdit) -> Result<u64, FieldMgrError> {
        let version = self.shared.requested_version.fetch_add(1, Ordering::SeqCst) + 1;

        self.worker_sender.send(WorkerSignal::Edit(version, edit))?;

        Ok(version)
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Result<Arc<FieldSnapshot>, FieldMgrError> {
        Ok(self.shared.snapshot.read()?.clone())
    }

    /// Version of the most recently posted edit.
    pub fn requested_version(&self) -> u64 {
        self.shared.requested_version.load(Ordering::SeqCst)
    }

    /// Handle signals from the worker without blocking.
    ///
    /// Returns the version of the newest snapshot published since the last call, if any.
    pub fn poll(&mut self) -> Result<Option<u64>, FieldMgrError> {
        let mut published = None;

        loop {
            match self.worker_reciever.try_recv() {
                Ok(signal) => {
                    if let Some(v) = self.handle_signal(signal) {
                        published = Some(v);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    error!("Headland worker has stopped");
                    return Err(FieldMgrError::WorkerStopped);
                }
            }
        }

        Ok(published)
    }

    /// Block until a snapshot at least as new as `version` is published, or until the worker has
    /// dealt with `version` without publishing it (because it failed).
    ///
    /// Returns `false` on timeout.
    pub fn wait_for(&mut self, version: u64, timeout: Duration) -> Result<bool, FieldMgrError> {
        let deadline = Instant::now() + timeout;

        loop {
            if self.snapshot()?.version >= version {
                return Ok(true);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());

            match self.worker_reciever.recv_timeout(remaining) {
                Ok(WorkerSignal::Error(v, e)) => {
                    error!("Field edit {} failed: {}", v, e);
                    if v >= version {
                        return Ok(true);
                    }
                }
                Ok(signal) => {
                    self.handle_signal(signal);
                }
                Err(RecvTimeoutError::Timeout) => return Ok(false),
                Err(RecvTimeoutError::Disconnected) => return Err(FieldMgrError::WorkerStopped),
            }
        }
    }

    fn handle_signal(&self, signal: WorkerSignal) -> Option<u64> {
        match signal {
            WorkerSignal::Published(v) => {
                info!("Field snapshot {} published", v);
                Some(v)
            }
            WorkerSignal::Error(v, e) => {
                error!("Field edit {} failed: {}", v, e);
                None
            }
            s => {
                warn!("Unexpected signal from worker: {:?}", s);
                None
            }
        }
    }
}

impl Drop for FieldMgr {
    fn drop(&mut self) {
        if let Some(jh) = self.worker_jh.take() {
            // The worker may already have exited, in which case there's nothing to stop
            self.worker_sender.send(WorkerSignal::Stop).ok();

            match jh.join() {
                Ok(Ok(())) => (),
                Ok(Err(e)) => error!("Headland worker exited with an error: {}", e),
                Err(_) => error!("Headland worker panicked"),
            }
        }
    }
}

impl FieldSnapshot {
    /// The innermost headland ring, which bounds the workable area.
    pub fn headland_ring(&self) -> Option<&[Point]> {
        self.headland_rings.last().map(|r| r.as_slice())
    }
}

impl From<TrackError> for FieldMgrError {
    fn from(e: TrackError) -> Self {
        Self::TrackError(e)
    }
}

impl From<BoundaryError> for FieldMgrError {
    fn from(e: BoundaryError) -> Self {
        Self::BoundaryError(e)
    }
}

impl<G> From<PoisonError<G>> for FieldMgrError {
    fn from(_: PoisonError<G>) -> Self {
        Self::PoisonError
    }
}

impl From<SendError<WorkerSignal>> for FieldMgrError {
    fn from(e: SendError<WorkerSignal>) -> Self {
        Self::SendError(Box::new(e.0))
    }
}
