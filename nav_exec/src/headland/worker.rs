//! Worker thread which recomputes the field geometry without blocking the tick.

// -----------------------------------------------------------------------------------------------
// INCLUDES
// -----------------------------------------------------------------------------------------------

use std::sync::{
    atomic::Ordering,
    mpsc::{Receiver, Sender, TryRecvError},
    Arc,
};

use log::{debug, warn};
use util::session;

use crate::field::Field;
use crate::track::Track;

use super::{
    offset::{multi_pass_inward_until, outward_offset},
    FieldEdit, FieldMgrError, FieldSnapshot, HeadlandSpec, Shared,
};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// The worker's view of the latest edits, ahead of what has been published.
#[derive(Default)]
struct Pending {
    track: Option<Arc<Track>>,
    field: Option<Field>,
    headland: Option<HeadlandSpec>,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug)]
pub enum WorkerSignal {
    /// The worker should stop it's operations
    Stop,

    /// An edit and its version
    Edit(u64, FieldEdit),

    /// A snapshot including all edits up to this version has been published
    Published(u64),

    /// The edit with this version could not be applied
    Error(u64, Box<FieldMgrError>),
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

pub(super) fn worker_thread(
    shared: Arc<Shared>,
    main_sender: Sender<WorkerSignal>,
    main_reciever: Receiver<WorkerSignal>,
) -> Result<(), FieldMgrError> {
    let mut pending = Pending::default();

    // Newest edit seen, and whether any edit since the last publish changed the pending state
    let mut received = 0u64;
    let mut dirty = false;

    // Wait for edits from main
    while let Ok(signal) = main_reciever.recv() {
        let mut stop = false;
        let mut next = Some(signal);

        // Apply every queued edit before computing, earlier ones would be superseded anyway
        while let Some(signal) = next.take() {
            match signal {
                WorkerSignal::Stop => {
                    stop = true;
                    break;
                }
                WorkerSignal::Edit(version, edit) => {
                    received = received.max(version);

                    match pending.apply(edit, &shared) {
                        Ok(()) => dirty = true,
                        Err(e) => {
                            warn!("Rejected field edit {}: {}", version, e);
                            main_sender.send(WorkerSignal::Error(version, Box::new(e)))?;
                        }
                    }
                }
                s => warn!("Unexpected signal from main: {:?}", s),
            }

            next = match main_reciever.try_recv() {
                Ok(s) => Some(s),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    stop = true;
                    None
                }
            };
        }

        if stop {
            break;
        }

        if !dirty {
            continue;
        }

        let snapshot = match compute(&shared, &pending, received) {
            Some(s) => s,
            None => {
                debug!("Field edit {} superseded before it was computed", received);
                continue;
            }
        };

        *shared.snapshot.write()? = Arc::new(snapshot.clone());
        dirty = false;
        session::save_with_timestamp("field/snapshot.json", snapshot);

        main_sender.send(WorkerSignal::Published(received))?;
    }

    Ok(())
}

/// Build a snapshot of the pending state, or `None` if a newer edit supersedes it part way.
fn compute(shared: &Shared, pending: &Pending, version: u64) -> Option<FieldSnapshot> {
    let superseded = || shared.requested_version.load(Ordering::SeqCst) > version;

    let mut snapshot = FieldSnapshot {
        version,
        track: pending.track.clone(),
        field: pending.field.clone(),
        headland: pending.headland,
        ..Default::default()
    };

    let (field, spec) = match (&pending.field, pending.headland) {
        (Some(f), Some(h)) if h.num_passes > 0 && h.pass_width_m > 0.0 => (f, h),
        _ => return Some(snapshot),
    };

    snapshot.headland_rings = multi_pass_inward_until(
        field.outer.points(),
        spec.pass_width_m,
        spec.num_passes,
        &shared.params,
        &superseded,
    )?;

    let total_width_m = spec.pass_width_m * spec.num_passes as f64;

    for (i, island) in field.islands.iter().enumerate() {
        if superseded() {
            return None;
        }

        match outward_offset(island.points(), total_width_m, spec.join, &shared.params) {
            Some(r) => snapshot.island_rings.push(r),
            None => {
                warn!("Couldn't grow island {}, using its boundary", i);
                snapshot.island_rings.push(island.points().to_vec());
            }
        }
    }

    debug!(
        "Field snapshot {}: {} headland rings, {} island rings",
        version,
        snapshot.headland_rings.len(),
        snapshot.island_rings.len()
    );

    Some(snapshot)
}

impl Pending {
    fn apply(&mut self, edit: FieldEdit, shared: &Shared) -> Result<(), FieldMgrError> {
        match edit {
            FieldEdit::SetTrack(t) => self.track = Some(Arc::new(t)),
            FieldEdit::NudgeTrack(offset_m) => {
                let nudged = match self.track {
                    Some(ref t) => t.nudged(offset_m, &shared.track_params)?,
                    None => return Err(FieldMgrError::NoTrack),
                };
                self.track = Some(Arc::new(nudged));
            }
            FieldEdit::ClearTrack => self.track = None,
            FieldEdit::SetField(f) => self.field = Some(f),
            FieldEdit::SetHeadland(h) => self.headland = Some(h),
        }

        Ok(())
    }
}
