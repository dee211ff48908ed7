//! # Data Store

use nav_if::out::SteeringOutput;
use util::session;

use crate::{
    coverage::{section_ctrl, SectionCtrl},
    guidance::{self, GuidanceCtrl},
    loc::PoseStore,
    sentence::SentenceFramer,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Tick management
    /// Number of ticks already executed
    pub num_ticks: u64,

    /// Session elapsed time at the start of the tick
    pub tick_time_s: f64,

    // Localisation
    pub framer: SentenceFramer,
    pub pose_store: PoseStore,

    /// Number of sentences completed this tick
    pub num_sentences: usize,

    // Commands
    /// A `ResetApplied` command was received and not yet acted on
    pub reset_applied: bool,

    // Guidance
    pub guidance: GuidanceCtrl,
    pub guidance_input: guidance::InputData,
    pub guidance_output: Option<SteeringOutput>,
    pub guidance_status_rpt: guidance::StatusReport,

    // Section control
    pub section_ctrl: SectionCtrl,
    pub section_ctrl_input: section_ctrl::InputData,
    pub section_ctrl_output: section_ctrl::SectionCtrlOutput,
    pub section_ctrl_status_rpt: section_ctrl::StatusReport,

    // Monitoring counters
    /// Ticks on which guidance returned an error
    pub num_guidance_errors: u64,

    /// Ticks on which section control returned an error
    pub num_section_ctrl_errors: u64,

    /// Number of archive write failures
    pub num_archive_errors: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a tick.
    ///
    /// Clears the per-tick inputs and outputs. The outputs of the previous tick are kept by the
    /// modules themselves.
    pub fn tick_start(&mut self) {
        self.num_sentences = 0;

        self.guidance_input = guidance::InputData::default();
        self.guidance_output = None;
        self.guidance_status_rpt = guidance::StatusReport::default();

        self.section_ctrl_input = section_ctrl::InputData::default();
        self.section_ctrl_status_rpt = section_ctrl::StatusReport::default();

        self.tick_time_s = session::get_elapsed_seconds();
    }

    /// Feed raw bytes to the framer, ingesting every completed sentence into the pose store.
    ///
    /// Rejected sentences are counted by the pose store and otherwise ignored, the last good pose
    /// is kept.
    pub fn ingest_bytes(&mut self, bytes: &[u8]) {
        let pose_store = &mut self.pose_store;
        let num_sentences = &mut self.num_sentences;

        self.framer.push(bytes, |s| {
            *num_sentences += 1;
            pose_store.ingest(s).ok();
        });
    }

    /// Perform actions required at the end of a tick.
    pub fn tick_end(&mut self) {
        self.num_ticks += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sentence::test::{frame, PANDA_BODY};

    #[test]
    fn test_ingest_split_bytes() {
        let mut ds = DataStore::default();
        ds.tick_start();

        let s = format!("{}\r\n", frame(PANDA_BODY));
        let (a, b) = s.as_bytes().split_at(20);

        ds.ingest_bytes(a);
        assert!(ds.pose_store.pose().is_none());

        ds.ingest_bytes(b);
        assert_eq!(ds.num_sentences, 1);
        assert!(ds.pose_store.pose().is_some());

        ds.tick_end();
        ds.tick_start();
        assert_eq!(ds.num_ticks, 1);
        assert_eq!(ds.num_sentences, 0);
    }
}
