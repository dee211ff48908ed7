//! Track parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for track validation and nudging.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackParams {
    /// AB lines must be longer than this.
    pub min_line_length_m: f64,

    /// Nudged curve points closer than this to the previously kept point are dropped.
    pub nudge_min_spacing_m: f64,

    /// Number of points averaged when smoothing a nudged curve. Values below 3 disable
    /// smoothing.
    pub nudge_smoothing_window: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            min_line_length_m: 0.1,
            nudge_min_spacing_m: 0.5,
            nudge_smoothing_window: 5,
        }
    }
}
