//! # Operator commands
//!
//! Commands are issued by the operator (or replayed from a log) to change the guidance track,
//! the field boundary and the headland setup. They are serialised as externally tagged JSON, for
//! example:
//!
//! ```json
//! {"SetLine": {"a": [0.0, 0.0], "b": [0.0, 100.0]}}
//! {"NudgeTrack": {"offset_m": 0.25}}
//! "ResetApplied"
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command editing the navigation state.
///
/// Coordinates are in metres in the local plane, `[easting, northing]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NavCmd {
    /// Use a straight AB line as the guidance track.
    SetLine {
        a: [f64; 2],
        b: [f64; 2],
    },

    /// Use a recorded curve as the guidance track. Headings are derived from the points.
    SetCurve {
        points: Vec<[f64; 2]>,

        /// The curve loops back on itself, for example a boundary following curve.
        #[serde(default)]
        closed: bool,
    },

    /// Shift the current track sideways. Positive offsets move the track to the right of its
    /// direction of travel.
    NudgeTrack {
        offset_m: f64,
    },

    /// Remove the guidance track.
    ClearTrack,

    /// Replace the field boundary. Islands are areas inside the outer ring that are not worked.
    SetBoundary {
        outer: Vec<[f64; 2]>,

        #[serde(default)]
        islands: Vec<Vec<[f64; 2]>>,
    },

    /// Configure the headland as a number of passes of the given width inside the boundary.
    SetHeadland {
        pass_width_m: f64,
        num_passes: usize,

        #[serde(default)]
        join: JoinStyle,
    },

    /// Forget all previously applied (covered) area.
    ResetApplied,
}

/// The corner treatment used when offsetting rings outwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinStyle {
    Round,
    Miter,
    Square,
}

/// Possible command parsing errors.
#[derive(Debug, Error)]
pub enum NavCmdParseError {
    #[error("Command contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NavCmd {
    /// Parse a command from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, NavCmdParseError> {
        serde_json::from_str(json_str).map_err(NavCmdParseError::InvalidJson)
    }

    /// Serialise the command to a single line of JSON.
    pub fn to_json(&self) -> Result<String, NavCmdParseError> {
        serde_json::to_string(self).map_err(NavCmdParseError::InvalidJson)
    }

    /// Returns `true` if this command changes the field geometry or track, and so needs a
    /// background recompute.
    pub fn edits_field(&self) -> bool {
        !matches!(self, NavCmd::ResetApplied)
    }
}

impl Default for JoinStyle {
    fn default() -> Self {
        JoinStyle::Round
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            NavCmd::from_json(r#"{"SetLine": {"a": [0.0, 0.0], "b": [0.0, 100.0]}}"#).unwrap(),
            NavCmd::SetLine { a: [0.0, 0.0], b: [0.0, 100.0] }
        );

        assert_eq!(
            NavCmd::from_json(r#"{"SetCurve": {"points": [[0, 0], [1, 1]]}}"#).unwrap(),
            NavCmd::SetCurve { points: vec![[0.0, 0.0], [1.0, 1.0]], closed: false }
        );

        assert_eq!(
            NavCmd::from_json(r#"{"SetHeadland": {"pass_width_m": 6.0, "num_passes": 2}}"#)
                .unwrap(),
            NavCmd::SetHeadland { pass_width_m: 6.0, num_passes: 2, join: JoinStyle::Round }
        );

        assert_eq!(NavCmd::from_json(r#""ResetApplied""#).unwrap(), NavCmd::ResetApplied);
        assert!(!NavCmd::ResetApplied.edits_field());
        assert!(NavCmd::ClearTrack.edits_field());

        assert!(matches!(
            NavCmd::from_json(r#"{"Teleport": {}}"#),
            Err(NavCmdParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_json_is_single_line() {
        let cmd = NavCmd::SetBoundary {
            outer: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]],
            islands: vec![],
        };

        let json = cmd.to_json().unwrap();
        assert!(!json.contains('\n'));
        assert_eq!(NavCmd::from_json(&json).unwrap(), cmd);
    }
}
