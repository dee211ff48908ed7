//! # Navigation library.
//!
//! The autosteer navigation core. Sentences from the positioning receiver are parsed into a pose,
//! which drives pure pursuit guidance along the active track and section control against the
//! field boundary, headland and already applied area.
//!
//! Field geometry (tracks, boundaries and headland rings) is edited by operator commands and
//! recomputed off the tick by the [`headland::FieldMgr`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Coverage module - containment, applied area, headland detection and section control
pub mod coverage;

/// Data store - state shared between the stages of a tick in the executable
pub mod data_store;

/// Field boundaries and islands
pub mod field;

/// Planar geometry primitives in the local plane
pub mod geom;

/// Guidance module - pure pursuit steering along the active track
pub mod guidance;

/// Headland module - boundary offsets and the background field manager
pub mod headland;

/// Localisation module - holds the vehicle's pose in the local plane
pub mod loc;

/// Replay log - drives the core from a recording
pub mod replay;

/// Sentence parser - decodes positioning sentences into fixes
pub mod sentence;

/// Track module - AB lines, curves and nudging
pub mod track;
