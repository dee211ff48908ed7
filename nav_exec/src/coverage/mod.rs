//! # Coverage module
//!
//! Containment of implement segments in the field, coverage of the area already worked and
//! headland detection, brought together by [`SectionCtrl`] which switches the tool's sections.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod applied;
pub mod boundary;
pub mod headland_detect;
pub mod section_ctrl;
pub mod tool;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use self::applied::AppliedArea;
pub use self::boundary::{classify_in_field, classify_segment};
pub use self::headland_detect::{HeadlandDetectParams, HeadlandDetector};
pub use self::section_ctrl::{SectionCtrl, SectionCtrlError, SectionCtrlOutput, SectionCtrlParams};
pub use self::tool::{SectionGeometry, ToolParams};
