//! # Navigation interface crate.
//!
//! Provides the types exchanged between the navigation core and its collaborators: operator
//! commands coming in and per-tick outputs going out.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Operator commands which edit the field and track
pub mod cmd;

/// Outputs produced by the navigation core each tick
pub mod out;
