//! State module root.
//!
//! The sequencing controller drives the treatment chain
//! (pump → filter → UV) and derives the auditable plant state.

pub mod sequence;
