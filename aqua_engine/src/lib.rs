//! # AQUA Scan Engine Library
//!
//! Cyclic process-control engine for a small water-treatment plant.
//! Provides a deterministic fixed-period scan cycle that samples command
//! inputs, runs edge detection, simulated analog adjustment, threshold
//! fault evaluation and the treatment sequencing chain, and publishes
//! every output back to the shared register image as one consistent
//! snapshot.
//!
//! ## Scan Pipeline
//!
//! 1. **Sample**: command bits are read once from the register image
//! 2. **Simulate**: edge-triggered ± steps adjust the analog channels
//! 3. **Evaluate**: alarm flags and the aggregated system fault
//! 4. **Sequence**: pump latch, filter/UV on-delays, status lights
//! 5. **Publish**: one snapshot commit, never incremental writes
//!
//! ## Zero-Allocation Scan Loop
//!
//! All engine state is plain scalar state owned by [`cycle::ScanRunner`].
//! The scan cycle performs zero heap allocations and has no suspension
//! points; concurrency exists only at the register image boundary.

pub mod config;
pub mod cycle;
pub mod logic;
pub mod safety;
pub mod state;
