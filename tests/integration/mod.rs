//! Integration test suite for fanout.
//!
//! These tests exercise the full analysis pipeline: building a
//! dependency graph, judging parallelizability, planning batches,
//! detecting conflicts in simulated results, and aggregating progress.
//!
//! # Test Categories
//!
//! - `pipeline_e2e`: The full graph-to-progress workflow
//! - `scheduling`: Batch planning invariants across goals
//! - `conflict_detection`: Conflict passes and strategy selection
//!
//! All inputs are fixed in-memory task sets; no processes are spawned
//! and nothing touches the filesystem, so the suite is CI safe.

mod fixtures;

mod conflict_detection;
mod pipeline_e2e;
mod scheduling;
