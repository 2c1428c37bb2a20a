//! Deterministic, pure logic for the retention decision.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and take the reference time as an argument, so results are stable
//! across runs and suitable for tests.

pub mod retention;
pub mod size;
pub mod stats;
pub mod types;
