#![forbid(unsafe_code)]

//! Software model of a pipelined modular-exponentiation engine.
//!
//! The exponent is cut into equal-width slices, one per pipeline stage; each
//! stage advances an in-flight `(accumulator, base, tag)` transit through its
//! slice with Blakely's bit-serial multiply-reduce. Stages hand transits to
//! each other over single-slot ready/valid handshakes, so items overlap
//! across stages without loss, duplication, or reordering. A run ends with a
//! correctness report against an independent reference computation.

pub mod arith;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod schedule;
pub mod source;
pub mod telemetry;
pub mod timing;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the run surface at crate root for convenience
pub use crate::config::Profile;
pub use crate::pipeline::{RunOutcome, Transit, run};
pub use crate::report::{CorrectnessReport, ReportEntry};
pub use crate::schedule::KeySchedule;
pub use crate::source::WorkItem;
