//! Transit log: per-stage observations of in-flight values.
//!
//! Stages and the exit adapter send observations over a channel to one
//! collector thread, so the log has a single writer and workers never share
//! a lock. The collector stops when every sender is gone.

use std::time::Duration;

use crossbeam::channel::Receiver;
use serde::Serialize;

/// Where an observation was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TracePoint {
    /// Values as they entered stage `i` (1-based).
    Stage(u32),
    /// Final values leaving the pipeline.
    Egress,
}

/// One transit-log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEvent {
    pub point: TracePoint,
    pub tag: u64,
    pub acc: u64,
    pub base: u64,
    /// Offset from run start.
    pub elapsed: Duration,
}

/// Collect events until every sender hangs up; returns arrival order.
pub(crate) fn run_collector(rx: Receiver<TraceEvent>) -> Vec<TraceEvent> {
    let mut log = Vec::new();
    while let Ok(event) = rx.recv() {
        log.push(event);
    }
    log
}
