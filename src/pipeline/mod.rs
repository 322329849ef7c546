//! Pipeline assembly: boundaries, workers, run lifecycle.
//!
//! Thread layout mirrors the hardware. One worker per stage sits between
//! single-slot handshake boundaries, with the entry adapter ahead of stage 1
//! and the exit adapter after stage K. The admission controller serializes
//! the backlog, and a trace collector owns the transit log. Workers talk
//! only over channels.

pub mod boundary;
mod controller;
mod entry;
mod exit;
mod stage;
pub mod trace;

use std::thread;
use std::time::Instant;

use crossbeam::channel::{bounded, unbounded};
use thiserror::Error;
use tracing::info;

use crate::report::CorrectnessReport;
use crate::schedule::{ConfigError, KeySchedule};
use crate::source::WorkItem;

use self::controller::AdmissionController;
use self::entry::EntryAdapter;
use self::exit::ExitAdapter;

pub use self::stage::StageUnit;
pub use self::trace::{TraceEvent, TracePoint};

/// In-flight `(accumulator, base, tag)` triple. Exactly one worker holds a
/// given transit at any time; boundaries transfer ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transit {
    pub acc: u64,
    pub base: u64,
    pub tag: u64,
}

/// Everything a finished run produces.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: CorrectnessReport,
    /// Transit log in arrival order.
    pub trace: Vec<TraceEvent>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A worker died mid-run; the handshake discipline makes this
    /// unreachable short of a defect.
    #[error("pipeline worker `{worker}` panicked")]
    WorkerPanicked { worker: String },
}

/// Run a backlog through the sliced pipeline to completion.
///
/// Spawns one thread per worker, blocks until the drain finishes, and
/// returns the correctness report plus the transit log. The backlog is
/// finite; admission past its end answers with exhaustion and triggers the
/// drain.
pub fn run(schedule: &KeySchedule, backlog: Vec<WorkItem>) -> Result<RunOutcome, EngineError> {
    let slice_width = schedule.slice_width();
    let modulus = schedule.modulus();

    let mut stages = Vec::with_capacity(schedule.slices().len());
    for (i, &slice) in schedule.slices().iter().enumerate() {
        stages.push(StageUnit::new(i as u32 + 1, slice, slice_width, modulus)?);
    }

    let controller = AdmissionController::new(schedule.clone(), backlog);
    let last_tag = controller.last_tag();

    let (request_tx, request_rx) = unbounded();
    let (drained_tx, drained_rx) = bounded(1);
    let (trace_tx, trace_rx) = unbounded();

    let started = Instant::now();
    info!(
        stages = schedule.stage_count(),
        width = schedule.width(),
        slice_width,
        "pipeline starting"
    );

    let controller_handle = thread::Builder::new()
        .name("controller".into())
        .spawn(move || controller.run(request_rx, drained_rx))
        .expect("spawn controller");

    let collector_handle = thread::Builder::new()
        .name("trace-collector".into())
        .spawn(move || trace::run_collector(trace_rx))
        .expect("spawn trace collector");

    let mut workers = Vec::with_capacity(stages.len() + 2);

    // Boundaries chain entry -> stage 1 -> ... -> stage K -> exit; each
    // spawn takes the consumer half left by its upstream neighbour.
    let (first_producer, mut upstream) = boundary::boundary();

    let entry = EntryAdapter { modulus };
    workers.push(
        thread::Builder::new()
            .name("entry".into())
            .spawn(move || entry.run(request_tx, first_producer))
            .expect("spawn entry adapter"),
    );

    for unit in stages {
        let (downstream, next_upstream) = boundary::boundary();
        let trace_tx = trace_tx.clone();
        let name = format!("stage-{}", unit.index());
        workers.push(
            thread::Builder::new()
                .name(name)
                .spawn(move || unit.run(upstream, downstream, trace_tx, started))
                .expect("spawn stage"),
        );
        upstream = next_upstream;
    }

    let exit = ExitAdapter { last_tag };
    workers.push(
        thread::Builder::new()
            .name("exit".into())
            .spawn(move || exit.run(upstream, trace_tx, drained_tx, started))
            .expect("spawn exit adapter"),
    );

    // Workers first; their exits release the controller and the collector.
    let mut panicked: Option<String> = None;
    for handle in workers {
        let name = handle.thread().name().unwrap_or("worker").to_string();
        if handle.join().is_err() && panicked.is_none() {
            panicked = Some(name);
        }
    }

    let report = controller_handle
        .join()
        .map_err(|_| EngineError::WorkerPanicked { worker: "controller".into() })?;
    let trace = collector_handle
        .join()
        .map_err(|_| EngineError::WorkerPanicked { worker: "trace-collector".into() })?;

    if let Some(worker) = panicked {
        return Err(EngineError::WorkerPanicked { worker });
    }

    info!(
        items = report.entries.len(),
        mismatches = report.mismatches,
        elapsed = ?started.elapsed(),
        "pipeline drained"
    );
    Ok(RunOutcome { report, trace })
}
