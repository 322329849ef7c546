//! Admission controller: the run's single serialization point.
//!
//! All admission flows through one loop that owns the backlog. The drain
//! and the report are driven by messages from the exit adapter; no worker
//! shares a flag or a lock with another.

use std::collections::VecDeque;

use crossbeam::channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::pipeline::exit::DrainSummary;
use crate::report::CorrectnessReport;
use crate::schedule::KeySchedule;
use crate::source::WorkItem;

/// One admission request from the entry adapter, carrying its own reply
/// channel.
pub(crate) struct CaseRequest {
    pub(crate) respond: Sender<Grant>,
}

/// The controller's answer to an admission request.
pub(crate) enum Grant {
    Case(WorkItem),
    Exhausted,
}

/// Controller lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControllerState {
    Serving,
    Draining,
    Reporting,
    Stopped,
}

pub(crate) struct AdmissionController {
    schedule: KeySchedule,
    backlog: VecDeque<WorkItem>,
    state: ControllerState,
}

impl AdmissionController {
    pub(crate) fn new(schedule: KeySchedule, backlog: Vec<WorkItem>) -> Self {
        Self {
            schedule,
            backlog: backlog.into(),
            state: ControllerState::Serving,
        }
    }

    /// Tag of the final backlog item; the exit adapter watches for it.
    pub(crate) fn last_tag(&self) -> Option<u64> {
        self.backlog.back().map(|item| item.id)
    }

    fn transition(&mut self, next: ControllerState) {
        debug!(from = ?self.state, to = ?next, "controller transition");
        self.state = next;
    }

    /// Drive a run to completion: serve admissions until the backlog runs
    /// dry, wait for the exit adapter's drain signal, then build the report.
    pub(crate) fn run(
        mut self,
        requests: Receiver<CaseRequest>,
        drained: Receiver<DrainSummary>,
    ) -> CorrectnessReport {
        let mut admitted: Vec<WorkItem> = Vec::with_capacity(self.backlog.len());

        while let Ok(CaseRequest { respond }) = requests.recv() {
            match self.backlog.pop_front() {
                Some(item) => {
                    debug!(id = item.id, value = item.value, "case granted");
                    admitted.push(item);
                    let _ = respond.send(Grant::Case(item));
                }
                None => {
                    let _ = respond.send(Grant::Exhausted);
                    break;
                }
            }
        }
        self.transition(ControllerState::Draining);

        let summary = drained.recv().unwrap_or_else(|_| {
            // Only a dead exit adapter lands here; report what we have and
            // let the join layer surface the panic.
            warn!("exit adapter went away without a drain signal");
            DrainSummary::default()
        });

        self.transition(ControllerState::Reporting);
        // One egress per admitted item; a short count turns up below as
        // missing entries.
        if summary.items_seen != admitted.len() {
            warn!(
                admitted = admitted.len(),
                exited = summary.items_seen,
                "exit count disagrees with the admission ledger"
            );
        }
        let report = CorrectnessReport::build(&self.schedule, &admitted, &summary.results);
        if report.all_matched() {
            info!(items = report.entries.len(), "all pipeline results match the reference");
        } else {
            warn!(
                mismatches = report.mismatches,
                items = report.entries.len(),
                "pipeline results disagree with the reference"
            );
        }

        self.transition(ControllerState::Stopped);
        report
    }
}
