//! Correctness report: pipeline results against the independent reference.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::arith::reference_pow;
use crate::schedule::KeySchedule;
use crate::source::WorkItem;

/// Verdict for one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub id: u64,
    /// Message value the item carried in.
    pub input: u64,
    /// What came out of the pipeline. `None` means the item never exited;
    /// the handshake discipline makes that unreachable short of a defect,
    /// and it is reported rather than panicked on.
    pub pipeline: Option<u64>,
    /// Independently recomputed value.
    pub expected: u64,
    pub matched: bool,
}

/// Aggregate verdict for a run, complete once the controller stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectnessReport {
    pub exponent: u64,
    pub modulus: u64,
    pub entries: Vec<ReportEntry>,
    pub mismatches: usize,
}

impl CorrectnessReport {
    /// Compare pipeline results against the reference, one entry per
    /// admitted item, in admission order.
    pub(crate) fn build(
        schedule: &KeySchedule,
        admitted: &[WorkItem],
        results: &BTreeMap<u64, u64>,
    ) -> Self {
        let mut entries = Vec::with_capacity(admitted.len());
        let mut mismatches = 0;
        for item in admitted {
            let expected = reference_pow(item.value, schedule.exponent(), schedule.modulus());
            let pipeline = results.get(&item.id).copied();
            let matched = pipeline == Some(expected);
            if !matched {
                mismatches += 1;
            }
            entries.push(ReportEntry {
                id: item.id,
                input: item.value,
                pipeline,
                expected,
                matched,
            });
        }
        Self {
            exponent: schedule.exponent(),
            modulus: schedule.modulus(),
            entries,
            mismatches,
        }
    }

    pub fn all_matched(&self) -> bool {
        self.mismatches == 0
    }
}
