//! Latency projection for the modeled hardware.
//!
//! Closed-form cycle counts from the stage micro-architecture, not a
//! simulation. The multiplier spends six to nine cycles per operand bit
//! (shift-add plus up to two subtract-compare rounds); a stage pays a fixed
//! start/control/finish overhead around its multiply rounds.

use serde::Serialize;

use crate::schedule::KeySchedule;

/// Target clock of the synthesized design.
pub const DEFAULT_CLOCK_HZ: u64 = 150_000_000;

/// Multiplier cost per operand bit: shift-add only.
const MUL_CYCLES_PER_BIT_BEST: u64 = 6;
/// Multiplier cost per operand bit with both subtract-compare rounds taken.
const MUL_CYCLES_PER_BIT_WORST: u64 = 9;

/// Stage overhead: load/start handshake, per-round control, result latch.
const STAGE_START_CYCLES: u64 = 2;
const STAGE_CONTROL_CYCLES: u64 = 1;
const STAGE_END_CYCLES: u64 = 1;

/// Best/worst cycle window for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleBound {
    pub best: u64,
    pub worst: u64,
}

impl CycleBound {
    fn scale(self, factor: u64) -> CycleBound {
        CycleBound {
            best: self.best.saturating_mul(factor),
            worst: self.worst.saturating_mul(factor),
        }
    }

    fn offset(self, cycles: u64) -> CycleBound {
        CycleBound {
            best: self.best.saturating_add(cycles),
            worst: self.worst.saturating_add(cycles),
        }
    }
}

/// One bit-serial multiply over `operand_bits`-wide registers.
pub fn multiplier_cycles(operand_bits: u32) -> CycleBound {
    CycleBound {
        best: MUL_CYCLES_PER_BIT_BEST,
        worst: MUL_CYCLES_PER_BIT_WORST,
    }
    .scale(u64::from(operand_bits))
}

/// One full stage pass: `rounds` square-and-multiply rounds plus overhead.
///
/// Each round costs one multiply in the best case (square only) and two in
/// the worst (slice bit set), but the hardware squares and multiplies on
/// parallel units, so a round is one multiply deep either way.
pub fn stage_cycles(rounds: u32, operand_bits: u32) -> CycleBound {
    multiplier_cycles(operand_bits)
        .scale(u64::from(rounds))
        .offset(STAGE_START_CYCLES + STAGE_CONTROL_CYCLES + STAGE_END_CYCLES)
}

/// Whole-run drain estimate for a filled pipe: the first item pays the full
/// depth, every later item one more stage interval.
pub fn run_cycles(items: usize, stages: u32, rounds: u32, operand_bits: u32) -> CycleBound {
    if items == 0 {
        return CycleBound { best: 0, worst: 0 };
    }
    let intervals = (items as u64).saturating_add(u64::from(stages)).saturating_sub(1);
    stage_cycles(rounds, operand_bits).scale(intervals)
}

/// Cycle-to-wall-clock conversion at a configured clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleModel {
    pub clock_hz: u64,
}

impl Default for CycleModel {
    fn default() -> Self {
        Self { clock_hz: DEFAULT_CLOCK_HZ }
    }
}

/// Projected latencies for one pipeline shape and backlog size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Projection {
    pub clock_hz: u64,
    pub multiplier: CycleBound,
    pub stage: CycleBound,
    pub run: CycleBound,
    pub stage_ms_best: f64,
    pub stage_ms_worst: f64,
    pub run_ms_best: f64,
    pub run_ms_worst: f64,
}

impl CycleModel {
    pub fn new(clock_hz: u64) -> Self {
        Self { clock_hz }
    }

    /// Milliseconds a cycle count takes at this clock.
    pub fn millis(&self, cycles: u64) -> f64 {
        cycles as f64 / self.clock_hz as f64 * 1e3
    }

    /// Project one run: the register width sizes the multiplier, the slice
    /// width sets the rounds per stage.
    pub fn project(&self, schedule: &KeySchedule, items: usize) -> Projection {
        let multiplier = multiplier_cycles(schedule.width());
        let stage = stage_cycles(schedule.slice_width(), schedule.width());
        let run = run_cycles(items, schedule.stage_count(), schedule.slice_width(), schedule.width());
        Projection {
            clock_hz: self.clock_hz,
            multiplier,
            stage,
            run,
            stage_ms_best: self.millis(stage.best),
            stage_ms_worst: self.millis(stage.worst),
            run_ms_best: self.millis(run.best),
            run_ms_worst: self.millis(run.worst),
        }
    }
}
