//! Stage unit: one exponent slice, one worker thread.

use std::time::Instant;

use crossbeam::channel::Sender;
use tracing::{debug, trace};

use crate::arith::{bit_len, mul_mod};
use crate::pipeline::Transit;
use crate::pipeline::boundary::{ConsumerHalf, Packet, ProducerHalf};
use crate::pipeline::trace::{TraceEvent, TracePoint};
use crate::schedule::ConfigError;

/// One pipeline stage: consumes a transit from its upstream boundary,
/// advances it through this stage's exponent slice, forwards it downstream.
#[derive(Debug, Clone)]
pub struct StageUnit {
    index: u32,
    slice: u64,
    slice_width: u32,
    modulus: u64,
}

impl StageUnit {
    /// Build stage `index` (1-based) around one exponent slice.
    ///
    /// A slice wider than its bit budget means the slicer and the stage
    /// disagree about the pipeline shape; that is rejected here, before the
    /// worker spawns.
    pub fn new(index: u32, slice: u64, slice_width: u32, modulus: u64) -> Result<Self, ConfigError> {
        let bits = bit_len(slice);
        if bits > slice_width {
            return Err(ConfigError::SliceOverBudget { stage: index, bits, budget: slice_width });
        }
        Ok(Self { index, slice, slice_width, modulus })
    }

    /// 1-based position in the pipe.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Square-and-multiply across this stage's slice, bottom bit first.
    ///
    /// Every round squares the base, including rounds past the slice's top
    /// set bit: the next stage relies on the base having advanced by exactly
    /// `slice_width` squarings.
    pub fn apply(&self, acc: u64, base: u64) -> (u64, u64) {
        let mut acc = acc;
        let mut base = base;
        for bit in 0..self.slice_width {
            if (self.slice >> bit) & 1 == 1 {
                acc = mul_mod(acc, base, self.modulus);
            }
            base = mul_mod(base, base, self.modulus);
        }
        (acc, base)
    }

    /// Worker loop: runs until the drain sentinel arrives or a neighbour
    /// goes away.
    pub(crate) fn run(
        self,
        upstream: ConsumerHalf,
        downstream: ProducerHalf,
        trace_tx: Sender<TraceEvent>,
        started: Instant,
    ) {
        loop {
            match upstream.consume() {
                Ok(Packet::Item(transit)) => {
                    // Observe the inbound values before touching them, the
                    // way the hardware monitor samples its input registers.
                    let _ = trace_tx.send(TraceEvent {
                        point: TracePoint::Stage(self.index),
                        tag: transit.tag,
                        acc: transit.acc,
                        base: transit.base,
                        elapsed: started.elapsed(),
                    });
                    let (acc, base) = self.apply(transit.acc, transit.base);
                    trace!(stage = self.index, tag = transit.tag, "transit advanced");
                    let out = Transit { acc, base, tag: transit.tag };
                    if downstream.produce(Packet::Item(out)).is_err() {
                        break;
                    }
                }
                Ok(Packet::Drain) => {
                    debug!(stage = self.index, "drain sentinel forwarded");
                    let _ = downstream.produce(Packet::Drain);
                    break;
                }
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::arith::reference_pow;

    use super::*;

    #[test]
    fn apply_walks_the_slice_bottom_bit_first() {
        // slice 0b101 over 4 rounds: acc picks up m^1 and m^4, base ends at
        // m^16.
        let n = 25_553;
        let m = 1_234;
        let stage = StageUnit::new(1, 0b101, 4, n).unwrap();
        let (acc, base) = stage.apply(1, m);
        assert_eq!(acc, reference_pow(m, 5, n));
        assert_eq!(base, reference_pow(m, 16, n));
    }

    #[test]
    fn zero_slice_still_squares_the_base() {
        let n = 25_553;
        let m = 999;
        let stage = StageUnit::new(2, 0, 8, n).unwrap();
        let (acc, base) = stage.apply(1, m);
        assert_eq!(acc, 1);
        assert_eq!(base, reference_pow(m, 1 << 8, n));
    }

    #[test]
    fn chained_stages_compose_to_the_full_exponent() {
        // 0xa then 0xf then 0x2 then 0x2, four bits each: 0x22fa = 8954.
        let n = 25_553;
        let m = 7_201;
        let slices = [0xa, 0xf, 0x2, 0x2];
        let mut acc = 1;
        let mut base = m;
        for (i, slice) in slices.into_iter().enumerate() {
            let stage = StageUnit::new(i as u32 + 1, slice, 4, n).unwrap();
            (acc, base) = stage.apply(acc, base);
        }
        assert_eq!(acc, reference_pow(m, 8954, n));
    }

    #[test]
    fn oversized_slice_is_rejected_at_construction() {
        let err = StageUnit::new(3, 0b10000, 4, 25_553).unwrap_err();
        assert_eq!(err, ConfigError::SliceOverBudget { stage: 3, bits: 5, budget: 4 });
    }

    #[test]
    fn full_width_slice_is_accepted() {
        assert!(StageUnit::new(1, u64::MAX, 64, 25_553).is_ok());
    }
}
