//! Exit adapter: records finished transits and detects the drain.

use std::collections::BTreeMap;
use std::time::Instant;

use crossbeam::channel::Sender;
use tracing::debug;

use crate::pipeline::boundary::{ConsumerHalf, Packet};
use crate::pipeline::trace::{TraceEvent, TracePoint};

/// Everything the controller needs to close a run out: the full result map
/// keyed by tag, and how many items actually made it through.
#[derive(Debug, Default)]
pub(crate) struct DrainSummary {
    pub(crate) results: BTreeMap<u64, u64>,
    pub(crate) items_seen: usize,
}

pub(crate) struct ExitAdapter {
    /// Tag of the final item the controller will admit, if any. In-order
    /// delivery makes its arrival the drain condition.
    pub(crate) last_tag: Option<u64>,
}

impl ExitAdapter {
    /// Worker loop: record egress values until the last tag (or the drain
    /// sentinel, for an empty backlog) arrives, then signal exactly once.
    pub(crate) fn run(
        self,
        upstream: ConsumerHalf,
        trace_tx: Sender<TraceEvent>,
        drained: Sender<DrainSummary>,
        started: Instant,
    ) {
        let mut results = BTreeMap::new();
        let mut drained = Some(drained);

        loop {
            match upstream.consume() {
                Ok(Packet::Item(transit)) => {
                    let _ = trace_tx.send(TraceEvent {
                        point: TracePoint::Egress,
                        tag: transit.tag,
                        acc: transit.acc,
                        base: transit.base,
                        elapsed: started.elapsed(),
                    });
                    results.insert(transit.tag, transit.acc);
                    if self.last_tag == Some(transit.tag) {
                        // In-order delivery puts the last admitted item
                        // last: the result map is complete here.
                        signal(&mut drained, &mut results);
                    }
                }
                Ok(Packet::Drain) => {
                    // Reached without a last tag only on an empty backlog;
                    // everyone else already signalled above.
                    signal(&mut drained, &mut results);
                    break;
                }
                Err(_) => break,
            }
        }
    }
}

fn signal(drained: &mut Option<Sender<DrainSummary>>, results: &mut BTreeMap<u64, u64>) {
    if let Some(tx) = drained.take() {
        let results = std::mem::take(results);
        let items_seen = results.len();
        debug!(items = items_seen, "pipeline drained");
        let _ = tx.send(DrainSummary { results, items_seen });
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use crossbeam::channel::{bounded, unbounded};

    use crate::pipeline::Transit;
    use crate::pipeline::boundary::boundary;

    use super::*;

    #[test]
    fn signals_on_the_last_tag_and_reports_every_result() {
        let (producer, consumer) = boundary();
        let (trace_tx, trace_rx) = unbounded();
        let (drained_tx, drained_rx) = bounded(1);

        let exit = ExitAdapter { last_tag: Some(2) };
        let worker = thread::spawn(move || exit.run(consumer, trace_tx, drained_tx, Instant::now()));

        for tag in 0..3u64 {
            producer
                .produce(Packet::Item(Transit { acc: tag * 10, base: 1, tag }))
                .unwrap();
        }

        let summary = drained_rx.recv().unwrap();
        assert_eq!(summary.items_seen, 3);
        assert_eq!(
            summary.results.into_iter().collect::<Vec<_>>(),
            vec![(0, 0), (1, 10), (2, 20)]
        );

        // The worker stays alive for the sentinel, then exits.
        producer.produce(Packet::Drain).unwrap();
        worker.join().unwrap();

        let egress_tags: Vec<u64> = trace_rx.iter().map(|e| e.tag).collect();
        assert_eq!(egress_tags, vec![0, 1, 2]);
    }

    #[test]
    fn empty_backlog_signals_on_the_drain_sentinel() {
        let (producer, consumer) = boundary();
        let (trace_tx, _trace_rx) = unbounded();
        let (drained_tx, drained_rx) = bounded(1);

        let exit = ExitAdapter { last_tag: None };
        let worker = thread::spawn(move || exit.run(consumer, trace_tx, drained_tx, Instant::now()));

        producer.produce(Packet::Drain).unwrap();
        let summary = drained_rx.recv().unwrap();
        assert_eq!(summary.items_seen, 0);
        assert!(summary.results.is_empty());
        worker.join().unwrap();
    }
}
