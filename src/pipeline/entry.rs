//! Entry adapter: turns granted work items into in-flight transits.

use crossbeam::channel::{Sender, bounded};
use tracing::debug;

use crate::pipeline::Transit;
use crate::pipeline::boundary::{Packet, ProducerHalf};
use crate::pipeline::controller::{CaseRequest, Grant};
use crate::source::WorkItem;

/// Feeds the first boundary from the admission controller, one handshake at
/// a time.
pub(crate) struct EntryAdapter {
    pub(crate) modulus: u64,
}

impl EntryAdapter {
    /// Seed a transit: accumulator 1, base reduced into the modulus so the
    /// multiplier only ever sees reduced operands.
    fn admit(&self, item: WorkItem) -> Transit {
        Transit { acc: 1, base: item.value % self.modulus, tag: item.id }
    }

    /// Worker loop: request, wait for the grant, push downstream. On
    /// exhaustion it injects the drain sentinel and exits.
    pub(crate) fn run(self, requests: Sender<CaseRequest>, downstream: ProducerHalf) {
        loop {
            let (respond, grant) = bounded(1);
            if requests.send(CaseRequest { respond }).is_err() {
                break;
            }
            match grant.recv() {
                Ok(Grant::Case(item)) => {
                    let transit = self.admit(item);
                    debug!(tag = transit.tag, base = transit.base, "case admitted");
                    if downstream.produce(Packet::Item(transit)).is_err() {
                        break;
                    }
                }
                Ok(Grant::Exhausted) => {
                    debug!("backlog exhausted, injecting drain sentinel");
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
    use std::thread;

    use crossbeam::channel::unbounded;

    use crate::pipeline::boundary::boundary;

    use super::*;

    #[test]
    fn admission_reduces_the_base_and_keeps_the_tag() {
        let entry = EntryAdapter { modulus: 123 };
        let transit = entry.admit(WorkItem { id: 9, value: 300 });
        assert_eq!(transit, Transit { acc: 1, base: 300 % 123, tag: 9 });
    }

    #[test]
    fn run_pushes_grants_then_the_drain_sentinel() {
        let (request_tx, request_rx) = unbounded::<CaseRequest>();
        let (producer, consumer) = boundary();

        let entry = EntryAdapter { modulus: 123 };
        let worker = thread::spawn(move || entry.run(request_tx, producer));

        // Stand in for the controller: grant two cases, then exhaustion.
        let feeder = thread::spawn(move || {
            for item in [WorkItem { id: 0, value: 22 }, WorkItem { id: 1, value: 200 }] {
                let request = request_rx.recv().unwrap();
                request.respond.send(Grant::Case(item)).unwrap();
            }
            let request = request_rx.recv().unwrap();
            request.respond.send(Grant::Exhausted).unwrap();
        });

        assert_eq!(
            consumer.consume().unwrap(),
            Packet::Item(Transit { acc: 1, base: 22, tag: 0 })
        );
        assert_eq!(
            consumer.consume().unwrap(),
            Packet::Item(Transit { acc: 1, base: 77, tag: 1 })
        );
        assert_eq!(consumer.consume().unwrap(), Packet::Drain);

        worker.join().unwrap();
        feeder.join().unwrap();
    }
}
