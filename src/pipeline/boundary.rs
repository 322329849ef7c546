//! Single-slot handshake boundary between adjacent pipeline workers.
//!
//! Each boundary is the software form of a ready/valid interface: a
//! capacity-1 data channel carries the in-flight packet downstream, and a
//! capacity-1 credit channel carries the one free credit back upstream. A
//! producer may fill the slot only after taking the credit; a consumer
//! returns the credit only after taking the packet. At most one packet sits
//! between two workers at any instant.
//!
//! Both channels are bounded at 1, so an overwrite or a doubled credit is
//! unrepresentable as a steady state. The `try_send` calls below turn any
//! such attempt into an immediate panic rather than a silent block, because
//! that state is a protocol defect, not a recoverable condition.

use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};

use crate::pipeline::Transit;

/// What flows across a boundary: a live transit, or the drain sentinel that
/// chases the last item through the pipe so every worker observes its own
/// shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet {
    Item(Transit),
    Drain,
}

/// The one free credit that cycles across a boundary.
struct Credit;

/// The peer worker on the other side of a boundary has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

/// Upstream half: fills the slot.
pub struct ProducerHalf {
    slot: Sender<Packet>,
    credits: Receiver<Credit>,
}

/// Downstream half: empties the slot.
pub struct ConsumerHalf {
    slot: Receiver<Packet>,
    credits: Sender<Credit>,
}

/// Build one boundary and hand back its two directed halves.
pub fn boundary() -> (ProducerHalf, ConsumerHalf) {
    let (slot_tx, slot_rx) = bounded(1);
    let (credit_tx, credit_rx) = bounded(1);
    // Seed the single credit; a fresh bounded(1) channel cannot be full.
    credit_tx
        .try_send(Credit)
        .expect("seed credit into empty channel");
    (
        ProducerHalf { slot: slot_tx, credits: credit_rx },
        ConsumerHalf { slot: slot_rx, credits: credit_tx },
    )
}

impl ProducerHalf {
    /// Blocking handshake write: take the free credit, then fill the slot.
    pub fn produce(&self, packet: Packet) -> Result<(), Disconnected> {
        self.credits.recv().map_err(|_| Disconnected)?;
        match self.slot.try_send(packet) {
            Ok(()) => Ok(()),
            // Holding the credit proves the slot is empty; a full slot here
            // means the credit discipline was broken.
            Err(TrySendError::Full(_)) => panic!("boundary slot full while holding the free credit"),
            Err(TrySendError::Disconnected(_)) => Err(Disconnected),
        }
    }

    /// Free credits currently parked on this boundary (0 or 1).
    pub fn free_credits(&self) -> usize {
        self.credits.len()
    }
}

impl ConsumerHalf {
    /// Blocking handshake read: take the packet, then return the credit.
    pub fn consume(&self) -> Result<Packet, Disconnected> {
        let packet = self.slot.recv().map_err(|_| Disconnected)?;
        match self.credits.try_send(Credit) {
            Ok(()) => Ok(packet),
            Err(TrySendError::Full(_)) => panic!("boundary credit returned twice for one packet"),
            // Producer already exited; the packet is still valid and the
            // credit has nowhere to go.
            Err(TrySendError::Disconnected(_)) => Ok(packet),
        }
    }

    /// Packets currently parked in the slot (0 or 1).
    pub fn occupancy(&self) -> usize {
        self.slot.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn item(tag: u64) -> Packet {
        Packet::Item(Transit { acc: 1, base: tag, tag })
    }

    #[test]
    fn handshake_round_trip_restores_the_credit() {
        let (producer, consumer) = boundary();
        assert_eq!(producer.free_credits(), 1);
        assert_eq!(consumer.occupancy(), 0);

        producer.produce(item(7)).unwrap();
        assert_eq!(producer.free_credits(), 0);
        assert_eq!(consumer.occupancy(), 1);

        assert_eq!(consumer.consume().unwrap(), item(7));
        assert_eq!(producer.free_credits(), 1);
        assert_eq!(consumer.occupancy(), 0);
    }

    #[test]
    fn producer_blocks_until_the_slot_is_freed() {
        let (producer, consumer) = boundary();
        producer.produce(item(1)).unwrap();

        let second_sent = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&second_sent);
        let handle = thread::spawn(move || {
            producer.produce(item(2)).unwrap();
            second_sent.store(true, Ordering::SeqCst);
        });

        // Without a consume the second produce must still be parked.
        thread::sleep(Duration::from_millis(50));
        assert!(!observed.load(Ordering::SeqCst));

        assert_eq!(consumer.consume().unwrap(), item(1));
        handle.join().unwrap();
        assert!(observed.load(Ordering::SeqCst));
        assert_eq!(consumer.consume().unwrap(), item(2));
    }

    #[test]
    fn stress_preserves_order_and_never_exceeds_one_in_flight() {
        let (producer, consumer) = boundary();
        let count = 10_000u64;

        let handle = thread::spawn(move || {
            for tag in 0..count {
                producer.produce(item(tag)).unwrap();
            }
            producer.produce(Packet::Drain).unwrap();
        });

        let mut expected = 0u64;
        loop {
            assert!(consumer.occupancy() <= 1);
            match consumer.consume().unwrap() {
                Packet::Item(transit) => {
                    assert_eq!(transit.tag, expected);
                    expected += 1;
                }
                Packet::Drain => break,
            }
        }
        assert_eq!(expected, count);
        handle.join().unwrap();
    }

    #[test]
    fn produce_reports_a_gone_consumer() {
        let (producer, consumer) = boundary();
        drop(consumer);
        // First call takes the seeded credit, then finds the slot closed;
        // the second finds the credit channel closed.
        assert_eq!(producer.produce(Packet::Drain), Err(Disconnected));
        assert_eq!(producer.produce(Packet::Drain), Err(Disconnected));
    }

    #[test]
    fn consume_reports_a_gone_producer_once_the_slot_empties() {
        let (producer, consumer) = boundary();
        producer.produce(item(3)).unwrap();
        drop(producer);
        // The parked packet is still delivered, then the disconnect shows.
        assert_eq!(consumer.consume().unwrap(), item(3));
        assert_eq!(consumer.consume(), Err(Disconnected));
    }
}
