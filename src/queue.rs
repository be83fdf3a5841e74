//! Outbound write queue
//!
//! An unbounded, ordered, thread-safe FIFO of byte buffers awaiting
//! transmission. The presentation thread enqueues through a cloneable
//! [`OutboundSender`]; the send pump is the only consumer and dequeues
//! through the owning [`OutboundQueue`].
//!
//! Built on a crossbeam channel, which gives the no-loss / no-duplication /
//! no-reorder discipline under concurrent producers for free.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Producer handle for the outbound queue
///
/// Cloneable and callable from any thread. Enqueueing never blocks.
#[derive(Clone)]
pub struct OutboundSender {
    tx: Sender<Vec<u8>>,
}

impl OutboundSender {
    /// Append a buffer to the tail of the queue
    ///
    /// Returns `false` if the consuming side has been dropped.
    pub fn enqueue(&self, bytes: Vec<u8>) -> bool {
        self.tx.send(bytes).is_ok()
    }
}

/// Outcome of a bounded dequeue attempt
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued {
    /// The head buffer was removed
    Buffer(Vec<u8>),
    /// The wait timed out with the queue still open
    TimedOut,
    /// Every producer handle has been dropped and the queue is drained
    Disconnected,
}

/// Consumer side of the outbound queue, held by the send pump
pub struct OutboundQueue {
    rx: Receiver<Vec<u8>>,
}

impl OutboundQueue {
    /// Create a queue and its producer handle
    pub fn new() -> (OutboundSender, OutboundQueue) {
        let (tx, rx) = unbounded();
        (OutboundSender { tx }, OutboundQueue { rx })
    }

    /// Remove and return the head, blocking until an entry is available
    ///
    /// Returns `None` once every producer handle has been dropped and the
    /// queue is drained.
    pub fn dequeue_blocking(&self) -> Option<Vec<u8>> {
        self.rx.recv().ok()
    }

    /// Remove and return the head, waiting up to `timeout`
    ///
    /// The bounded variant lets the send pump service its stop flag
    /// between buffers.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Dequeued {
        match self.rx.recv_timeout(timeout) {
            Ok(buf) => Dequeued::Buffer(buf),
            Err(RecvTimeoutError::Timeout) => Dequeued::TimedOut,
            Err(RecvTimeoutError::Disconnected) => Dequeued::Disconnected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fifo_order_single_producer() {
        let (tx, queue) = OutboundQueue::new();
        assert!(tx.enqueue(vec![1]));
        assert!(tx.enqueue(vec![2]));
        assert!(tx.enqueue(vec![3]));

        assert_eq!(queue.dequeue_blocking(), Some(vec![1]));
        assert_eq!(queue.dequeue_blocking(), Some(vec![2]));
        assert_eq!(queue.dequeue_blocking(), Some(vec![3]));
    }

    #[test]
    fn test_dequeue_timeout_empty() {
        let (_tx, queue) = OutboundQueue::new();
        assert_eq!(
            queue.dequeue_timeout(Duration::from_millis(10)),
            Dequeued::TimedOut
        );
    }

    #[test]
    fn test_dequeue_after_producers_dropped() {
        let (tx, queue) = OutboundQueue::new();
        tx.enqueue(vec![9]);
        drop(tx);

        // Buffered entries drain before disconnect is reported
        assert_eq!(queue.dequeue_blocking(), Some(vec![9]));
        assert_eq!(queue.dequeue_blocking(), None);
        assert_eq!(
            queue.dequeue_timeout(Duration::from_millis(1)),
            Dequeued::Disconnected
        );
    }

    #[test]
    fn test_concurrent_producers_conserve_entries() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 250;

        let (tx, queue) = OutboundQueue::new();

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let tx = tx.clone();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        assert!(tx.enqueue(vec![p as u8, i as u8]));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        drop(tx);

        // Total count conserved, per-producer order preserved, no duplicates
        let mut seen = vec![Vec::new(); PRODUCERS];
        let mut total = 0;
        while let Some(buf) = queue.dequeue_blocking() {
            seen[buf[0] as usize].push(buf[1]);
            total += 1;
        }
        assert_eq!(total, PRODUCERS * PER_PRODUCER);
        for per_producer in seen {
            let expected: Vec<u8> = (0..PER_PRODUCER as u8).collect();
            assert_eq!(per_producer, expected);
        }
    }
}
