//! Receive and send pump loops
//!
//! Each pump is a long-running loop moving bytes between the transport and
//! the event bus in one direction. Both poll the shared stop flag on a
//! bounded interval so [`crate::engine::SessionEngine::shutdown`] can join
//! them; a runtime I/O error is terminal for the affected pump and is
//! recorded in the shared fault slot after being logged.

use crate::bus::{EventPublisher, SessionEvent};
use crate::error::{PortScopeError, Result};
use crate::queue::{Dequeued, OutboundQueue};
use crate::transport::{ReadHalf, WriteHalf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Longest a pump blocks before re-checking the stop flag
pub(crate) const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// State shared between a pump thread and its owning engine
#[derive(Clone)]
pub(crate) struct PumpContext {
    pub running: Arc<AtomicBool>,
    pub publisher: EventPublisher,
    /// First terminal pump error, observable through the session handle
    pub fault: Arc<Mutex<Option<String>>>,
    pub identity: String,
}

impl PumpContext {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Log a terminal pump error and record it if it is the first
    fn record_fault(&self, pump: &str, err: &PortScopeError) {
        tracing::error!("{}: {} pump halted: {}", self.identity, pump, err);
        let mut slot = self.fault.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(err.to_string());
        }
    }
}

/// Receive pump: transport reads to `Received` events
pub(crate) fn run_receive_pump(
    mut read: Box<dyn ReadHalf>,
    read_timeout: Duration,
    ctx: PumpContext,
) {
    tracing::debug!("{}: receive pump started", ctx.identity);

    while ctx.is_running() {
        match read.read(read_timeout) {
            Ok(bytes) if bytes.is_empty() => {}
            Ok(bytes) => {
                if !ctx.publisher.publish(SessionEvent::received(bytes)) {
                    break;
                }
            }
            Err(e) => {
                ctx.record_fault("receive", &e);
                break;
            }
        }
    }

    tracing::debug!("{}: receive pump stopped", ctx.identity);
}

/// Send pump: outbound queue (or the transport's own stream) to the
/// transport and `Sent` events
pub(crate) fn run_send_pump(
    mut write: Box<dyn WriteHalf>,
    queue: OutboundQueue,
    ctx: PumpContext,
) {
    tracing::debug!("{}: send pump started", ctx.identity);

    if write.drives_outbound() {
        run_self_driven(write.as_mut(), &ctx);
    } else {
        run_queue_driven(write.as_mut(), &queue, &ctx);
    }

    tracing::debug!("{}: send pump stopped", ctx.identity);
}

/// Loop for transports that originate their own outbound stream
fn run_self_driven(write: &mut dyn WriteHalf, ctx: &PumpContext) {
    while ctx.is_running() {
        match write.generate_outbound(IDLE_POLL_INTERVAL) {
            Ok(Some(payload)) => {
                if !ctx.publisher.publish(SessionEvent::sent(payload)) {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                ctx.record_fault("send", &e);
                break;
            }
        }
    }
}

/// Loop for caller-driven transports consuming the outbound queue
fn run_queue_driven(write: &mut dyn WriteHalf, queue: &OutboundQueue, ctx: &PumpContext) {
    while ctx.is_running() {
        match queue.dequeue_timeout(IDLE_POLL_INTERVAL) {
            Dequeued::Buffer(buf) => {
                if let Err(e) = flush(write, &buf) {
                    ctx.record_fault("send", &e);
                    break;
                }
                // Exactly one Sent per send() call, carrying the full
                // logical buffer regardless of how many underlying writes
                // it took.
                let mirrored = write.mirrors_writes().then(|| buf.clone());
                if !ctx.publisher.publish(SessionEvent::sent(buf)) {
                    break;
                }
                if let Some(bytes) = mirrored {
                    if !ctx.publisher.publish(SessionEvent::received(bytes)) {
                        break;
                    }
                }
            }
            Dequeued::TimedOut => {}
            Dequeued::Disconnected => break,
        }
    }
}

/// Write the whole buffer, looping over short writes
fn flush(write: &mut dyn WriteHalf, buf: &[u8]) -> Result<()> {
    let mut offset = 0;
    while offset < buf.len() {
        let n = write.write(&buf[offset..])?;
        if n == 0 {
            // Transport accepted nothing; back off briefly and retry.
            std::thread::sleep(Duration::from_millis(1));
            continue;
        }
        offset += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Direction, EventBus};
    use crate::transport::{MockReadHalf, MockWriteHalf};
    use std::thread;

    fn test_context(publisher: EventPublisher) -> PumpContext {
        PumpContext {
            running: Arc::new(AtomicBool::new(true)),
            publisher,
            fault: Arc::new(Mutex::new(None)),
            identity: "test".to_string(),
        }
    }

    #[test]
    fn test_flush_loops_over_short_writes() {
        let mut write = MockWriteHalf::new();
        let mut seq = mockall::Sequence::new();
        write
            .expect_write()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|data| data == b"hello")
            .returning(|_| Ok(3));
        write
            .expect_write()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|data| data == b"lo")
            .returning(|_| Ok(2));

        flush(&mut write, b"hello").unwrap();
    }

    #[test]
    fn test_queue_driven_emits_one_sent_per_buffer() {
        let mut write = MockWriteHalf::new();
        write.expect_mirrors_writes().return_const(false);
        write.expect_drives_outbound().return_const(false);
        // Short writes: the logical buffer still yields a single event
        write.expect_write().returning(|data| Ok(data.len().min(2)));

        let (publisher, mut bus) = EventBus::new();
        let (tx, queue) = crate::queue::OutboundQueue::new();
        let ctx = test_context(publisher);

        tx.enqueue(b"abcde".to_vec());
        drop(tx); // pump exits once the queue disconnects after draining

        run_send_pump(Box::new(write), queue, ctx);

        let events = bus.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, Direction::Sent);
        assert_eq!(events[0].bytes, b"abcde");
    }

    #[test]
    fn test_queue_driven_mirrors_for_echo_semantics() {
        let mut write = MockWriteHalf::new();
        write.expect_mirrors_writes().return_const(true);
        write.expect_drives_outbound().return_const(false);
        write.expect_write().returning(|data| Ok(data.len()));

        let (publisher, mut bus) = EventBus::new();
        let (tx, queue) = crate::queue::OutboundQueue::new();
        let ctx = test_context(publisher);

        tx.enqueue(vec![1, 2, 3]);
        drop(tx);

        run_send_pump(Box::new(write), queue, ctx);

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].direction, Direction::Sent);
        assert_eq!(events[1].direction, Direction::Received);
        assert_eq!(events[0].bytes, vec![1, 2, 3]);
        assert_eq!(events[1].bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_receive_pump_records_fault_and_halts() {
        let mut read = MockReadHalf::new();
        read.expect_read()
            .times(1)
            .returning(|_| Err(PortScopeError::TransportIo("device gone".to_string())));

        let (publisher, _bus) = EventBus::new();
        let ctx = test_context(publisher);
        let fault = ctx.fault.clone();

        run_receive_pump(Box::new(read), Duration::from_millis(10), ctx);

        let recorded = fault.lock().unwrap().clone();
        assert!(recorded.unwrap().contains("device gone"));
    }

    #[test]
    fn test_receive_pump_skips_timeouts_and_stops_on_flag() {
        let mut read = MockReadHalf::new();
        read.expect_read().returning(|_| Ok(Vec::new()));

        let (publisher, _bus) = EventBus::new();
        let ctx = test_context(publisher);
        let running = ctx.running.clone();
        let fault = ctx.fault.clone();

        let handle = thread::spawn(move || {
            run_receive_pump(Box::new(read), Duration::from_millis(5), ctx)
        });
        thread::sleep(Duration::from_millis(30));
        running.store(false, Ordering::SeqCst);
        handle.join().unwrap();

        assert!(fault.lock().unwrap().is_none());
    }

    #[test]
    fn test_send_pump_write_error_is_terminal() {
        let mut write = MockWriteHalf::new();
        write.expect_mirrors_writes().return_const(false);
        write.expect_drives_outbound().return_const(false);
        write
            .expect_write()
            .returning(|_| Err(PortScopeError::TransportIo("broken pipe".to_string())));

        let (publisher, mut bus) = EventBus::new();
        let (tx, queue) = crate::queue::OutboundQueue::new();
        let ctx = test_context(publisher);
        let fault = ctx.fault.clone();

        tx.enqueue(vec![0xff]);
        drop(tx);

        run_send_pump(Box::new(write), queue, ctx);

        assert!(fault.lock().unwrap().clone().unwrap().contains("broken pipe"));
        // No Sent event for a buffer that never flushed
        assert!(bus.drain().is_empty());
    }
}
