//! Synthetic generator transport
//!
//! Produces two independent unsolicited streams on a single configurable
//! interval: the read half yields a fresh 2-byte pseudo-random payload per
//! tick, and the write half drives its own outbound stream emitting a
//! fixed literal payload per tick. There are no caller-driven writes; the
//! generator exists to exercise renderers without hardware.

use crate::error::Result;
use crate::transport::{ReadHalf, Transport, WriteHalf};
use std::cell::Cell;
use std::time::{Duration, Instant};

/// Number of random bytes produced per receive tick
const RANDOM_PAYLOAD_LEN: usize = 2;

/// Fixed payload emitted on the outbound stream each tick
pub const GENERATOR_SENT_PAYLOAD: &[u8] = b"ABC\n\x12";

/// Simple xorshift pseudo-random byte source (no external dependency)
fn random_bytes(len: usize) -> Vec<u8> {
    thread_local! {
        static SEED: Cell<u64> = const { Cell::new(0x9e37_79b9_7f4a_7c15) };
    }
    SEED.with(|seed| {
        (0..len)
            .map(|_| {
                let mut s = seed.get();
                s ^= s << 13;
                s ^= s >> 7;
                s ^= s << 17;
                seed.set(s);
                (s >> 32) as u8
            })
            .collect()
    })
}

/// Fixed-cadence tick clock shared by both generator streams
///
/// `wait(timeout)` sleeps toward the next tick but never longer than
/// `timeout`, so the owning pump can service its stop flag between ticks.
struct Ticker {
    interval: Duration,
    next_tick: Instant,
}

impl Ticker {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_tick: Instant::now() + interval,
        }
    }

    /// Returns true if a tick fired within `timeout`
    fn wait(&mut self, timeout: Duration) -> bool {
        let now = Instant::now();
        let remaining = self.next_tick.saturating_duration_since(now);

        if remaining > timeout {
            std::thread::sleep(timeout);
            return false;
        }

        std::thread::sleep(remaining);
        self.next_tick += self.interval;
        true
    }
}

/// Synthetic two-stream byte source
pub struct GeneratorTransport {
    interval: Duration,
}

impl GeneratorTransport {
    /// Create a generator ticking at `interval` on both streams
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for GeneratorTransport {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_GENERATOR_INTERVAL)
    }
}

impl Transport for GeneratorTransport {
    fn identity(&self) -> String {
        format!("generator ({}ms)", self.interval.as_millis())
    }

    fn split(self: Box<Self>) -> Result<(Box<dyn ReadHalf>, Box<dyn WriteHalf>)> {
        Ok((
            Box::new(GeneratorReadHalf {
                ticker: Ticker::new(self.interval),
            }),
            Box::new(GeneratorWriteHalf {
                ticker: Ticker::new(self.interval),
            }),
        ))
    }
}

struct GeneratorReadHalf {
    ticker: Ticker,
}

impl ReadHalf for GeneratorReadHalf {
    fn read(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        if self.ticker.wait(timeout) {
            Ok(random_bytes(RANDOM_PAYLOAD_LEN))
        } else {
            Ok(Vec::new())
        }
    }
}

struct GeneratorWriteHalf {
    ticker: Ticker,
}

impl WriteHalf for GeneratorWriteHalf {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        // No caller-driven writes; accept and discard.
        Ok(data.len())
    }

    fn drives_outbound(&self) -> bool {
        true
    }

    fn generate_outbound(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        if self.ticker.wait(timeout) {
            Ok(Some(GENERATOR_SENT_PAYLOAD.to_vec()))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_names_interval() {
        let transport = GeneratorTransport::new(Duration::from_millis(100));
        assert_eq!(transport.identity(), "generator (100ms)");
    }

    #[test]
    fn test_read_respects_short_timeout() {
        let transport = Box::new(GeneratorTransport::new(Duration::from_secs(60)));
        let (mut read, _write) = transport.split().unwrap();
        assert!(read.read(Duration::from_millis(5)).unwrap().is_empty());
    }

    #[test]
    fn test_read_yields_two_random_bytes_per_tick() {
        let transport = Box::new(GeneratorTransport::new(Duration::from_millis(10)));
        let (mut read, _write) = transport.split().unwrap();

        let payload = read.read(Duration::from_millis(100)).unwrap();
        assert_eq!(payload.len(), RANDOM_PAYLOAD_LEN);
    }

    #[test]
    fn test_outbound_stream_emits_fixed_payload() {
        let transport = Box::new(GeneratorTransport::new(Duration::from_millis(10)));
        let (_read, mut write) = transport.split().unwrap();

        assert!(write.drives_outbound());
        let payload = write
            .generate_outbound(Duration::from_millis(100))
            .unwrap()
            .unwrap();
        assert_eq!(payload, b"ABC\n\x12");
    }

    #[test]
    fn test_random_bytes_vary() {
        let a = random_bytes(16);
        let b = random_bytes(16);
        assert_ne!(a, b);
    }
}
