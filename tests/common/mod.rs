//! Shared fixtures for integration tests

use portscope::error::Result;
use portscope::transport::{ReadHalf, Transport, WriteHalf};
use portscope::{SessionEvent, SessionHandle};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Serial-like fake that echoes every write back after a fixed latency
pub struct LatencyEchoTransport {
    latency: Duration,
    pending: Arc<Mutex<VecDeque<(Instant, Vec<u8>)>>>,
}

impl LatencyEchoTransport {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            pending: Arc::new(Mutex::new(VecDeque::new())),
        }
    }
}

impl Transport for LatencyEchoTransport {
    fn identity(&self) -> String {
        format!("latency-echo ({}ms)", self.latency.as_millis())
    }

    fn split(self: Box<Self>) -> Result<(Box<dyn ReadHalf>, Box<dyn WriteHalf>)> {
        Ok((
            Box::new(LatencyReadHalf {
                pending: self.pending.clone(),
            }),
            Box::new(LatencyWriteHalf {
                latency: self.latency,
                pending: self.pending,
            }),
        ))
    }
}

struct LatencyReadHalf {
    pending: Arc<Mutex<VecDeque<(Instant, Vec<u8>)>>>,
}

impl ReadHalf for LatencyReadHalf {
    fn read(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut pending = self.pending.lock().unwrap();
                if let Some((due, _)) = pending.front() {
                    if *due <= Instant::now() {
                        return Ok(pending.pop_front().unwrap().1);
                    }
                }
            }
            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

struct LatencyWriteHalf {
    latency: Duration,
    pending: Arc<Mutex<VecDeque<(Instant, Vec<u8>)>>>,
}

impl WriteHalf for LatencyWriteHalf {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.pending
            .lock()
            .unwrap()
            .push_back((Instant::now() + self.latency, data.to_vec()));
        Ok(data.len())
    }
}

/// Drain events off the handle until `enough` is satisfied or the deadline
/// passes, whichever comes first
pub fn collect_events<F>(
    handle: &mut SessionHandle,
    deadline: Duration,
    mut enough: F,
) -> Vec<SessionEvent>
where
    F: FnMut(&[SessionEvent]) -> bool,
{
    let until = Instant::now() + deadline;
    let mut events = Vec::new();
    loop {
        events.extend(handle.drain());
        if enough(&events) || Instant::now() >= until {
            return events;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}
