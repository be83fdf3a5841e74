//! Loopback echo transport
//!
//! Has no real read side: every flushed buffer is mirrored straight back
//! into the receive stream. The mirroring itself is performed by the send
//! pump (via [`WriteHalf::mirrors_writes`]) so that the `Sent`/`Received`
//! pair for one buffer is published from a single thread, in that order.

use crate::error::Result;
use crate::transport::{ReadHalf, Transport, WriteHalf};
use std::time::Duration;

/// Loopback transport for exercising the engine without hardware
#[derive(Debug, Default)]
pub struct EchoTransport;

impl EchoTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for EchoTransport {
    fn identity(&self) -> String {
        "echo".to_string()
    }

    fn split(self: Box<Self>) -> Result<(Box<dyn ReadHalf>, Box<dyn WriteHalf>)> {
        Ok((Box::new(EchoReadHalf), Box::new(EchoWriteHalf)))
    }
}

struct EchoReadHalf;

impl ReadHalf for EchoReadHalf {
    fn read(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        // Nothing ever arrives on the read side; the mirror happens in the
        // send pump.
        std::thread::sleep(timeout);
        Ok(Vec::new())
    }
}

struct EchoWriteHalf;

impl WriteHalf for EchoWriteHalf {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(data.len())
    }

    fn mirrors_writes(&self) -> bool {
        true
    }
}
