//! Transport abstraction over duplex byte channels
//!
//! A [`Transport`] is a raw byte pipe with no framing: reads may return
//! fewer or more bytes than one logical message, and writes may be short.
//! Three implementations exist:
//!
//! - [`SerialTransport`] - a real serial port via the `serialport` crate
//! - [`EchoTransport`] - loopback; every write is mirrored back as a receive
//! - [`GeneratorTransport`] - synthetic two-stream byte source for
//!   exercising renderers without hardware
//!
//! A transport is owned exclusively by the engine and split into its read
//! half and write half at `start()`, so each half is touched by exactly one
//! pump thread and no cross-thread locking is needed on the transport
//! itself.

pub mod echo;
pub mod generator;
pub mod serial;

pub use echo::EchoTransport;
pub use generator::GeneratorTransport;
pub use serial::SerialTransport;

use crate::error::Result;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

/// A duplex byte channel ready to be handed to the engine
pub trait Transport: Send {
    /// Human-readable session label (device path or generator name),
    /// used for display, never for behavior
    fn identity(&self) -> String;

    /// Consume the transport, yielding its independently owned halves
    fn split(self: Box<Self>) -> Result<(Box<dyn ReadHalf>, Box<dyn WriteHalf>)>;
}

/// Receive side of a split transport, owned by the receive pump
#[cfg_attr(test, automock)]
pub trait ReadHalf: Send {
    /// Block up to `timeout` for incoming bytes
    ///
    /// An empty vec means the timeout elapsed, which is not an error.
    fn read(&mut self, timeout: Duration) -> Result<Vec<u8>>;
}

/// Transmit side of a split transport, owned by the send pump
#[cfg_attr(test, automock)]
pub trait WriteHalf: Send {
    /// Attempt to write `data`, returning the number of bytes consumed
    ///
    /// A single call may perform a short write; the caller loops until the
    /// whole buffer is flushed.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Whether every flushed buffer is mirrored back into the receive
    /// stream (loopback semantics)
    ///
    /// When true the send pump publishes the matching `Received` event
    /// itself, immediately after the `Sent`, so the pair is same-call
    /// ordered.
    fn mirrors_writes(&self) -> bool {
        false
    }

    /// Whether this transport originates its own outbound stream instead
    /// of consuming caller writes
    fn drives_outbound(&self) -> bool {
        false
    }

    /// Produce the next transport-originated outbound payload, blocking up
    /// to `timeout`
    ///
    /// Only meaningful when [`WriteHalf::drives_outbound`] is true; the
    /// default never produces anything.
    fn generate_outbound(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        std::thread::sleep(timeout);
        Ok(None)
    }
}
