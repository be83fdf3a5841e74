//! # PortScope: Interactive Serial-Terminal Explorer
//!
//! Opens a serial device (or a simulated one), exchanges byte streams with
//! it, and publishes every sent and received chunk as a timestamped event
//! stream that renderers display in switchable formats (escaped ASCII and
//! hex). The core is the background I/O engine, which pumps both
//! directions concurrently without ever blocking the interactive surface.
//!
//! ## Architecture
//!
//! - **Transport**: abstraction over the duplex byte channel, with real
//!   serial, loopback echo, and synthetic generator implementations
//! - **Engine**: owns one transport and the outbound queue, runs the
//!   receive and send pump threads
//! - **Event Bus**: marshals `Sent`/`Received` events from the pump
//!   threads onto the presentation thread
//! - **Byte Codec**: escape-aware text-to-bytes conversion for manual
//!   entry, saved sequences, and display
//! - **Communication**: crossbeam channels for thread-safe data transfer
//!
//! ## Example
//!
//! ```ignore
//! use portscope::engine::SessionEngine;
//! use portscope::transport::EchoTransport;
//! use portscope::codec;
//! use std::time::Duration;
//!
//! let (mut engine, mut handle) =
//!     SessionEngine::new(Box::new(EchoTransport::new()), Duration::from_millis(100));
//! engine.start()?;
//!
//! handle.send(codec::parse("hello\\r\\n")?)?;
//!
//! // Presentation loop: deliver events on this thread
//! for event in handle.drain() {
//!     println!("[{}] {}", event.direction, codec::render(&event.bytes));
//! }
//!
//! engine.shutdown();
//! ```

pub mod bus;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod probe;
pub mod queue;
pub mod sequences;
pub mod transport;

// Re-export commonly used types
pub use bus::{Direction, EventBus, EventSubscriber, SessionEvent};
pub use config::{SerialSettings, SessionConfig};
pub use engine::{EngineState, SessionEngine, SessionHandle};
pub use error::{PortScopeError, Result};
pub use sequences::{SequenceEntry, SequenceRegistry};
pub use transport::{EchoTransport, GeneratorTransport, SerialTransport, Transport};
