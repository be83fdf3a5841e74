//! Background I/O engine
//!
//! The engine owns one transport and one outbound queue, and runs the two
//! pump threads that move bytes between them and the event bus. It follows
//! a two-phase lifecycle: [`SessionEngine::new`] is pure (no threads, no
//! side effects), [`SessionEngine::start`] splits the transport and spawns
//! the pumps.
//!
//! # Architecture
//!
//! The presentation side talks to the engine through a [`SessionHandle`]:
//!
//! - [`SessionHandle::send`] - enqueue an outbound buffer, non-blocking
//! - [`SessionHandle::subscribe`] - register a renderer on the event bus
//! - [`SessionHandle::dispatch_pending`] - deliver events on the calling
//!   thread
//! - [`SessionHandle::fault`] - observe a terminal pump error
//!
//! # Example
//!
//! ```ignore
//! use portscope::engine::SessionEngine;
//! use portscope::transport::EchoTransport;
//! use std::time::Duration;
//!
//! let (mut engine, mut handle) =
//!     SessionEngine::new(Box::new(EchoTransport::new()), Duration::from_millis(100));
//! engine.start()?;
//!
//! handle.send(b"hi\r\n".to_vec())?;
//! // ... presentation loop ...
//! for event in handle.drain() {
//!     println!("{} {:?}", event.direction, event.bytes);
//! }
//!
//! engine.shutdown();
//! ```

pub mod pumps;

use crate::bus::{EventBus, EventPublisher, EventSubscriber, SessionEvent};
use crate::error::{PortScopeError, Result};
use crate::queue::{OutboundQueue, OutboundSender};
use crate::transport::Transport;
use pumps::PumpContext;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Lifecycle state of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed, pumps not yet spawned
    Idle,
    /// Both pumps active
    Running,
    /// Terminal; reached at session teardown
    Stopped,
}

/// Presentation-side handle for a session
///
/// Owns the event bus and an enqueue handle; lives on the presentation
/// thread while the engine's pumps run in the background.
pub struct SessionHandle {
    bus: EventBus,
    outbound: OutboundSender,
    identity: String,
    fault: Arc<Mutex<Option<String>>>,
}

impl SessionHandle {
    /// Enqueue a byte buffer for transmission
    ///
    /// Accepts any byte sequence, including empty, and returns immediately;
    /// the send pump flushes it and publishes the matching `Sent` event.
    pub fn send(&self, bytes: Vec<u8>) -> Result<()> {
        if self.outbound.enqueue(bytes) {
            Ok(())
        } else {
            Err(PortScopeError::Channel(
                "outbound queue is closed".to_string(),
            ))
        }
    }

    /// Register a renderer on the event bus
    pub fn subscribe(&mut self, subscriber: Box<dyn EventSubscriber>) {
        self.bus.subscribe(subscriber);
    }

    /// Deliver all pending events to subscribers on the calling thread
    pub fn dispatch_pending(&mut self) -> usize {
        self.bus.dispatch_pending()
    }

    /// Drain pending events without dispatching to subscribers
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        self.bus.drain()
    }

    /// Session label of the underlying transport
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// First terminal pump error, if any pump has died
    ///
    /// Bytes stop flowing once a pump is dead; the owning process decides
    /// whether to terminate the session.
    pub fn fault(&self) -> Option<String> {
        self.fault.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// The background I/O engine owning a transport and its two pumps
pub struct SessionEngine {
    identity: String,
    state: EngineState,
    /// Present until `start()` hands it to the pumps
    transport: Option<Box<dyn Transport>>,
    queue: Option<OutboundQueue>,
    outbound: OutboundSender,
    publisher: EventPublisher,
    read_timeout: Duration,
    running: Arc<AtomicBool>,
    fault: Arc<Mutex<Option<String>>>,
    pump_handles: Vec<JoinHandle<()>>,
}

impl SessionEngine {
    /// Create an engine and its presentation handle
    ///
    /// Pure construction: no threads are spawned and the transport is not
    /// touched until [`SessionEngine::start`]. `read_timeout` bounds the
    /// receive pump's blocking reads.
    pub fn new(
        transport: Box<dyn Transport>,
        read_timeout: Duration,
    ) -> (SessionEngine, SessionHandle) {
        let identity = transport.identity();
        let (outbound, queue) = OutboundQueue::new();
        let (publisher, bus) = EventBus::new();
        let fault = Arc::new(Mutex::new(None));

        let engine = SessionEngine {
            identity: identity.clone(),
            state: EngineState::Idle,
            transport: Some(transport),
            queue: Some(queue),
            outbound: outbound.clone(),
            publisher,
            read_timeout,
            running: Arc::new(AtomicBool::new(false)),
            fault: fault.clone(),
            pump_handles: Vec::new(),
        };

        let handle = SessionHandle {
            bus,
            outbound,
            identity,
            fault,
        };

        (engine, handle)
    }

    /// Session label of the underlying transport
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Enqueue a byte buffer for transmission
    ///
    /// Same contract as [`SessionHandle::send`]; buffers enqueued before
    /// `start()` are flushed once the send pump is up.
    pub fn send(&self, bytes: Vec<u8>) -> Result<()> {
        if self.outbound.enqueue(bytes) {
            Ok(())
        } else {
            Err(PortScopeError::Channel(
                "outbound queue is closed".to_string(),
            ))
        }
    }

    /// Transition `Idle` to `Running`: split the transport and spawn both
    /// pump threads
    pub fn start(&mut self) -> Result<()> {
        if self.state != EngineState::Idle {
            return Err(PortScopeError::Config(format!(
                "start() called on a {:?} engine",
                self.state
            )));
        }

        let transport = self.transport.take().ok_or_else(|| {
            PortScopeError::Config("engine has no transport".to_string())
        })?;
        let queue = self.queue.take().ok_or_else(|| {
            PortScopeError::Config("engine has no outbound queue".to_string())
        })?;

        let (read_half, write_half) = transport.split()?;

        self.running.store(true, Ordering::SeqCst);
        let ctx = PumpContext {
            running: self.running.clone(),
            publisher: self.publisher.clone(),
            fault: self.fault.clone(),
            identity: self.identity.clone(),
        };

        let read_timeout = self.read_timeout;
        let rx_ctx = ctx.clone();
        let rx_handle = std::thread::Builder::new()
            .name("portscope-rx".to_string())
            .spawn(move || pumps::run_receive_pump(read_half, read_timeout, rx_ctx))
            .map_err(|e| PortScopeError::Channel(format!("failed to spawn receive pump: {}", e)))?;

        let tx_handle = std::thread::Builder::new()
            .name("portscope-tx".to_string())
            .spawn(move || pumps::run_send_pump(write_half, queue, ctx))
            .map_err(|e| PortScopeError::Channel(format!("failed to spawn send pump: {}", e)))?;

        self.pump_handles.push(rx_handle);
        self.pump_handles.push(tx_handle);
        self.state = EngineState::Running;
        tracing::info!("{}: engine started", self.identity);
        Ok(())
    }

    /// Signal both pumps to stop and join them
    ///
    /// Idempotent; safe to call from any state.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        for handle in self.pump_handles.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("{}: a pump thread panicked", self.identity);
            }
        }
        if self.state == EngineState::Running {
            tracing::info!("{}: engine stopped", self.identity);
        }
        self.state = EngineState::Stopped;
    }
}

impl Drop for SessionEngine {
    fn drop(&mut self) {
        // Best-effort stop signal; joining is shutdown()'s job.
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::EchoTransport;

    fn new_echo_engine() -> (SessionEngine, SessionHandle) {
        SessionEngine::new(Box::new(EchoTransport::new()), Duration::from_millis(10))
    }

    #[test]
    fn test_construction_is_idle_and_pure() {
        let (engine, handle) = new_echo_engine();
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.identity(), "echo");
        assert_eq!(handle.identity(), "echo");
        assert!(handle.fault().is_none());
    }

    #[test]
    fn test_start_twice_fails() {
        let (mut engine, _handle) = new_echo_engine();
        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(PortScopeError::Config(_))));
        engine.shutdown();
    }

    #[test]
    fn test_start_after_shutdown_fails() {
        let (mut engine, _handle) = new_echo_engine();
        engine.start().unwrap();
        engine.shutdown();
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(engine.start().is_err());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (mut engine, _handle) = new_echo_engine();
        engine.shutdown();
        engine.shutdown();
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[test]
    fn test_send_before_start_enqueues() {
        let (engine, handle) = new_echo_engine();
        // The queue exists from construction; sends are flushed once the
        // pumps are up.
        assert!(engine.send(vec![1, 2]).is_ok());
        assert!(handle.send(vec![3]).is_ok());
    }
}
