//! Session event bus
//!
//! In-process publish/subscribe for engine events. The pump threads publish
//! through a cloneable [`EventPublisher`]; the presentation thread owns the
//! [`EventBus`] and drains pending events onto its registered subscribers by
//! calling [`EventBus::dispatch_pending`] from its own loop, so all
//! rendering mutations happen on one thread.
//!
//! Events published by the same pump are delivered in publication order.
//! No total order is guaranteed between the two pumps beyond the channel's
//! arrival interleaving, which reflects real-world occurrence.

use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Direction of a byte chunk relative to the local end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bytes written to the transport
    Sent,
    /// Bytes read from the transport
    Received,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Sent => write!(f, "TX"),
            Direction::Received => write!(f, "RX"),
        }
    }
}

/// A timestamped chunk of exchanged bytes
///
/// Carries the exact payload produced or consumed by the transport; no
/// copying losses and no implicit text decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    /// Whether the chunk was sent or received
    pub direction: Direction,
    /// The exact byte payload
    pub bytes: Vec<u8>,
    /// Wall-clock time the chunk was observed by its pump
    pub at: DateTime<Utc>,
}

impl SessionEvent {
    /// Create a sent event stamped with the current time
    pub fn sent(bytes: Vec<u8>) -> Self {
        Self {
            direction: Direction::Sent,
            bytes,
            at: Utc::now(),
        }
    }

    /// Create a received event stamped with the current time
    pub fn received(bytes: Vec<u8>) -> Self {
        Self {
            direction: Direction::Received,
            bytes,
            at: Utc::now(),
        }
    }
}

/// Handler registered with the bus
///
/// Renderers implement this; `on_event` is only ever invoked from the
/// thread that calls [`EventBus::dispatch_pending`].
pub trait EventSubscriber: Send {
    fn on_event(&mut self, event: &SessionEvent);
}

// Closures are accepted directly as subscribers.
impl<F: FnMut(&SessionEvent) + Send> EventSubscriber for F {
    fn on_event(&mut self, event: &SessionEvent) {
        self(event)
    }
}

/// Pump-side publishing handle
#[derive(Clone)]
pub struct EventPublisher {
    tx: Sender<SessionEvent>,
}

impl EventPublisher {
    /// Publish an event onto the bus
    ///
    /// Returns `false` if the bus has been dropped.
    pub fn publish(&self, event: SessionEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Presentation-side bus: subscriber registry plus the pending-event inbox
pub struct EventBus {
    rx: Receiver<SessionEvent>,
    subscribers: Vec<Box<dyn EventSubscriber>>,
}

impl EventBus {
    /// Create a bus and its publishing handle
    pub fn new() -> (EventPublisher, EventBus) {
        let (tx, rx) = unbounded();
        (
            EventPublisher { tx },
            EventBus {
                rx,
                subscribers: Vec::new(),
            },
        )
    }

    /// Register a subscriber
    ///
    /// Every subscriber sees every event dispatched after registration.
    pub fn subscribe(&mut self, subscriber: Box<dyn EventSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Deliver all pending events to every subscriber
    ///
    /// Must be called from the presentation thread. Returns the number of
    /// events delivered.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.rx.try_recv() {
            for subscriber in &mut self.subscribers {
                subscriber.on_event(&event);
            }
            delivered += 1;
        }
        delivered
    }

    /// Drain pending events without dispatching to subscribers
    ///
    /// Useful for callers that consume the stream directly instead of
    /// registering handlers.
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}
