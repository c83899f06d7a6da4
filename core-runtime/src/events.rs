//! # Event Bus System
//!
//! Typed notifications from the playback core, fanned out over
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event types**: [`CoreEvent`] wraps [`PlaybackEvent`] and [`CacheEvent`]
//! - **EventBus**: cloneable handle to the broadcast sender
//! - **EventStream**: receiver wrapper with an optional filter predicate
//!
//! ```text
//! ┌──────────────────┐   emit    ┌──────────┐  subscribe  ┌────────────┐
//! │ PlaybackPipeline ├──────────>│          ├────────────>│ UI / host  │
//! └──────────────────┘           │ EventBus │             └────────────┘
//! ┌──────────────────┐   emit    │          │  subscribe  ┌────────────┐
//! │ TrackCache       ├──────────>│          ├────────────>│ Telemetry  │
//! └──────────────────┘           └──────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(32);
//! let mut failures = EventStream::new(bus.subscribe())
//!     .filter(|e| matches!(e, CoreEvent::Playback(PlaybackEvent::Failed { .. })));
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Failed {
//!     generation: 1,
//!     url: "https://cdn.example.com/a.dfpwm".to_string(),
//!     message: "connection reset".to_string(),
//! }))
//! .ok();
//!
//! assert!(failures.recv().await.is_ok());
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - `RecvError::Lagged(n)`: the subscriber missed `n` events; it may keep receiving.
//! - `RecvError::Closed`: every sender is gone; treat as shutdown.
//!
//! Emitting with no subscribers returns an error that publishers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::Completed { .. })
            | CoreEvent::Playback(PlaybackEvent::Started { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Generation id carried by playback events.
    pub fn generation(&self) -> Option<u64> {
        match self {
            CoreEvent::Playback(e) => Some(e.generation()),
            CoreEvent::Cache(_) => None,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Lifecycle of one playback request, keyed by its generation id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new request was issued and any previous one invalidated.
    Requested {
        generation: u64,
        /// Redacted track URL.
        url: String,
    },
    /// The stream ended and the full buffer is available.
    Completed {
        generation: u64,
        url: String,
        samples: u64,
        duration_ms: u64,
        /// Whether the bytes were replayed from the offline cache.
        from_cache: bool,
    },
    /// The completed buffer was handed to the sink and playback started.
    Started { generation: u64, url: String },
    /// A newer request (or an abort) replaced this one before it completed.
    Superseded {
        generation: u64,
        /// Generation that replaced it.
        by: u64,
    },
    /// Playback was stopped explicitly.
    Stopped { generation: u64 },
    /// The byte stream could not be opened or failed mid-read.
    Failed {
        generation: u64,
        url: String,
        message: String,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Requested { .. } => "Playback requested",
            PlaybackEvent::Completed { .. } => "Track decoded",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Superseded { .. } => "Playback request superseded",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Failed { .. } => "Playback failed",
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            PlaybackEvent::Requested { generation, .. }
            | PlaybackEvent::Completed { generation, .. }
            | PlaybackEvent::Started { generation, .. }
            | PlaybackEvent::Superseded { generation, .. }
            | PlaybackEvent::Stopped { generation }
            | PlaybackEvent::Failed { generation, .. } => *generation,
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

/// Offline track cache activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    Hit { url: String, bytes: u64 },
    Stored { url: String, bytes: u64 },
    Evicted { url: String },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Hit { .. } => "Track served from cache",
            CacheEvent::Stored { .. } => "Track stored in cache",
            CacheEvent::Evicted { .. } => "Track evicted from cache",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Clones share one channel. Slow subscribers receive `RecvError::Lagged`
/// rather than blocking publishers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus buffering at most `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event, returning how many subscribers received it.
    ///
    /// Fails only when nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates an independent receiver for all future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only deliver events matching `predicate`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    /// Receives the next matching event, skipping the rest.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive. Returns `None` if no matching event is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
