//! # Event Bus System
//!
//! Typed notifications from the core to the host over `tokio::sync::broadcast`.
//! Hosts subscribe to learn about sign-in transitions (to refresh UI state)
//! and lyrics resolution results without polling.
//!
//! ```text
//! ┌──────────────┐   emit    ┌───────────┐   subscribe   ┌────────────┐
//! │ core-auth    ├──────────>│           ├──────────────>│ Host UI    │
//! └──────────────┘           │ EventBus  │               └────────────┘
//! ┌──────────────┐   emit    │           │   subscribe   ┌────────────┐
//! │ core-lyrics  ├──────────>│           ├──────────────>│ Subscriber │
//! └──────────────┘           └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(16);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus.emit(CoreEvent::Auth(AuthEvent::SignedOut)).ok();
//! assert_eq!(
//!     receiver.try_recv().unwrap(),
//!     CoreEvent::Auth(AuthEvent::SignedOut)
//! );
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it keeps
//!   receiving newer ones.
//! - **`RecvError::Closed`**: every sender was dropped. Treat as shutdown.
//!
//! `emit` fails only when nobody is subscribed; producers ignore that case.

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

/// Top-level event published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authentication state changes
    Auth(AuthEvent),
    /// Lyrics resolution outcomes
    Lyrics(LyricsEvent),
}

impl CoreEvent {
    /// Whether the event changes the host-visible signed-in status.
    pub fn is_auth_status_change(&self) -> bool {
        matches!(
            self,
            CoreEvent::Auth(AuthEvent::SignedIn) | CoreEvent::Auth(AuthEvent::SignedOut)
        )
    }
}

// ============================================================================
// Authentication Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// Credential removed from the vault
    SignedOut,
    /// Authorization URL issued; waiting for the redirect callback
    SigningIn,
    /// Code exchanged and credential stored
    SignedIn,
    /// Access token expired; refresh grant in flight
    TokenRefreshing,
    TokenRefreshed {
        /// New expiry, epoch milliseconds
        expires_at_ms: i64,
    },
    /// No callback arrived before the listener deadline
    LoginTimedOut,
    AuthError {
        message: String,
        recoverable: bool,
    },
}

// ============================================================================
// Lyrics Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LyricsEvent {
    Resolved {
        track: String,
        artist: String,
        /// Cascade tier that produced the match (1-based), 0 for a cache hit
        tier: u8,
        line_count: usize,
    },
    NotFound {
        track: String,
        artist: String,
    },
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel shared by every producer in the core.
///
/// Cloning is cheap; all clones publish to the same subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publish to all current subscribers.
    ///
    /// Returns the number of receivers, or an error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
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

/// Receiver with an optional predicate applied before events are returned.
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

    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
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

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(track: &str) -> CoreEvent {
        CoreEvent::Lyrics(LyricsEvent::Resolved {
            track: track.to_string(),
            artist: "Artist".to_string(),
            tier: 1,
            line_count: 12,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(CoreEvent::Auth(AuthEvent::SignedOut)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Auth(AuthEvent::SignedIn);
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|event| event.is_auth_status_change());

        bus.emit(resolved("Song")).ok();
        bus.emit(CoreEvent::Auth(AuthEvent::TokenRefreshing)).ok();
        bus.emit(CoreEvent::Auth(AuthEvent::SignedOut)).ok();

        assert_eq!(
            stream.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::SignedOut)
        );
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(CoreEvent::Auth(AuthEvent::TokenRefreshed {
                expires_at_ms: 1_700_000_000_000 + i,
            }))
            .ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus = EventBus::new(100);
        let mut sub = bus.subscribe();

        let bus1 = bus.clone();
        let bus2 = bus.clone();

        let handle1 = tokio::spawn(async move {
            for i in 0..10 {
                bus1.emit(CoreEvent::Auth(AuthEvent::TokenRefreshed { expires_at_ms: i }))
                    .ok();
            }
        });
        let handle2 = tokio::spawn(async move {
            for i in 0..10 {
                bus2.emit(resolved(&format!("track-{}", i))).ok();
            }
        });

        handle1.await.ok();
        handle2.await.ok();

        let mut count = 0;
        while sub.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 20);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Auth(AuthEvent::TokenRefreshed {
            expires_at_ms: 1_700_000_000_000,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Auth\""));
        assert!(json.contains("TokenRefreshed"));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}
