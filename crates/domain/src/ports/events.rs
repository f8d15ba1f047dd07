//! Auth event fan-out shared by auth provider implementations.

use tokio::sync::broadcast;
use tracing::debug;

use crate::models::AuthEvent;

const DEFAULT_CAPACITY: usize = 256;

/// Broadcasts [`AuthEvent`]s to any number of subscribers.
///
/// Slow subscribers lose the oldest events rather than blocking publishers.
#[derive(Debug, Clone)]
pub struct AuthEventHub {
    tx: broadcast::Sender<AuthEvent>,
}

impl AuthEventHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: AuthEvent) {
        // No subscribers is not an error.
        if self.tx.send(event.clone()).is_err() {
            debug!(event = event.kind(), "Auth event dropped, no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }
}

impl Default for AuthEventHub {
    fn default() -> Self {
        Self::new()
    }
}
