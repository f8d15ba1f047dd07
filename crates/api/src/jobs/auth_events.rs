//! Consumes auth state changes published by the auth backend.

use domain::models::AuthEvent;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use super::runner::shutdown_requested;
use crate::middleware::metrics::record_auth_event;

fn handle_event(event: &AuthEvent) {
    record_auth_event(event.kind());
    match event {
        AuthEvent::SignedUp { user_id } => {
            info!(user_id = %user_id, "Auth event: signed up");
        }
        AuthEvent::SignedIn {
            user_id,
            session_id,
        } => {
            info!(user_id = %user_id, session_id = %session_id, "Auth event: signed in");
        }
        AuthEvent::SignedOut {
            user_id,
            session_id,
        } => {
            info!(user_id = %user_id, session_id = %session_id, "Auth event: signed out");
        }
    }
}

/// Logs and counts every auth event until shutdown or until the publisher
/// goes away. Returns how many events were handled.
pub async fn listen_auth_events(
    mut events: broadcast::Receiver<AuthEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut handled = 0;
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    handle_event(&event);
                    handled += 1;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Auth event listener lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Auth event stream closed");
                    break;
                }
            },
            _ = shutdown_requested(&mut shutdown) => break,
        }
    }
    handled
}
