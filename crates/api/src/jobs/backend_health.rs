//! Periodic backend liveness probe.

use std::sync::Arc;
use std::time::Duration;

use domain::ports::HealthProbe;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::runner::shutdown_requested;
use crate::middleware::metrics::record_backend_up;

pub const BACKEND_PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Pings the backend every `every` and exports the result as the
/// `backend_up` gauge.
pub async fn probe_backend(
    health: Arc<dyn HealthProbe>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match health.ping().await {
                    Ok(()) => {
                        debug!("Backend probe succeeded");
                        record_backend_up(true);
                    }
                    Err(e) => {
                        warn!(error = %e, "Backend probe failed");
                        record_backend_up(false);
                    }
                }
            }
            _ = shutdown_requested(&mut shutdown) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domain::BackendError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProbe {
        pings: AtomicUsize,
    }

    #[async_trait]
    impl HealthProbe for CountingProbe {
        async fn ping(&self) -> Result<(), BackendError> {
            self.pings.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::Unavailable("down".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_runs_until_shutdown() {
        let probe = Arc::new(CountingProbe {
            pings: AtomicUsize::new(0),
        });
        let (tx, shutdown) = watch::channel(false);
        let task = tokio::spawn(probe_backend(
            probe.clone(),
            Duration::from_secs(10),
            shutdown,
        ));

        tokio::time::sleep(Duration::from_secs(25)).await;
        tx.send(true).unwrap();
        task.await.unwrap();

        // Immediate first tick plus two more.
        assert_eq!(probe.pings.load(Ordering::SeqCst), 3);
    }
}
