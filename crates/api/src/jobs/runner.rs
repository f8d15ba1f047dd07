//! Lifecycle for long-running background tasks.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Owns background tasks and tells them when to stop.
///
/// Every task receives a `watch::Receiver<bool>` that flips to `true` on
/// shutdown; tasks are expected to return promptly after that.
pub struct JobRunner {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl JobRunner {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    pub fn spawn<F, Fut>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task(self.shutdown_tx.subscribe()));
        info!(job = name, "Background job started");
        self.handles.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signals shutdown and waits up to `timeout` for every task.
    pub async fn shutdown(self, timeout: Duration) {
        info!("Stopping {} background jobs", self.handles.len());
        let _ = self.shutdown_tx.send(true);

        let join_all = async {
            for (name, handle) in self.handles {
                if let Err(e) = handle.await {
                    warn!(job = name, error = %e, "Background job panicked");
                }
            }
        };

        match tokio::time::timeout(timeout, join_all).await {
            Ok(()) => info!("All background jobs stopped"),
            Err(_) => warn!("Background job shutdown timed out after {:?}", timeout),
        }
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once `shutdown` flips to `true` or its sender is gone.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
