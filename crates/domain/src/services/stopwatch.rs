//! Wall-clock driver for [`SessionTimer`].
//!
//! A [`Stopwatch`] owns a timer and a tokio task that ticks it once per
//! cadence while it runs. The task is aborted on pause, stop, discard and
//! drop, so no tick task outlives the run that started it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;
use uuid::Uuid;

use super::timer::{SessionTimer, TimerError, TimerState};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Point-in-time view of a stopwatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub elapsed: u64,
}

#[derive(Debug)]
pub struct Stopwatch {
    timer: Arc<Mutex<SessionTimer>>,
    cadence: Duration,
    ticker: Option<JoinHandle<()>>,
}

impl Stopwatch {
    pub fn new(cadence: Duration) -> Self {
        Self {
            timer: Arc::new(Mutex::new(SessionTimer::new())),
            cadence,
            ticker: None,
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let timer = lock(&self.timer);
        TimerSnapshot {
            state: timer.state(),
            elapsed: timer.elapsed(),
        }
    }

    /// Whether a tick task is currently attached.
    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), TimerError> {
        lock(&self.timer).start()?;
        self.spawn_ticker();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), TimerError> {
        lock(&self.timer).pause()?;
        self.cancel_ticker();
        Ok(())
    }

    /// Must be called from within a tokio runtime.
    pub fn resume(&mut self) -> Result<(), TimerError> {
        lock(&self.timer).resume()?;
        self.spawn_ticker();
        Ok(())
    }

    /// Finalizes the run and returns the stopped timer.
    pub fn stop(&mut self) -> Result<SessionTimer, TimerError> {
        let finalized = {
            let mut timer = lock(&self.timer);
            timer.stop()?;
            timer.clone()
        };
        self.cancel_ticker();
        Ok(finalized)
    }

    /// Drops the run without recording anything.
    pub fn discard(mut self) {
        self.cancel_ticker();
    }

    fn spawn_ticker(&mut self) {
        self.cancel_ticker();
        let shared = Arc::clone(&self.timer);
        let cadence = self.cadence;
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + cadence, cadence);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let mut timer = lock(&shared);
                if !timer.is_running() {
                    break;
                }
                timer.tick();
            }
        }));
    }

    fn cancel_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
            debug!("Stopwatch tick task released");
        }
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

fn lock(timer: &Mutex<SessionTimer>) -> MutexGuard<'_, SessionTimer> {
    timer.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StopwatchError {
    #[error("A study timer is already active")]
    AlreadyActive,

    #[error("No study timer is active")]
    NotActive,

    #[error(transparent)]
    Timer(#[from] TimerError),
}

/// One stopwatch per user.
#[derive(Debug)]
pub struct StopwatchRegistry {
    cadence: Duration,
    watches: Mutex<HashMap<Uuid, Stopwatch>>,
}

impl StopwatchRegistry {
    pub fn new(cadence: Duration) -> Self {
        Self {
            cadence,
            watches: Mutex::new(HashMap::new()),
        }
    }

    fn watches(&self) -> MutexGuard<'_, HashMap<Uuid, Stopwatch>> {
        self.watches.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn start(&self, user_id: Uuid) -> Result<TimerSnapshot, StopwatchError> {
        let mut watches = self.watches();
        if watches.contains_key(&user_id) {
            return Err(StopwatchError::AlreadyActive);
        }
        let mut watch = Stopwatch::new(self.cadence);
        watch.start()?;
        let snapshot = watch.snapshot();
        watches.insert(user_id, watch);
        Ok(snapshot)
    }

    pub fn pause(&self, user_id: Uuid) -> Result<TimerSnapshot, StopwatchError> {
        let mut watches = self.watches();
        let watch = watches.get_mut(&user_id).ok_or(StopwatchError::NotActive)?;
        watch.pause()?;
        Ok(watch.snapshot())
    }

    pub fn resume(&self, user_id: Uuid) -> Result<TimerSnapshot, StopwatchError> {
        let mut watches = self.watches();
        let watch = watches.get_mut(&user_id).ok_or(StopwatchError::NotActive)?;
        watch.resume()?;
        Ok(watch.snapshot())
    }

    /// Stops the user's stopwatch and removes it from the registry.
    pub fn stop(&self, user_id: Uuid) -> Result<SessionTimer, StopwatchError> {
        let mut watch = self
            .watches()
            .remove(&user_id)
            .ok_or(StopwatchError::NotActive)?;
        watch.stop().map_err(StopwatchError::from)
    }

    /// Puts a stopped timer back so the caller can retry recording it.
    pub fn restore(&self, user_id: Uuid, timer: SessionTimer) {
        let watch = Stopwatch {
            timer: Arc::new(Mutex::new(timer)),
            cadence: self.cadence,
            ticker: None,
        };
        self.watches().entry(user_id).or_insert(watch);
    }

    pub fn discard(&self, user_id: Uuid) -> Result<(), StopwatchError> {
        let watch = self
            .watches()
            .remove(&user_id)
            .ok_or(StopwatchError::NotActive)?;
        watch.discard();
        Ok(())
    }

    pub fn snapshot(&self, user_id: Uuid) -> Option<TimerSnapshot> {
        self.watches().get(&user_id).map(Stopwatch::snapshot)
    }

    pub fn active_count(&self) -> usize {
        self.watches().len()
    }
}

impl Default for StopwatchRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}
