//! Study session timer state machine.
//!
//! The timer itself is tick-driven and has no notion of wall-clock time;
//! [`super::stopwatch::Stopwatch`] feeds it one tick per cadence.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl TimerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
            TimerState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("Cannot {action} a timer that is {state}")]
    InvalidTransition {
        action: &'static str,
        state: TimerState,
    },
}

/// Counts elapsed study seconds across pauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTimer {
    state: TimerState,
    elapsed: u64,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            elapsed: 0,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Seconds counted so far. Final once the timer is stopped.
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn start(&mut self) -> Result<(), TimerError> {
        self.transition("start", TimerState::Idle, TimerState::Running)
    }

    pub fn pause(&mut self) -> Result<(), TimerError> {
        self.transition("pause", TimerState::Running, TimerState::Paused)
    }

    pub fn resume(&mut self) -> Result<(), TimerError> {
        self.transition("resume", TimerState::Paused, TimerState::Running)
    }

    /// Finalizes the timer and returns the elapsed seconds.
    ///
    /// Stopping an already stopped timer returns the same value again.
    pub fn stop(&mut self) -> Result<u64, TimerError> {
        match self.state {
            TimerState::Running | TimerState::Paused => {
                self.state = TimerState::Stopped;
                Ok(self.elapsed)
            }
            TimerState::Stopped => Ok(self.elapsed),
            TimerState::Idle => Err(TimerError::InvalidTransition {
                action: "stop",
                state: self.state,
            }),
        }
    }

    /// Adds one second if running. Ignored in every other state.
    pub fn tick(&mut self) {
        if self.state == TimerState::Running {
            self.elapsed = self.elapsed.saturating_add(1);
        }
    }

    fn transition(
        &mut self,
        action: &'static str,
        from: TimerState,
        to: TimerState,
    ) -> Result<(), TimerError> {
        if self.state != from {
            return Err(TimerError::InvalidTransition {
                action,
                state: self.state,
            });
        }
        self.state = to;
        Ok(())
    }
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new()
    }
}
