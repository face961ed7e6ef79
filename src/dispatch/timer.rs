//! Repeating, cancellable poll action.
//!
//! A [`PollTimer`] runs at most one action at a time. Each tick waits the
//! interval, runs the action, and reschedules only if the action asks to
//! continue. Arming a new action cancels the previous one first.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

// ============================================================================
// Constants
// ============================================================================

/// Default poll interval while a job is active.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30 * 60);

// ============================================================================
// TickOutcome
// ============================================================================

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Schedule another tick.
    Continue,
    /// Stop; no further ticks.
    Stop,
}

// ============================================================================
// PollTimer
// ============================================================================

/// Owner of the single armed poll task.
#[derive(Debug)]
pub struct PollTimer {
    /// Delay before each tick.
    interval: Duration,
    /// Armed task, if any.
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollTimer {
    /// Creates a disarmed timer.
    #[inline]
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: Mutex::new(None),
        }
    }

    /// Returns the tick interval.
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arms `action`, cancelling any armed action first.
    pub fn arm<F, Fut>(&self, mut action: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TickOutcome> + Send + 'static,
    {
        let interval = self.interval;
        let mut slot = self.task.lock();

        if let Some(previous) = slot.take() {
            previous.abort();
            debug!("Replaced armed poll timer");
        }

        *slot = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                trace!("Poll timer tick");

                if action().await == TickOutcome::Stop {
                    debug!("Poll timer stopped itself");
                    break;
                }
            }
        }));

        debug!(interval_secs = interval.as_secs(), "Poll timer armed");
    }

    /// Cancels the armed action.
    ///
    /// Returns `true` if an action was still running.
    pub fn disarm(&self) -> bool {
        match self.task.lock().take() {
            Some(task) => {
                let running = !task.is_finished();
                task.abort();
                if running {
                    debug!("Poll timer disarmed");
                }
                running
            }
            None => false,
        }
    }

    /// Returns `true` if an action is armed and has not stopped.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Default for PollTimer {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
