//! Single-flight deferral that collapses bursts into the latest value.
//!
//! The first offer of a burst arms a deadline; later offers within the window
//! only replace the pending value. `poll` hands back the newest value once the
//! deadline has passed and disarms, so at most one release happens per window.

use std::time::{Duration, Instant};

pub const STATS_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct Coalescer<T> {
    window: Duration,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T> Coalescer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            deadline: None,
        }
    }

    pub fn offer(&mut self, value: T, now: Instant) {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.window);
        }
        self.pending = Some(value);
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self::new(STATS_WINDOW)
    }
}
