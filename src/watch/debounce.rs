// src/watch/debounce.rs

//! Per-route trailing-edge debounce.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Coalesces bursts of events per route.
///
/// Each `record` pushes the route's deadline to `now + window`. A route is
/// due once its deadline has passed, i.e. after it has been quiet for a full
/// window, and then fires exactly once.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadlines: HashMap<usize, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadlines: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an event for `route` observed at `now`.
    pub fn record(&mut self, route: usize, now: Instant) {
        self.deadlines.insert(route, now + self.window);
    }

    /// Earliest pending deadline, if any route is waiting.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return the routes whose deadline is at or before `now`,
    /// in ascending route order.
    pub fn take_due(&mut self, now: Instant) -> Vec<usize> {
        let mut due: Vec<usize> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(route, _)| *route)
            .collect();
        due.sort_unstable();
        for route in &due {
            self.deadlines.remove(route);
        }
        due
    }

    pub fn is_idle(&self) -> bool {
        self.deadlines.is_empty()
    }
}
