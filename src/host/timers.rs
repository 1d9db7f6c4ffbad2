//! Recurring timer registry, the in-process stand-in for a host frame scheduler.
//!
//! The host main loop calls [`Timers::run_due`] once per frame. Each handler
//! whose deadline has passed gets one `on_tick`; the returned interval sets
//! its next deadline.

use std::time::{Duration, Instant};

use log::trace;

use super::{FrameScheduler, SceneHost, TickHandler, TimerId};

struct Entry {
    id: TimerId,
    handler: Box<dyn TickHandler>,
    next_due: Instant,
}

/// Frame-driven timer registry.
#[derive(Default)]
pub struct Timers {
    entries: Vec<Entry>,
    next_id: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest pending deadline, if any handler is registered.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.next_due).min()
    }

    /// Invoke every handler due at `now`. Returns how many ran.
    pub fn run_due(&mut self, host: &mut dyn SceneHost, now: Instant) -> usize {
        let mut ran = 0;
        for entry in self.entries.iter_mut().filter(|e| e.next_due <= now) {
            let interval = entry.handler.on_tick(host);
            entry.next_due = Instant::now() + interval;
            ran += 1;
        }
        ran
    }

    /// Sleep-friendly delay until the next deadline, capped at `max`.
    pub fn time_to_next(&self, now: Instant, max: Duration) -> Duration {
        self.next_deadline()
            .map(|due| due.saturating_duration_since(now))
            .unwrap_or(max)
            .min(max)
    }
}

impl FrameScheduler for Timers {
    fn register(&mut self, handler: Box<dyn TickHandler>) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        trace!("Timer {:?} registered", id);
        self.entries.push(Entry {
            id,
            handler,
            next_due: Instant::now(),
        });
        id
    }

    fn unregister(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        let removed = self.entries.len() != before;
        trace!("Timer {:?} unregistered: {}", id, removed);
        removed
    }
}
