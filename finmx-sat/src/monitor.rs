//! Observation hooks for the search.
//!
//! A [`TraceMonitor`] is called synchronously on the solving thread for every
//! assignment and every backtrack. Monitors only record; they cannot change
//! the clause database.

use crate::literal::Lit;

/// Receives assignment and backtrack events from the solver.
pub trait TraceMonitor {
    /// A literal became true at `level` (decisions and implications alike).
    fn propagate(&mut self, lit: Lit, level: u32);

    /// The solver returned to `level`.
    fn backtrack(&mut self, level: u32);
}

/// A single recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// Assignment of a literal
    Propagate {
        /// Assigned literal
        lit: Lit,
        /// Decision level of the assignment
        level: u32,
    },
    /// Backtrack to a level
    Backtrack {
        /// Target level
        level: u32,
    },
}

/// Monitor that keeps every event together with its sequence number.
#[derive(Debug, Clone, Default)]
pub struct RecordingMonitor {
    events: Vec<(u64, TraceEvent)>,
    next_id: u64,
}

impl RecordingMonitor {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events in order.
    #[must_use]
    pub fn events(&self) -> &[(u64, TraceEvent)] {
        &self.events
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of recorded propagations.
    #[must_use]
    pub fn num_propagations(&self) -> usize {
        self.events
            .iter()
            .filter(|(_, e)| matches!(e, TraceEvent::Propagate { .. }))
            .count()
    }

    /// Forget all events; numbering restarts at zero.
    pub fn clear(&mut self) {
        self.events.clear();
        self.next_id = 0;
    }

    fn record(&mut self, event: TraceEvent) {
        self.events.push((self.next_id, event));
        self.next_id += 1;
    }
}

impl TraceMonitor for RecordingMonitor {
    fn propagate(&mut self, lit: Lit, level: u32) {
        self.record(TraceEvent::Propagate { lit, level });
    }

    fn backtrack(&mut self, level: u32) {
        self.record(TraceEvent::Backtrack { level });
    }
}
