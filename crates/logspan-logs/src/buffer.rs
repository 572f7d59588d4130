use std::collections::VecDeque;

use logspan_types::LogEvent;

/// Bounded FIFO window of log events
///
/// Once the capacity is exceeded the oldest events are dropped.
#[derive(Clone, Debug)]
pub struct EventWindow {
    /// Internal storage
    events: VecDeque<LogEvent>,

    /// Maximum capacity
    capacity: usize,
}

impl EventWindow {
    /// Create an empty window with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Seed a window with existing events, keeping only the newest
    pub fn from_events<I>(capacity: usize, events: I) -> Self
    where
        I: IntoIterator<Item = LogEvent>,
    {
        let mut window = Self::new(capacity);
        window.extend(events);
        window
    }

    /// Push a new event, evicting oldest if at capacity
    pub fn push(&mut self, event: LogEvent) {
        if self.capacity == 0 {
            return;
        }
        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Append events in arrival order
    pub fn extend<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = LogEvent>,
    {
        for event in events {
            self.push(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get the last N events
    pub fn tail(&self, n: usize) -> Vec<LogEvent> {
        let start = self.events.len().saturating_sub(n);
        self.events.iter().skip(start).cloned().collect()
    }

    pub fn into_vec(self) -> Vec<LogEvent> {
        self.events.into()
    }
}
