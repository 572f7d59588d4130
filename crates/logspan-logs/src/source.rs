use std::collections::HashSet;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use parking_lot::RwLock;
use thiserror::Error;

use logspan_types::{EventsPage, LogEvent, Pagination};

use crate::filter::EventFilter;

/// Errors reported by an event source
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("invalid cursor: {0:?}")]
    InvalidCursor(String),

    #[error("pagination needs either prev or next")]
    InvalidPagination,

    #[error("{0}")]
    Transport(String),
}

pub type EventsFuture<'a> = BoxFuture<'a, Result<EventsPage, SourceError>>;

/// Fetch collaborator for paginated log events
///
/// `logs` lists the process ids whose streams should be returned; an empty
/// list means every stream.
pub trait EventSource: Send + Sync {
    fn get_events<'a>(
        &'a self,
        logs: &'a [String],
        filter_str: Option<&'a str>,
        pagination: Pagination,
    ) -> EventsFuture<'a>;
}

/// Chronological in-memory event log
///
/// Cursors are the decimal index of an event in the log.
#[derive(Clone, Default)]
pub struct MemoryEventSource {
    events: Arc<RwLock<Vec<LogEvent>>>,
}

impl MemoryEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<LogEvent>) -> Self {
        Self {
            events: Arc::new(RwLock::new(events)),
        }
    }

    /// Append an event to the end of the log
    pub fn push(&self, event: LogEvent) {
        self.events.write().push(event);
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Serve one page synchronously
    pub fn page(
        &self,
        logs: &[String],
        filter_str: Option<&str>,
        pagination: &Pagination,
    ) -> Result<EventsPage, SourceError> {
        let events = self.events.read();
        let total = events.len();

        let cursor = match &pagination.cursor {
            Some(raw) => {
                let idx: usize = raw
                    .parse()
                    .map_err(|_| SourceError::InvalidCursor(raw.clone()))?;
                if idx > total {
                    return Err(SourceError::InvalidCursor(raw.clone()));
                }
                Some(idx)
            }
            None => None,
        };

        let streams: HashSet<&str> = logs.iter().map(String::as_str).collect();
        let filter = EventFilter::new(filter_str);
        let matching = |idx: &usize| {
            let event = &events[*idx];
            (streams.is_empty() || streams.contains(event.process_id())) && filter.matches(event)
        };

        let (indices, next_cursor, prev_cursor): (Vec<usize>, usize, usize) =
            match (pagination.prev, pagination.next) {
                (Some(n), _) => {
                    let end = cursor.unwrap_or(total);
                    let mut found: Vec<usize> = (0..end).rev().filter(matching).take(n).collect();
                    found.reverse();
                    let prev_cursor = found.first().copied().unwrap_or(end);
                    (found, end, prev_cursor)
                }
                (None, Some(n)) => {
                    let start = cursor.unwrap_or(0);
                    let found: Vec<usize> = (start..total).filter(matching).take(n).collect();
                    let next_cursor = match found.last() {
                        Some(last) if found.len() == n => last + 1,
                        _ => total,
                    };
                    (found, next_cursor, start)
                }
                (None, None) => return Err(SourceError::InvalidPagination),
            };

        Ok(EventsPage {
            items: indices.into_iter().map(|idx| events[idx].clone()).collect(),
            next_cursor: next_cursor.to_string(),
            prev_cursor: prev_cursor.to_string(),
        })
    }
}

impl EventSource for MemoryEventSource {
    fn get_events<'a>(
        &'a self,
        logs: &'a [String],
        filter_str: Option<&'a str>,
        pagination: Pagination,
    ) -> EventsFuture<'a> {
        Box::pin(future::ready(self.page(logs, filter_str, &pagination)))
    }
}
