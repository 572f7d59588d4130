//! Shared types for logspan
//!
//! This crate contains data structures used across multiple logspan crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Log Types
// ============================================================================

/// One unit of streamed process output
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Unique, opaque event id
    pub id: String,

    /// ISO-8601 timestamp as reported by the collector
    pub timestamp: String,

    /// Stream identifier, e.g. "processId:out"
    #[serde(alias = "stream")]
    pub log: String,

    /// Raw message text (may contain escape codes)
    pub message: String,
}

impl LogEvent {
    pub fn new(
        id: impl Into<String>,
        timestamp: impl Into<String>,
        log: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp: timestamp.into(),
            log: log.into(),
            message: message.into(),
        }
    }

    /// Parse the timestamp, if it is valid RFC 3339
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Process part of the stream identifier ("web:out" -> "web")
    pub fn process_id(&self) -> &str {
        match self.log.rsplit_once(':') {
            Some((process, _)) => process,
            None => &self.log,
        }
    }

    /// Stream part of the identifier ("web:out" -> Some("out"))
    pub fn stream_name(&self) -> Option<&str> {
        self.log.rsplit_once(':').map(|(_, stream)| stream)
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Cursor-based pagination parameters for an event fetch
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Opaque cursor; None requests from the boundary
    pub cursor: Option<String>,

    /// Number of events before the cursor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<usize>,

    /// Number of events after the cursor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<usize>,
}

impl Pagination {
    /// Request the next `n` events forward
    pub fn next(n: usize) -> Self {
        Self {
            next: Some(n),
            ..Default::default()
        }
    }

    /// Request the `n` events preceding the cursor (most recent when no cursor)
    pub fn prev(n: usize) -> Self {
        Self {
            prev: Some(n),
            ..Default::default()
        }
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// One page of events returned by the fetch collaborator
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsPage {
    pub items: Vec<LogEvent>,

    /// Cursor to pass back verbatim to continue forward
    pub next_cursor: String,

    /// Cursor to continue backward
    #[serde(default)]
    pub prev_cursor: String,
}

// ============================================================================
// Request Lifecycle
// ============================================================================

/// Observable state of an asynchronous data fetch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "lowercase")]
pub enum RequestLifecycle<T> {
    /// No data, no request, no error
    Idle,
    /// Request in flight, no prior data
    Pending,
    /// Last request failed
    Error { message: String },
    /// Last request succeeded
    Success { data: T },
    /// New request in flight while previous data is still shown
    Refetching { data: T },
}

// Derived Default would require `T: Default`
impl<T> Default for RequestLifecycle<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> RequestLifecycle<T> {
    /// Stage name ("idle", "pending", ...)
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Error { .. } => "error",
            Self::Success { .. } => "success",
            Self::Refetching { .. } => "refetching",
        }
    }

    /// Data is available (success or refetching)
    pub fn has_data(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Refetching { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data } | Self::Refetching { data } => Some(data),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Success { data } | Self::Refetching { data } => Some(data),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            _ => None,
        }
    }

    /// A request has settled, successfully or not
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Success { .. })
    }

    /// Nothing has settled yet, or a refresh is in flight
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Idle | Self::Pending | Self::Refetching { .. })
    }

    /// A request is currently in flight
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Pending | Self::Refetching { .. })
    }

    pub fn map<U, F>(self, f: F) -> RequestLifecycle<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Idle => RequestLifecycle::Idle,
            Self::Pending => RequestLifecycle::Pending,
            Self::Error { message } => RequestLifecycle::Error { message },
            Self::Success { data } => RequestLifecycle::Success { data: f(data) },
            Self::Refetching { data } => RequestLifecycle::Refetching { data: f(data) },
        }
    }
}
