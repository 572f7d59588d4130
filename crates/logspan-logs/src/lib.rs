//! Log stores for logspan
//!
//! This crate provides per-workspace paginated log buffers, the event source
//! collaborator they fetch from, message filtering, and the visible-logs set.

mod buffer;
mod filter;
mod source;
mod store;
mod visible;

pub use buffer::EventWindow;
pub use filter::EventFilter;
pub use source::{EventSource, EventsFuture, MemoryEventSource, SourceError};
pub use store::{
    DEFAULT_MAX_EVENTS, DEFAULT_PAGE_SIZE, EventList, LogStore, LogStoreConfig, WorkspaceState,
};
pub use visible::{
    FileKvStore, HIDDEN_LOGS_KEY, KeyValueStore, KvError, MemoryKvStore, VisibleLogs, VisibleSet,
};

// Re-export types used in our public API
pub use logspan_types::{EventsPage, LogEvent, Pagination, RequestLifecycle};
