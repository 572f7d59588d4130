use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use logspan_types::{EventsPage, LogEvent, Pagination, RequestLifecycle};

use crate::buffer::EventWindow;
use crate::source::{EventSource, SourceError};
use crate::visible::VisibleSet;

/// Default cap on buffered events per workspace
pub const DEFAULT_MAX_EVENTS: usize = 1000;

/// Default number of events requested per page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Read-only snapshot of a workspace's events
pub type EventList = Arc<[LogEvent]>;

/// Tunables for the log store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogStoreConfig {
    pub max_events: usize,
    pub page_size: usize,
}

impl Default for LogStoreConfig {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Pagination and fetch state for one workspace
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkspaceState {
    /// Opaque pagination token; None means "start"
    pub cursor: Option<String>,

    /// Message filter; None means no filter
    pub filter_str: Option<String>,

    pub events: RequestLifecycle<EventList>,
}

#[derive(Default)]
struct Slot {
    state: WorkspaceState,

    /// Bumped on every fetch start and reset; a fetch only lands if it is
    /// still the latest when it resolves
    generation: u64,
}

/// Everything a fetch needs after leaving the lock
struct Ticket {
    generation: u64,
    cursor: Option<String>,
    filter_str: Option<String>,
}

/// Rolls a workspace back out of the in-flight state if the fetch future is
/// dropped before the collaborator answers
struct InFlight<'a> {
    store: &'a LogStore,
    workspace_id: &'a str,
    generation: u64,
    armed: bool,
}

impl InFlight<'_> {
    fn finish(mut self, result: Result<EventsPage, SourceError>) {
        self.armed = false;
        self.store
            .finish_fetch(self.workspace_id, self.generation, result);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.store.abandon_fetch(self.workspace_id, self.generation);
        }
    }
}

/// Per-workspace paginated log buffers
///
/// At most one fetch is in flight per workspace: a fetch started while the
/// workspace is `Pending` or `Refetching` is dropped. The lock is never held
/// across the collaborator call.
#[derive(Clone)]
pub struct LogStore {
    workspaces: Arc<Mutex<HashMap<String, Slot>>>,
    visible: Arc<dyn VisibleSet>,
    config: LogStoreConfig,
}

impl LogStore {
    pub fn new(visible: Arc<dyn VisibleSet>) -> Self {
        Self::with_config(visible, LogStoreConfig::default())
    }

    pub fn with_config(visible: Arc<dyn VisibleSet>, config: LogStoreConfig) -> Self {
        Self {
            workspaces: Arc::new(Mutex::new(HashMap::new())),
            visible,
            config,
        }
    }

    /// Drive one fetch cycle for a workspace
    ///
    /// A cursor in `pagination` takes precedence over the stored one. Failures
    /// end up in the workspace's `RequestLifecycle`, never as a return value.
    pub async fn fetch_logs<S>(
        &self,
        workspace_id: &str,
        source: &S,
        pagination: Pagination,
        filter_str: Option<&str>,
    ) where
        S: EventSource + ?Sized,
    {
        let logs: Vec<String> = self.visible.visible_logs().into_iter().collect();
        if logs.is_empty() {
            debug!(workspace_id, "no visible logs, skipping fetch");
            return;
        }

        let Some(ticket) = self.begin_fetch(workspace_id, normalize_filter(filter_str)) else {
            return;
        };

        let in_flight = InFlight {
            store: self,
            workspace_id,
            generation: ticket.generation,
            armed: true,
        };

        let pagination = Pagination {
            cursor: pagination.cursor.or(ticket.cursor),
            ..pagination
        };
        let result = source
            .get_events(&logs, ticket.filter_str.as_deref(), pagination)
            .await;

        in_flight.finish(result);
    }

    /// Fetch the next page forward from the stored cursor
    pub async fn refresh_logs<S>(&self, workspace_id: &str, source: &S)
    where
        S: EventSource + ?Sized,
    {
        let filter = self.filter_str(workspace_id);
        self.fetch_logs(
            workspace_id,
            source,
            Pagination::next(self.config.page_size),
            filter.as_deref(),
        )
        .await;
    }

    /// Reset the workspace, then fetch the most recent page
    pub async fn load_initial_logs<S>(&self, workspace_id: &str, source: &S)
    where
        S: EventSource + ?Sized,
    {
        self.reset_logs(workspace_id);
        let filter = self.filter_str(workspace_id);
        self.fetch_logs(
            workspace_id,
            source,
            Pagination::prev(self.config.page_size),
            filter.as_deref(),
        )
        .await;
    }

    /// Clear cursor and data to an empty successful state
    ///
    /// Any fetch still in flight for the workspace is discarded on arrival.
    pub fn reset_logs(&self, workspace_id: &str) {
        let mut workspaces = self.workspaces.lock();
        let slot = workspaces.entry(workspace_id.to_string()).or_default();
        clear_slot(slot);
        debug!(workspace_id, generation = slot.generation, "logs reset");
    }

    /// Replace the filter, clear the buffer and fetch again from the start
    pub async fn set_filter_str<S>(&self, workspace_id: &str, source: &S, filter_str: Option<&str>)
    where
        S: EventSource + ?Sized,
    {
        let filter = normalize_filter(filter_str);
        {
            let mut workspaces = self.workspaces.lock();
            let slot = workspaces.entry(workspace_id.to_string()).or_default();
            clear_slot(slot);
            slot.state.filter_str = filter.clone();
        }
        self.fetch_logs(
            workspace_id,
            source,
            Pagination::prev(self.config.page_size),
            filter.as_deref(),
        )
        .await;
    }

    /// Snapshot of a workspace, if it has been touched
    pub fn workspace(&self, workspace_id: &str) -> Option<WorkspaceState> {
        self.workspaces
            .lock()
            .get(workspace_id)
            .map(|slot| slot.state.clone())
    }

    /// Snapshot of a workspace's events (`Idle` for unknown workspaces)
    pub fn events(&self, workspace_id: &str) -> RequestLifecycle<EventList> {
        self.workspaces
            .lock()
            .get(workspace_id)
            .map(|slot| slot.state.events.clone())
            .unwrap_or_default()
    }

    pub fn cursor(&self, workspace_id: &str) -> Option<String> {
        self.workspaces
            .lock()
            .get(workspace_id)
            .and_then(|slot| slot.state.cursor.clone())
    }

    pub fn filter_str(&self, workspace_id: &str) -> Option<String> {
        self.workspaces
            .lock()
            .get(workspace_id)
            .and_then(|slot| slot.state.filter_str.clone())
    }

    pub fn workspace_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workspaces.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Enter the in-flight state, or None if a fetch is already running
    fn begin_fetch(&self, workspace_id: &str, filter_str: Option<String>) -> Option<Ticket> {
        let mut workspaces = self.workspaces.lock();
        let slot = workspaces.entry(workspace_id.to_string()).or_default();

        let next = match std::mem::take(&mut slot.state.events) {
            RequestLifecycle::Idle | RequestLifecycle::Error { .. } => RequestLifecycle::Pending,
            RequestLifecycle::Success { data } => RequestLifecycle::Refetching { data },
            in_flight @ (RequestLifecycle::Pending | RequestLifecycle::Refetching { .. }) => {
                slot.state.events = in_flight;
                debug!(workspace_id, "fetch already in flight, dropping request");
                return None;
            }
        };
        slot.state.events = next;

        slot.generation += 1;
        slot.state.filter_str = filter_str;
        debug!(
            workspace_id,
            generation = slot.generation,
            stage = slot.state.events.stage(),
            "fetch started"
        );

        Some(Ticket {
            generation: slot.generation,
            cursor: slot.state.cursor.clone(),
            filter_str: slot.state.filter_str.clone(),
        })
    }

    /// Merge a resolved fetch into the workspace
    fn finish_fetch(
        &self,
        workspace_id: &str,
        generation: u64,
        result: Result<EventsPage, SourceError>,
    ) {
        let mut workspaces = self.workspaces.lock();
        let Some(slot) = workspaces.get_mut(workspace_id) else {
            return;
        };
        if slot.generation != generation {
            debug!(
                workspace_id,
                generation,
                latest = slot.generation,
                "discarding superseded fetch"
            );
            return;
        }

        match result {
            Ok(page) => {
                let previous = slot.state.events.data().cloned().unwrap_or_else(empty_list);
                let received = page.items.len();
                let window = EventWindow::from_events(
                    self.config.max_events,
                    previous.iter().cloned().chain(page.items),
                );
                let data: EventList = window.into_vec().into();
                debug!(workspace_id, received, buffered = data.len(), "fetch merged");

                slot.state.cursor = Some(page.next_cursor);
                slot.state.events = RequestLifecycle::Success { data };
            }
            Err(err) => {
                warn!(workspace_id, %err, "log fetch failed");
                // Stale data is dropped on failure
                slot.state.events = RequestLifecycle::Error {
                    message: err.to_string(),
                };
            }
        }
    }

    /// Undo `begin_fetch` for a fetch that was cancelled mid-flight
    fn abandon_fetch(&self, workspace_id: &str, generation: u64) {
        let mut workspaces = self.workspaces.lock();
        let Some(slot) = workspaces.get_mut(workspace_id) else {
            return;
        };
        if slot.generation != generation {
            return;
        }

        slot.state.events = match std::mem::take(&mut slot.state.events) {
            RequestLifecycle::Pending => RequestLifecycle::Idle,
            RequestLifecycle::Refetching { data } => RequestLifecycle::Success { data },
            settled => settled,
        };
        debug!(
            workspace_id,
            generation,
            stage = slot.state.events.stage(),
            "fetch cancelled"
        );
    }
}

fn clear_slot(slot: &mut Slot) {
    slot.generation += 1;
    slot.state.cursor = None;
    slot.state.events = RequestLifecycle::Success {
        data: empty_list(),
    };
}

fn empty_list() -> EventList {
    Arc::from(Vec::new())
}

fn normalize_filter(filter_str: Option<&str>) -> Option<String> {
    filter_str.filter(|f| !f.is_empty()).map(str::to_string)
}
