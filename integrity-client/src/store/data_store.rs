//! Data store: cached objects and statistics for the active filter
//!
//! The cache is only ever replaced wholesale after a successful fetch.
//! Concurrent refreshes are not serialized; whichever completes last wins.

use chrono::{DateTime, Utc};
use integrity_common::events::{EventBus, IntegrityEvent};
use integrity_common::models::{InspectionObject, StatsSummary};
use integrity_common::{Filter, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::map_store::MapStore;
use crate::api::InspectionApi;

/// Snapshot of the data store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataState {
    pub objects: Vec<InspectionObject>,
    pub stats: Option<StatsSummary>,
    pub filter: Option<Filter>,
    /// True while at least one refresh is in flight
    pub loading: bool,
    /// Inline message from the last failed refresh
    pub error: Option<String>,
    pub last_synced: Option<DateTime<Utc>>,
    /// Incremented on every state change
    pub revision: u64,
    in_flight: usize,
}

#[derive(Clone)]
pub struct DataStore {
    api: Arc<dyn InspectionApi>,
    state: Arc<RwLock<DataState>>,
    map: MapStore,
    event_bus: EventBus,
}

impl DataStore {
    pub fn new(api: Arc<dyn InspectionApi>, map: MapStore, event_bus: EventBus) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(DataState::default())),
            map,
            event_bus,
        }
    }

    pub async fn snapshot(&self) -> DataState {
        self.state.read().await.clone()
    }

    pub async fn filter(&self) -> Option<Filter> {
        self.state.read().await.filter.clone()
    }

    pub async fn revision(&self) -> u64 {
        self.state.read().await.revision
    }

    /// Apply a filter and re-fetch
    ///
    /// A value-equal filter is ignored. An invalid filter (inverted range)
    /// is rejected without touching the current one. Returns whether the
    /// filter changed; fetch failures are recorded in the state, not
    /// returned.
    pub async fn set_filter(&self, filter: Option<Filter>) -> Result<bool> {
        let filter = Filter::normalize(filter);
        if let Some(f) = &filter {
            if let Err(e) = f.validate() {
                let mut state = self.state.write().await;
                state.error = Some(e.user_message());
                state.revision += 1;
                return Err(e);
            }
        }

        {
            let mut state = self.state.write().await;
            if state.filter == filter {
                return Ok(false);
            }
            state.filter = filter.clone();
            state.revision += 1;
        }

        info!(filter = %Filter::describe(filter.as_ref()), "Data filter changed");
        self.reconcile().await;
        self.refresh().await;
        Ok(true)
    }

    /// Push the current filter into the map store if they differ
    pub async fn reconcile(&self) -> bool {
        let filter = self.filter().await;
        if self.map.filter().await == filter {
            return false;
        }
        self.map.sync_filter(filter).await
    }

    /// Re-fetch objects and stats for the current filter
    ///
    /// Returns true on success. On failure the previous data and filter are
    /// kept and an inline error is recorded.
    pub async fn refresh(&self) -> bool {
        let filter = {
            let mut state = self.state.write().await;
            state.in_flight += 1;
            state.loading = true;
            state.revision += 1;
            state.filter.clone()
        };

        debug!(filter = %Filter::describe(filter.as_ref()), "Refreshing dashboard data");
        let (objects, stats) = tokio::join!(
            self.api.list_objects(filter.as_ref()),
            self.api.stats_summary()
        );

        let outcome = objects.and_then(|o| stats.map(|s| (o, s)));

        let mut state = self.state.write().await;
        state.in_flight = state.in_flight.saturating_sub(1);
        state.loading = state.in_flight > 0;
        state.revision += 1;

        match outcome {
            Ok((objects, stats)) => {
                let object_count = objects.len();
                state.objects = objects;
                state.stats = Some(stats);
                state.error = None;
                state.last_synced = Some(Utc::now());
                drop(state);

                debug!(object_count, "Dashboard data replaced");
                self.event_bus.emit_lossy(IntegrityEvent::DataRefreshed {
                    object_count,
                    filter,
                    timestamp: Utc::now(),
                });
                true
            }
            Err(e) => {
                let message = e.user_message();
                state.error = Some(message.clone());
                drop(state);

                warn!(error = %e, "Dashboard refresh failed, keeping stale data");
                self.event_bus.emit_lossy(IntegrityEvent::RefreshFailed {
                    message,
                    timestamp: Utc::now(),
                });
                false
            }
        }
    }

    /// Objects that may be placed on the map
    pub async fn located_objects(&self) -> Vec<InspectionObject> {
        self.state
            .read()
            .await
            .objects
            .iter()
            .filter(|o| o.map_location().is_some())
            .cloned()
            .collect()
    }
}
