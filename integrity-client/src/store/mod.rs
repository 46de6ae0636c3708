//! Client state stores and their composition root
//!
//! [`Dashboard`] owns the event bus, builds both stores, and runs the
//! background tasks that keep them consistent:
//! - a listener that re-applies map filter changes to the data store
//! - a periodic refresh of the data store
//!
//! Both tasks stop when the dashboard is shut down or dropped.

pub mod data_store;
pub mod map_store;

pub use data_store::{DataState, DataStore};
pub use map_store::{MapState, MapStore};

use integrity_common::events::{EventBus, FilterOrigin, IntegrityEvent};
use integrity_common::Filter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::InspectionApi;

/// Default event bus capacity
pub const EVENT_BUS_CAPACITY: usize = 100;

pub struct Dashboard {
    event_bus: EventBus,
    map: MapStore,
    data: DataStore,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Dashboard {
    pub fn new(api: Arc<dyn InspectionApi>) -> Self {
        Self::with_event_bus(api, EventBus::new(EVENT_BUS_CAPACITY))
    }

    pub fn with_event_bus(api: Arc<dyn InspectionApi>, event_bus: EventBus) -> Self {
        let map = MapStore::new(event_bus.clone());
        let data = DataStore::new(api, map.clone(), event_bus.clone());
        Self {
            event_bus,
            map,
            data,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn map(&self) -> &MapStore {
        &self.map
    }

    pub fn data(&self) -> &DataStore {
        &self.data
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty() && !self.cancel.is_cancelled()
    }

    /// Subscribe the data store to map filter changes
    ///
    /// The subscription exists when this returns, so filter changes made
    /// right after are not missed. Calling it twice has no effect.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let rx = self.event_bus.subscribe();
        self.tasks.push(tokio::spawn(run_filter_listener(
            rx,
            self.data.clone(),
            self.map.clone(),
            self.cancel.clone(),
        )));
        info!("Dashboard filter listener started");
    }

    /// Start the listener plus a periodic refresh every `period`
    ///
    /// The first refresh runs immediately.
    pub fn start_with_refresh(&mut self, period: Duration) {
        self.start();

        let data = self.data.clone();
        let cancel = self.cancel.clone();
        info!(period_secs = period.as_secs(), "Starting periodic refresh");

        self.tasks.push(tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = timer.tick() => {
                        if !data.refresh().await {
                            debug!("Periodic refresh failed");
                        }
                    }
                }
            }
            debug!("Periodic refresh stopped");
        }));
    }

    /// Stop background tasks and wait for them to finish
    ///
    /// An in-flight refresh is allowed to complete.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!("Dashboard task ended abnormally: {}", e);
            }
        }
        info!("Dashboard stopped");
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_filter_listener(
    mut rx: broadcast::Receiver<IntegrityEvent>,
    data: DataStore,
    map: MapStore,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = rx.recv() => event,
        };

        match event {
            Ok(IntegrityEvent::FilterChanged {
                filter,
                origin: FilterOrigin::MapStore,
                ..
            }) => {
                // Superseded: a later event carries the map's current filter
                if map.filter().await != filter {
                    debug!(filter = %Filter::describe(filter.as_ref()), "Skipping superseded map filter");
                    continue;
                }
                if let Err(e) = data.set_filter(filter).await {
                    warn!(error = %e, "Map filter rejected by data store, restoring map filter");
                    data.reconcile().await;
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Intermediate filters are irrelevant; the map's current one is what counts
                warn!(skipped, "Filter listener lagged, resyncing from map store");
                if let Err(e) = data.set_filter(map.filter().await).await {
                    warn!(error = %e, "Resync from map store failed");
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("Filter listener stopped");
}
