//! Map-interaction store
//!
//! Holds client-only interaction state: the active filter as seen by the
//! map, the highlighted marker and the last camera target. Filter changes
//! made here are broadcast as [`IntegrityEvent::FilterChanged`]; pushes
//! from the data store arrive through [`MapStore::sync_filter`] and are
//! never re-broadcast.

use integrity_common::events::{EventBus, FilterOrigin, IntegrityEvent};
use integrity_common::models::{GeoPoint, InspectionObject, ObjectId};
use integrity_common::{Filter, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::map::camera::{CameraFn, CameraMove, CameraRegistration, CameraSlot};

/// Snapshot of the map store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapState {
    pub filter: Option<Filter>,
    pub highlighted: Option<ObjectId>,
    pub camera_target: Option<GeoPoint>,
    /// Incremented on every state change
    pub revision: u64,
}

#[derive(Clone)]
pub struct MapStore {
    state: Arc<RwLock<MapState>>,
    camera: CameraSlot,
    event_bus: EventBus,
}

impl MapStore {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            state: Arc::new(RwLock::new(MapState::default())),
            camera: CameraSlot::new(),
            event_bus,
        }
    }

    pub async fn snapshot(&self) -> MapState {
        self.state.read().await.clone()
    }

    pub async fn filter(&self) -> Option<Filter> {
        self.state.read().await.filter.clone()
    }

    pub async fn highlighted(&self) -> Option<ObjectId> {
        self.state.read().await.highlighted
    }

    pub async fn revision(&self) -> u64 {
        self.state.read().await.revision
    }

    /// User changed the filter from the map
    ///
    /// Broadcasts `FilterChanged` when the value actually changed. Returns
    /// whether it did. An invalid filter is rejected before any state
    /// change.
    pub async fn set_filter(&self, filter: Option<Filter>) -> Result<bool> {
        let filter = Filter::normalize(filter);
        if let Some(f) = &filter {
            f.validate()?;
        }
        if !self.apply_filter(filter.clone()).await {
            return Ok(false);
        }

        debug!(filter = %Filter::describe(filter.as_ref()), "Map filter changed");
        self.event_bus.emit_lossy(IntegrityEvent::FilterChanged {
            filter,
            origin: FilterOrigin::MapStore,
            timestamp: chrono::Utc::now(),
        });
        Ok(true)
    }

    /// Direct push from the data store; never emits an event
    pub async fn sync_filter(&self, filter: Option<Filter>) -> bool {
        let filter = Filter::normalize(filter);
        let changed = self.apply_filter(filter.clone()).await;
        if changed {
            debug!(filter = %Filter::describe(filter.as_ref()), "Map filter synced from data store");
        }
        changed
    }

    /// Shared update path; value-equality guarded
    async fn apply_filter(&self, filter: Option<Filter>) -> bool {
        let mut state = self.state.write().await;
        if state.filter == filter {
            return false;
        }
        if filter.is_none() {
            state.highlighted = None;
        }
        state.filter = filter;
        state.revision += 1;
        true
    }

    /// Set or clear the highlighted marker
    pub async fn highlight(&self, object_id: Option<ObjectId>) {
        {
            let mut state = self.state.write().await;
            if state.highlighted == object_id {
                return;
            }
            state.highlighted = object_id;
            state.revision += 1;
        }
        self.event_bus.emit_lossy(IntegrityEvent::MarkerHighlighted {
            object_id,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Mount a map camera; see [`CameraSlot::register`]
    pub fn register_camera(&self, callback: CameraFn) -> CameraRegistration {
        self.camera.register(callback)
    }

    pub fn camera_mounted(&self) -> bool {
        self.camera.is_mounted()
    }

    /// Ask the map to fly to `point`
    ///
    /// `target` becomes the highlighted marker whether or not a map is
    /// mounted. Points that fail [`GeoPoint::checked`] never reach the
    /// camera. Returns true if the camera moved.
    pub async fn fly_to(&self, point: GeoPoint, target: Option<ObjectId>, duration: Duration) -> bool {
        if target.is_some() {
            self.highlight(target).await;
        }
        let Some(point) = GeoPoint::checked(point.lat, point.lon) else {
            debug!(lat = point.lat, lon = point.lon, "Unusable camera target, camera not moved");
            return false;
        };

        let moved = self.camera.request(&CameraMove {
            point,
            target,
            duration,
        });
        if moved {
            {
                let mut state = self.state.write().await;
                state.camera_target = Some(point);
                state.revision += 1;
            }
            self.event_bus.emit_lossy(IntegrityEvent::CameraMoved {
                object_id: target,
                lat: point.lat,
                lon: point.lon,
                timestamp: chrono::Utc::now(),
            });
        }
        moved
    }

    /// Fly to an object if it has a usable location
    ///
    /// Objects without one are still highlighted but never targeted.
    pub async fn fly_to_object(&self, object: &InspectionObject, duration: Duration) -> bool {
        match object.map_location() {
            Some(point) => self.fly_to(point, Some(object.id), duration).await,
            None => {
                debug!(object_id = object.id, "Object has no usable location, camera not moved");
                self.highlight(Some(object.id)).await;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::camera::DEFAULT_FLY_DURATION;
    use integrity_common::models::{LocationStatus, ObjectCategory, ObjectStatus};
    use std::sync::Mutex;

    fn object(id: ObjectId, lat: Option<f64>, lon: Option<f64>) -> InspectionObject {
        InspectionObject {
            id,
            name: format!("Object {}", id),
            category: ObjectCategory::PipelineSection,
            pipeline_id: Some("MT-01".to_string()),
            lat,
            lon,
            location_status: Some(LocationStatus::Verified),
            status: ObjectStatus::Normal,
            risk_level: None,
        }
    }

    #[tokio::test]
    async fn test_set_filter_emits_once() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let store = MapStore::new(bus);

        assert!(store.set_filter(Some(Filter::pipeline("MT-02"))).await.unwrap());
        assert!(!store.set_filter(Some(Filter::pipeline("MT-02"))).await.unwrap());

        assert_eq!(rx.try_recv().unwrap().event_type(), "FilterChanged");
        assert!(rx.try_recv().is_err());
        assert_eq!(store.revision().await, 1);
    }

    #[tokio::test]
    async fn test_empty_filter_is_none() {
        let store = MapStore::new(EventBus::new(4));
        assert!(!store.set_filter(Some(Filter::default())).await.unwrap());
        assert_eq!(store.filter().await, None);
    }

    #[tokio::test]
    async fn test_sync_filter_is_silent() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let store = MapStore::new(bus);

        assert!(store.sync_filter(Some(Filter::pipeline("MT-03"))).await);
        assert!(rx.try_recv().is_err());
        assert_eq!(store.filter().await, Some(Filter::pipeline("MT-03")));
    }

    #[tokio::test]
    async fn test_reset_clears_highlight() {
        let store = MapStore::new(EventBus::new(16));
        store.set_filter(Some(Filter::pipeline("MT-01"))).await.unwrap();
        store.highlight(Some(4)).await;

        store.set_filter(None).await.unwrap();
        assert_eq!(store.highlighted().await, None);
    }

    #[tokio::test]
    async fn test_fly_to_without_map_still_highlights() {
        let store = MapStore::new(EventBus::new(16));
        let point = GeoPoint::checked(47.1, 51.9).unwrap();

        assert!(!store.fly_to(point, Some(12), DEFAULT_FLY_DURATION).await);
        assert_eq!(store.highlighted().await, Some(12));
        assert_eq!(store.snapshot().await.camera_target, None);
    }

    #[tokio::test]
    async fn test_invalid_filter_is_rejected_without_broadcast() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let store = MapStore::new(bus);

        let inverted = Filter::pipeline("MT-01").with_dates(
            chrono::NaiveDate::from_ymd_opt(2024, 5, 1),
            chrono::NaiveDate::from_ymd_opt(2024, 4, 1),
        );
        assert!(matches!(
            store.set_filter(Some(inverted)).await,
            Err(integrity_common::Error::Validation(_))
        ));
        assert_eq!(store.filter().await, None);
        assert_eq!(store.revision().await, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fly_to_rejects_unchecked_points() {
        let store = MapStore::new(EventBus::new(16));
        let moves = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&moves);
        let _reg = store.register_camera(Arc::new(move |m: &CameraMove| {
            sink.lock().unwrap().push(m.point);
        }));

        for (lat, lon) in [(f64::NAN, 0.0), (0.0, 0.0), (51.1, f64::INFINITY), (95.0, 71.0)] {
            assert!(!store.fly_to(GeoPoint { lat, lon }, Some(9), DEFAULT_FLY_DURATION).await);
        }
        assert!(moves.lock().unwrap().is_empty());
        assert_eq!(store.highlighted().await, Some(9));
        assert_eq!(store.snapshot().await.camera_target, None);
    }

    #[tokio::test]
    async fn test_fly_to_object_skips_invalid_locations() {
        let store = MapStore::new(EventBus::new(16));
        let moves = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&moves);
        let _reg = store.register_camera(Arc::new(move |m: &CameraMove| {
            sink.lock().unwrap().push(m.target);
        }));

        assert!(!store.fly_to_object(&object(1, None, Some(71.0)), DEFAULT_FLY_DURATION).await);
        assert!(!store.fly_to_object(&object(2, Some(0.0), Some(71.0)), DEFAULT_FLY_DURATION).await);
        assert!(!store.fly_to_object(&object(3, Some(f64::NAN), Some(71.0)), DEFAULT_FLY_DURATION).await);

        let mut pending = object(4, Some(51.1), Some(71.4));
        pending.location_status = Some(LocationStatus::Pending);
        assert!(!store.fly_to_object(&pending, DEFAULT_FLY_DURATION).await);

        assert!(store.fly_to_object(&object(5, Some(51.1), Some(71.4)), DEFAULT_FLY_DURATION).await);

        assert_eq!(*moves.lock().unwrap(), vec![Some(5)]);
        assert_eq!(store.highlighted().await, Some(5));
    }
}
