//! Map view-model
//!
//! A [`MapView`] is the Rust counterpart of a mounted map widget: while it
//! is alive it owns the marker registry and the camera registration in the
//! map store. Dropping it unmounts both.

pub mod camera;
pub mod markers;

pub use camera::{CameraMove, CameraSlot, DEFAULT_FLY_DURATION};
pub use markers::{
    build_markers, cluster_markers, permit_document_path, pipeline_polylines, Cluster, Marker,
    MarkerRegistry, MarkerStyle, Polyline, Popup,
};

use integrity_common::models::{InspectionObject, ObjectId};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::store::MapStore;
use camera::CameraRegistration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct MapView {
    registry: Arc<Mutex<MarkerRegistry>>,
    last_move: Arc<Mutex<Option<CameraMove>>>,
    polylines: Vec<Polyline>,
    _camera: CameraRegistration,
}

impl MapView {
    /// Mount a view over `objects` and register its camera with `store`
    pub fn mount(store: &MapStore, objects: &[InspectionObject]) -> Self {
        let registry = Arc::new(Mutex::new(MarkerRegistry::new()));
        let last_move = Arc::new(Mutex::new(None));

        let cb_registry = Arc::clone(&registry);
        let cb_last_move = Arc::clone(&last_move);
        let registration = store.register_camera(Arc::new(move |m: &CameraMove| {
            *lock(&cb_last_move) = Some(m.clone());
            if let Some(target) = m.target {
                if !lock(&cb_registry).open_popup(target) {
                    tracing::debug!(object_id = target, "Camera target has no marker in this view");
                }
            }
        }));

        let mut view = Self {
            registry,
            last_move,
            polylines: Vec::new(),
            _camera: registration,
        };
        view.update(objects);
        view
    }

    /// Replace the displayed objects
    ///
    /// The open popup survives if its object is still shown.
    pub fn update(&mut self, objects: &[InspectionObject]) {
        let markers = build_markers(objects);
        self.polylines = pipeline_polylines(objects);

        let mut registry = lock(&self.registry);
        let open = registry.open_popup_id();
        registry.clear();
        for marker in markers {
            registry.register(marker);
        }
        if let Some(id) = open {
            registry.open_popup(id);
        }
        tracing::debug!(
            markers = registry.len(),
            polylines = self.polylines.len(),
            skipped = objects.len() - registry.len(),
            "Map view updated"
        );
    }

    /// Markers ordered by object id
    pub fn markers(&self) -> Vec<Marker> {
        let registry = lock(&self.registry);
        registry
            .object_ids()
            .into_iter()
            .filter_map(|id| registry.lookup(id).cloned())
            .collect()
    }

    pub fn marker(&self, object_id: ObjectId) -> Option<Marker> {
        lock(&self.registry).lookup(object_id).cloned()
    }

    pub fn polylines(&self) -> &[Polyline] {
        &self.polylines
    }

    pub fn clusters(&self, cell_deg: f64) -> Vec<Cluster> {
        cluster_markers(&self.markers(), cell_deg)
    }

    pub fn open_popup(&self) -> Option<ObjectId> {
        lock(&self.registry).open_popup_id()
    }

    pub fn close_popup(&self) {
        lock(&self.registry).close_popup();
    }

    pub fn last_camera_move(&self) -> Option<CameraMove> {
        lock(&self.last_move).clone()
    }
}

impl Drop for MapView {
    fn drop(&mut self) {
        lock(&self.registry).clear();
    }
}
