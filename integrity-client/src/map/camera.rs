//! Camera registration slot
//!
//! Widgets may ask the map to move before any map view exists. The slot
//! holds at most one camera-move callback supplied by the mounted view;
//! requests made while the slot is empty are dropped silently.

use integrity_common::models::{GeoPoint, ObjectId};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Default fly-to animation length
pub const DEFAULT_FLY_DURATION: Duration = Duration::from_millis(1500);

/// One camera-move request
#[derive(Debug, Clone, PartialEq)]
pub struct CameraMove {
    pub point: GeoPoint,
    /// Object to open a popup for after the move
    pub target: Option<ObjectId>,
    pub duration: Duration,
}

/// Callback supplied by a mounted map view
pub type CameraFn = Arc<dyn Fn(&CameraMove) + Send + Sync>;

#[derive(Default)]
struct SlotInner {
    next_id: u64,
    active: Option<(u64, CameraFn)>,
}

/// Holds the camera callback of the currently mounted map, if any
#[derive(Clone, Default)]
pub struct CameraSlot {
    inner: Arc<Mutex<SlotInner>>,
}

impl CameraSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        // A panicking callback never runs under the lock, so poisoning carries no torn state
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Install `callback`, replacing any previous registration
    ///
    /// The slot is cleared when the returned guard drops, unless a newer
    /// registration has replaced it in the meantime.
    pub fn register(&self, callback: CameraFn) -> CameraRegistration {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        if inner.active.is_some() {
            tracing::debug!(registration = id, "Replacing camera registration");
        }
        inner.active = Some((id, callback));
        CameraRegistration {
            slot: self.clone(),
            id,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Forward a move to the mounted map
    ///
    /// Returns false (and does nothing) when no map is mounted.
    pub fn request(&self, camera_move: &CameraMove) -> bool {
        let callback = self.lock().active.as_ref().map(|(_, f)| Arc::clone(f));
        match callback {
            Some(f) => {
                f(camera_move);
                true
            }
            None => {
                tracing::trace!(target_id = ?camera_move.target, "No map mounted, camera move dropped");
                false
            }
        }
    }

    fn release(&self, id: u64) {
        let mut inner = self.lock();
        if matches!(inner.active, Some((active, _)) if active == id) {
            inner.active = None;
        }
    }
}

/// Scoped camera registration; unregisters on drop
#[must_use = "dropping the registration unmounts the camera immediately"]
pub struct CameraRegistration {
    slot: CameraSlot,
    id: u64,
}

impl Drop for CameraRegistration {
    fn drop(&mut self) {
        self.slot.release(self.id);
    }
}
