//! Marker, polyline and cluster view-models

use integrity_common::models::{GeoPoint, InspectionObject, ObjectId, RiskLevel};
use std::collections::{BTreeMap, HashMap};

/// Path of the printable work-permit document for an object
pub fn permit_document_path(object_id: ObjectId) -> String {
    format!("/print/work-permit/{}", object_id)
}

/// Visual style of a point marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerStyle {
    /// CSS hex colour
    pub color: &'static str,
    /// Radius in pixels
    pub radius: u32,
}

impl MarkerStyle {
    pub const HIGH: MarkerStyle = MarkerStyle { color: "#dc2626", radius: 10 };
    pub const MEDIUM: MarkerStyle = MarkerStyle { color: "#f59e0b", radius: 8 };
    pub const NORMAL: MarkerStyle = MarkerStyle { color: "#16a34a", radius: 6 };

    /// Style by ML risk, falling back to derived status
    pub fn for_object(object: &InspectionObject) -> MarkerStyle {
        match object.risk_level {
            Some(RiskLevel::High) => Self::HIGH,
            Some(RiskLevel::Medium) => Self::MEDIUM,
            Some(RiskLevel::Normal) => Self::NORMAL,
            None if object.is_critical() => Self::HIGH,
            None => Self::NORMAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub title: String,
    pub lines: Vec<String>,
    pub permit_link: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub object_id: ObjectId,
    pub point: GeoPoint,
    pub style: MarkerStyle,
    pub popup: Popup,
}

impl Marker {
    /// `None` when the object has no usable location
    pub fn for_object(object: &InspectionObject) -> Option<Marker> {
        let point = object.map_location()?;
        let mut lines = vec![format!("Type: {}", object.category.label())];
        if let Some(pipeline) = &object.pipeline_id {
            lines.push(format!("Pipeline: {}", pipeline));
        }
        lines.push(format!(
            "Risk: {}",
            object.risk_level.map(|r| r.label()).unwrap_or("-")
        ));
        lines.push(format!("Coordinates: {:.5}, {:.5}", point.lat, point.lon));

        Some(Marker {
            object_id: object.id,
            point,
            style: MarkerStyle::for_object(object),
            popup: Popup {
                title: object.name.clone(),
                lines,
                permit_link: permit_document_path(object.id),
            },
        })
    }
}

/// Markers for every object that can be placed on the map
pub fn build_markers(objects: &[InspectionObject]) -> Vec<Marker> {
    objects.iter().filter_map(Marker::for_object).collect()
}

/// Line joining the located objects of one pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub pipeline_id: String,
    pub points: Vec<GeoPoint>,
}

/// One polyline per pipeline with at least two located objects,
/// points ordered by object id
pub fn pipeline_polylines(objects: &[InspectionObject]) -> Vec<Polyline> {
    let mut by_pipeline: BTreeMap<&str, Vec<(ObjectId, GeoPoint)>> = BTreeMap::new();
    for object in objects {
        if let (Some(pipeline), Some(point)) = (object.pipeline_id.as_deref(), object.map_location()) {
            by_pipeline.entry(pipeline).or_default().push((object.id, point));
        }
    }

    by_pipeline
        .into_iter()
        .filter(|(_, points)| points.len() >= 2)
        .map(|(pipeline, mut points)| {
            points.sort_by_key(|(id, _)| *id);
            Polyline {
                pipeline_id: pipeline.to_string(),
                points: points.into_iter().map(|(_, p)| p).collect(),
            }
        })
        .collect()
}

/// Markers grouped into one grid cell
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Mean position of the members
    pub center: GeoPoint,
    pub object_ids: Vec<ObjectId>,
    /// Style of the most severe member
    pub style: MarkerStyle,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.object_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_ids.is_empty()
    }
}

fn severity(style: MarkerStyle) -> u8 {
    if style == MarkerStyle::HIGH {
        2
    } else if style == MarkerStyle::MEDIUM {
        1
    } else {
        0
    }
}

/// Grid clustering with square cells of `cell_deg` degrees
///
/// Clusters are returned ordered by cell (south-west first); members keep
/// input order.
pub fn cluster_markers(markers: &[Marker], cell_deg: f64) -> Vec<Cluster> {
    if !(cell_deg.is_finite() && cell_deg > 0.0) {
        return markers
            .iter()
            .map(|m| Cluster {
                center: m.point,
                object_ids: vec![m.object_id],
                style: m.style,
            })
            .collect();
    }

    let mut cells: BTreeMap<(i64, i64), Vec<&Marker>> = BTreeMap::new();
    for marker in markers {
        let key = (
            (marker.point.lat / cell_deg).floor() as i64,
            (marker.point.lon / cell_deg).floor() as i64,
        );
        cells.entry(key).or_default().push(marker);
    }

    cells
        .into_values()
        .map(|members| {
            let n = members.len() as f64;
            let lat = members.iter().map(|m| m.point.lat).sum::<f64>() / n;
            let lon = members.iter().map(|m| m.point.lon).sum::<f64>() / n;
            let style = members
                .iter()
                .map(|m| m.style)
                .max_by_key(|s| severity(*s))
                .unwrap_or(MarkerStyle::NORMAL);
            Cluster {
                center: GeoPoint { lat, lon },
                object_ids: members.iter().map(|m| m.object_id).collect(),
                style,
            }
        })
        .collect()
}

/// Markers currently shown by a map view, keyed by object
///
/// Owned by one [`MapView`](super::MapView) and cleared when it is dropped.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    markers: HashMap<ObjectId, Marker>,
    open_popup: Option<ObjectId>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the marker previously registered for the same object
    pub fn register(&mut self, marker: Marker) -> Option<Marker> {
        self.markers.insert(marker.object_id, marker)
    }

    pub fn unregister(&mut self, object_id: ObjectId) -> Option<Marker> {
        if self.open_popup == Some(object_id) {
            self.open_popup = None;
        }
        self.markers.remove(&object_id)
    }

    pub fn lookup(&self, object_id: ObjectId) -> Option<&Marker> {
        self.markers.get(&object_id)
    }

    /// Open the popup of a registered marker, closing any other
    pub fn open_popup(&mut self, object_id: ObjectId) -> bool {
        if self.markers.contains_key(&object_id) {
            self.open_popup = Some(object_id);
            true
        } else {
            false
        }
    }

    pub fn close_popup(&mut self) {
        self.open_popup = None;
    }

    /// Registered object ids, ascending
    pub fn object_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.markers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn open_popup_id(&self) -> Option<ObjectId> {
        self.open_popup
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn clear(&mut self) {
        self.markers.clear();
        self.open_popup = None;
    }
}
