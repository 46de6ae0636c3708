//! Inspection objects as served by `GET /api/objects`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Object identifier visible to users (the `object_id` column of the import files)
pub type ObjectId = i64;

/// Equipment category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectCategory {
    Crane,
    Compressor,
    PipelineSection,
    #[serde(other)]
    Unknown,
}

impl ObjectCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ObjectCategory::Crane => "Crane",
            ObjectCategory::Compressor => "Compressor",
            ObjectCategory::PipelineSection => "Pipeline section",
            ObjectCategory::Unknown => "Unknown",
        }
    }
}

/// Derived status: Critical when the latest diagnostic found a defect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectStatus {
    Normal,
    Critical,
}

/// Whether the object's coordinates can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    /// Auto-created during import, coordinates not set yet
    Pending,
    Verified,
    NeedsUpdate,
}

/// ML risk classification label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Normal,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Normal => "normal",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Normal => "Normal",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(RiskLevel::Normal),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(Error::Validation(format!("Unknown risk level: {}", other))),
        }
    }
}

/// A coordinate that is safe to render or fly to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Build a point, rejecting sentinel values
    ///
    /// Missing, NaN, infinite, zero and out-of-range coordinates are all
    /// treated as "no location".
    pub fn checked(lat: f64, lon: f64) -> Option<GeoPoint> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        if lat == 0.0 || lon == 0.0 {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(GeoPoint { lat, lon })
    }
}

/// Inspection object (equipment item) with its derived status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionObject {
    pub id: ObjectId,
    pub name: String,
    #[serde(rename = "type")]
    pub category: ObjectCategory,
    #[serde(default)]
    pub pipeline_id: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub location_status: Option<LocationStatus>,
    pub status: ObjectStatus,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
}

impl InspectionObject {
    /// The only accessor that may be used to place an object on the map
    pub fn map_location(&self) -> Option<GeoPoint> {
        if self.location_status == Some(LocationStatus::Pending) {
            return None;
        }
        GeoPoint::checked(self.lat?, self.lon?)
    }

    pub fn is_critical(&self) -> bool {
        self.status == ObjectStatus::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(lat: Option<f64>, lon: Option<f64>, location_status: Option<LocationStatus>) -> InspectionObject {
        InspectionObject {
            id: 7,
            name: "Crane 7".to_string(),
            category: ObjectCategory::Crane,
            pipeline_id: Some("MT-01".to_string()),
            lat,
            lon,
            location_status,
            status: ObjectStatus::Normal,
            risk_level: None,
        }
    }

    #[test]
    fn test_valid_location() {
        let obj = object(Some(51.12), Some(71.43), Some(LocationStatus::Verified));
        assert_eq!(obj.map_location(), Some(GeoPoint { lat: 51.12, lon: 71.43 }));
    }

    #[test]
    fn test_sentinel_locations_rejected() {
        assert!(object(None, Some(71.0), None).map_location().is_none());
        assert!(object(Some(51.0), None, None).map_location().is_none());
        assert!(object(Some(0.0), Some(0.0), None).map_location().is_none());
        assert!(object(Some(51.0), Some(0.0), None).map_location().is_none());
        assert!(object(Some(f64::NAN), Some(71.0), None).map_location().is_none());
        assert!(object(Some(95.0), Some(71.0), None).map_location().is_none());
        assert!(object(Some(51.0), Some(71.0), Some(LocationStatus::Pending))
            .map_location()
            .is_none());
    }

    #[test]
    fn test_deserialize_list_item() {
        let json = r#"{
            "id": 12, "name": "Compressor A", "type": "compressor",
            "lat": 47.1, "lon": 51.9, "status": "Critical",
            "pipeline_id": "MT-02", "location_status": "verified", "risk_level": "high"
        }"#;
        let obj: InspectionObject = serde_json::from_str(json).unwrap();
        assert_eq!(obj.category, ObjectCategory::Compressor);
        assert_eq!(obj.risk_level, Some(RiskLevel::High));
        assert!(obj.is_critical());
    }

    #[test]
    fn test_deserialize_unknown_category_and_nulls() {
        let json = r#"{"id": 3, "name": "X", "type": "valve", "lat": null, "lon": null, "status": "Normal"}"#;
        let obj: InspectionObject = serde_json::from_str(json).unwrap();
        assert_eq!(obj.category, ObjectCategory::Unknown);
        assert!(obj.map_location().is_none());
    }

    #[test]
    fn test_risk_level_parse_and_order() {
        assert_eq!("HIGH".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert!("severe".parse::<RiskLevel>().is_err());
        assert!(RiskLevel::High > RiskLevel::Medium);
        assert!(RiskLevel::Medium > RiskLevel::Normal);
    }
}
