//! Aggregate statistics from `/api/analytics/*`

use serde::{Deserialize, Serialize};

use super::object::{ObjectCategory, ObjectId, RiskLevel};

/// Counts of diagnostics per ML label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CriticalityCounts {
    pub high: u64,
    pub medium: u64,
    pub normal: u64,
}

impl CriticalityCounts {
    pub fn total(&self) -> u64 {
        self.high + self.medium + self.normal
    }
}

/// Trend direction against the previous 30-day window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trend {
    #[serde(default)]
    pub direction: Option<TrendDirection>,
    /// Preformatted change, e.g. `"12.5%"`
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trends {
    #[serde(default)]
    pub defects: Trend,
    #[serde(default)]
    pub diagnostics: Trend,
}

/// `GET /api/analytics/stats-summary`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_objects: u64,
    pub total_diagnostics: u64,
    pub total_defects: u64,
    #[serde(default)]
    pub active_defects: u64,
    #[serde(default)]
    pub defects_percentage: f64,
    #[serde(default)]
    pub repairs_this_year: u64,
    #[serde(default)]
    pub criticality: CriticalityCounts,
    #[serde(default)]
    pub trends: Trends,
}

/// `GET /api/analytics/top-risks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopRiskObject {
    pub object_id: ObjectId,
    pub object_name: String,
    pub object_type: ObjectCategory,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    pub high_defects_count: u64,
}

/// `GET /api/analytics/methods-distribution`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDistribution {
    pub method: String,
    pub total: u64,
    pub defects: u64,
    pub percentage: f64,
}

/// `GET /api/analytics/criticality-distribution`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalityShare {
    pub label: RiskLevel,
    pub count: u64,
    #[serde(default)]
    pub percentage: f64,
}

/// `GET /api/analytics/defects-timeline`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectsTimelineItem {
    pub year: i32,
    pub total: u64,
    pub defects: u64,
    pub percentage: f64,
}
