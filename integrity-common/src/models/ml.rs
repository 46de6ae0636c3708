//! Risk-model status and monitoring from `/api/ml/*`
//!
//! Read-only: training and tuning stay on the backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Labeled samples the backend needs before training is worthwhile
pub const MIN_LABELED_SAMPLES: u64 = 100;

/// `GET /api/ml/status`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MlStatus {
    pub is_trained: bool,
    #[serde(default)]
    pub model_type: String,
    #[serde(default)]
    pub labeled_samples: u64,
    #[serde(default)]
    pub total_samples: u64,
    #[serde(default)]
    pub mlflow_run_id: Option<String>,
    /// Backend-defined training metrics, passed through as-is
    #[serde(default)]
    pub training_metrics: Option<serde_json::Value>,
}

impl MlStatus {
    pub fn has_enough_labels(&self) -> bool {
        self.labeled_samples >= MIN_LABELED_SAMPLES
    }
}

/// Rough label-balance verdict computed by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyEstimate {
    Low,
    Medium,
    Good,
}

/// `GET /api/ml/monitor/metrics`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MlMetrics {
    pub model_trained: bool,
    pub total_diagnostics: u64,
    #[serde(default)]
    pub with_ml_label: u64,
    #[serde(default)]
    pub without_ml_label: u64,
    /// Label (`normal`, `medium`, `high`) to count
    #[serde(default)]
    pub predictions_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub accuracy_estimate: Option<AccuracyEstimate>,
    /// Labeled diagnostics dated within the last 7 days
    #[serde(default)]
    pub recent_predictions: u64,
    #[serde(default)]
    pub method_distribution: BTreeMap<String, u64>,
    /// Percent of diagnostics with a defect
    #[serde(default)]
    pub defect_rate: f64,
}

impl MlMetrics {
    /// Share of labeled diagnostics predicted `high`, in percent
    pub fn high_share(&self) -> Option<f64> {
        let total: u64 = self.predictions_distribution.values().sum();
        if total == 0 {
            return None;
        }
        let high = self.predictions_distribution.get("high").copied().unwrap_or(0);
        Some(high as f64 * 100.0 / total as f64)
    }
}

/// One drift check; every field is optional because the backend answers
/// with a short message when data is insufficient and `error` on failure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DriftCheck {
    #[serde(default)]
    pub drift_detected: Option<bool>,
    #[serde(default)]
    pub drift_score: Option<f64>,
    #[serde(default)]
    pub reference_samples: Option<u64>,
    #[serde(default)]
    pub current_samples: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DriftCheck {
    pub fn summary(&self) -> String {
        if let Some(err) = &self.error {
            return format!("check failed: {}", err);
        }
        match (self.drift_detected, self.drift_score) {
            (Some(true), Some(score)) => format!("drift detected (score {:.4})", score),
            (Some(true), None) => "drift detected".to_string(),
            (Some(false), Some(score)) => format!("no drift (score {:.4})", score),
            _ => self.message.clone().unwrap_or_else(|| "no drift".to_string()),
        }
    }
}

/// `GET /api/ml/drift`; a side is `None` when the backend cannot run it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MlDrift {
    #[serde(default)]
    pub data_drift: Option<DriftCheck>,
    #[serde(default)]
    pub target_drift: Option<DriftCheck>,
}

impl MlDrift {
    pub fn drift_detected(&self) -> bool {
        [&self.data_drift, &self.target_drift]
            .into_iter()
            .flatten()
            .any(|c| c.drift_detected == Some(true))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlSuggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: SuggestionPriority,
    pub message: String,
    #[serde(default)]
    pub action: Option<String>,
}

/// `GET /api/ml/monitor/suggestions`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MlSuggestions {
    #[serde(default)]
    pub metrics: Option<MlMetrics>,
    #[serde(default)]
    pub suggestions: Vec<MlSuggestion>,
}

impl MlSuggestions {
    /// Suggestions, most urgent first
    pub fn by_priority(&self) -> Vec<&MlSuggestion> {
        let mut out: Vec<&MlSuggestion> = self.suggestions.iter().collect();
        out.sort_by_key(|s| s.priority);
        out
    }
}
