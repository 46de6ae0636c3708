//! Diagnostic records as served by `GET /api/diagnostics/{object_id}`

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::object::{ObjectId, RiskLevel};
use crate::Error;

/// Inspection method
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticMethod {
    VIK,
    PVK,
    MPK,
    UZK,
    RGK,
    TVK,
    VIBRO,
    MFL,
    TFI,
    GEO,
    UTWM,
    UT,
    EC,
}

impl DiagnosticMethod {
    pub const ALL: [DiagnosticMethod; 13] = [
        DiagnosticMethod::VIK,
        DiagnosticMethod::PVK,
        DiagnosticMethod::MPK,
        DiagnosticMethod::UZK,
        DiagnosticMethod::RGK,
        DiagnosticMethod::TVK,
        DiagnosticMethod::VIBRO,
        DiagnosticMethod::MFL,
        DiagnosticMethod::TFI,
        DiagnosticMethod::GEO,
        DiagnosticMethod::UTWM,
        DiagnosticMethod::UT,
        DiagnosticMethod::EC,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticMethod::VIK => "VIK",
            DiagnosticMethod::PVK => "PVK",
            DiagnosticMethod::MPK => "MPK",
            DiagnosticMethod::UZK => "UZK",
            DiagnosticMethod::RGK => "RGK",
            DiagnosticMethod::TVK => "TVK",
            DiagnosticMethod::VIBRO => "VIBRO",
            DiagnosticMethod::MFL => "MFL",
            DiagnosticMethod::TFI => "TFI",
            DiagnosticMethod::GEO => "GEO",
            DiagnosticMethod::UTWM => "UTWM",
            DiagnosticMethod::UT => "UT",
            DiagnosticMethod::EC => "EC",
        }
    }

    /// Human-readable method name
    pub fn label(&self) -> &'static str {
        match self {
            DiagnosticMethod::VIK => "Visual and measuring",
            DiagnosticMethod::PVK => "Penetrant testing",
            DiagnosticMethod::MPK => "Magnetic particle",
            DiagnosticMethod::UZK => "Ultrasonic flaw detection",
            DiagnosticMethod::RGK => "Radiographic",
            DiagnosticMethod::TVK => "Television inspection",
            DiagnosticMethod::VIBRO => "Vibration diagnostics",
            DiagnosticMethod::MFL => "Magnetic flux leakage",
            DiagnosticMethod::TFI => "Transverse field inspection",
            DiagnosticMethod::GEO => "Geometry survey",
            DiagnosticMethod::UTWM => "Ultrasonic wall thickness",
            DiagnosticMethod::UT => "Ultrasonic",
            DiagnosticMethod::EC => "Eddy current",
        }
    }
}

impl fmt::Display for DiagnosticMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DiagnosticMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        DiagnosticMethod::ALL
            .iter()
            .copied()
            .find(|m| m.code() == upper)
            .ok_or_else(|| Error::Validation(format!("Unknown diagnostic method: {}", s)))
    }
}

/// Quality grade assigned by the inspector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityGrade {
    #[serde(rename = "удовлетворительно")]
    Satisfactory,
    #[serde(rename = "допустимо")]
    Acceptable,
    #[serde(rename = "требует_мер")]
    ActionRequired,
    #[serde(rename = "недопустимо")]
    Unacceptable,
}

impl QualityGrade {
    pub fn label(&self) -> &'static str {
        match self {
            QualityGrade::Satisfactory => "Satisfactory",
            QualityGrade::Acceptable => "Acceptable",
            QualityGrade::ActionRequired => "Action required",
            QualityGrade::Unacceptable => "Unacceptable",
        }
    }
}

/// Class probabilities reported by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MlProbabilities {
    pub normal: f64,
    pub medium: f64,
    pub high: f64,
}

/// One inspection of one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub diag_id: i64,
    pub object_id: ObjectId,
    pub method: DiagnosticMethod,
    pub date: NaiveDate,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub illumination: Option<f64>,
    pub defect_found: bool,
    #[serde(default)]
    pub defect_description: Option<String>,
    #[serde(default)]
    pub quality_grade: Option<QualityGrade>,
    #[serde(default)]
    pub param1: Option<f64>,
    #[serde(default)]
    pub param2: Option<f64>,
    #[serde(default)]
    pub param3: Option<f64>,
    #[serde(default)]
    pub ml_label: Option<RiskLevel>,
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub ml_probabilities: Option<MlProbabilities>,
}

impl DiagnosticRecord {
    /// Measurement parameters in column order
    pub fn params(&self) -> [Option<f64>; 3] {
        [self.param1, self.param2, self.param3]
    }
}

/// Response of `POST /api/diagnostics/mark-fixed/{object_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkFixedOutcome {
    pub message: String,
    pub object_id: ObjectId,
    #[serde(default)]
    pub diagnostic_id: Option<i64>,
    #[serde(default)]
    pub new_status: Option<String>,
    #[serde(default)]
    pub current_status: Option<String>,
}

impl MarkFixedOutcome {
    /// False when the object had no active defect and nothing was recorded
    pub fn recorded(&self) -> bool {
        self.diagnostic_id.is_some()
    }
}
