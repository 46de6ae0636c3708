//! Import endpoint results (`POST /api/import/upload`)

use serde::{Deserialize, Serialize};

/// Per-import statistics reported by the backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportStats {
    pub success: bool,
    #[serde(default)]
    pub pipelines_imported: u64,
    #[serde(default)]
    pub objects_imported: u64,
    #[serde(default)]
    pub objects_auto_created: u64,
    #[serde(default)]
    pub objects_skipped: u64,
    #[serde(default)]
    pub diagnostics_imported: u64,
    #[serde(default)]
    pub diagnostics_skipped: u64,
    #[serde(default)]
    pub ml_predictions_made: u64,
    #[serde(default)]
    pub errors: Vec<String>,
    /// Top-level failure reason when `success` is false
    #[serde(default)]
    pub error: Option<String>,
}

impl ImportStats {
    /// One-line summary for the import page
    pub fn summary(&self) -> String {
        format!(
            "{} objects ({} auto-created, {} skipped), {} diagnostics ({} skipped), {} ML predictions",
            self.objects_imported,
            self.objects_auto_created,
            self.objects_skipped,
            self.diagnostics_imported,
            self.diagnostics_skipped,
            self.ml_predictions_made
        )
    }
}

/// Template kinds offered by `GET /api/import/template/{kind}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Objects,
    Diagnostics,
    Both,
}

impl TemplateKind {
    pub fn path_segment(&self) -> &'static str {
        match self {
            TemplateKind::Objects => "objects",
            TemplateKind::Diagnostics => "diagnostics",
            TemplateKind::Both => "both",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let stats = ImportStats {
            success: true,
            objects_imported: 20,
            objects_auto_created: 3,
            diagnostics_imported: 150,
            diagnostics_skipped: 2,
            ml_predictions_made: 148,
            ..Default::default()
        };
        assert_eq!(
            stats.summary(),
            "20 objects (3 auto-created, 0 skipped), 150 diagnostics (2 skipped), 148 ML predictions"
        );
    }

    #[test]
    fn test_failed_import_deserialize() {
        let json = r#"{"success": false, "error": "Missing column object_id", "errors": []}"#;
        let stats: ImportStats = serde_json::from_str(json).unwrap();
        assert!(!stats.success);
        assert_eq!(stats.error.as_deref(), Some("Missing column object_id"));
    }
}
