//! CSV/XLSX import client
//!
//! The client never parses the files. It checks the selection, uploads the
//! raw bytes and reports the backend's statistics.

use integrity_common::events::{EventBus, IntegrityEvent};
use integrity_common::models::{ImportStats, TemplateKind};
use integrity_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::api::{ImportApi, UploadFile};

/// Accepted file extensions (case-insensitive)
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

/// Most files accepted in one upload (objects + diagnostics)
pub const MAX_FILES: usize = 2;

/// Check one file name against [`SUPPORTED_EXTENSIONS`]
pub fn validate_file_name(file_name: &str) -> Result<()> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext {
        Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(Error::Validation(format!(
            "Unsupported file type: {}. Use CSV or Excel (.csv, .xlsx, .xls)",
            file_name
        ))),
    }
}

/// Check a whole selection: one or two files, all supported
pub fn validate_selection<S: AsRef<str>>(file_names: &[S]) -> Result<()> {
    if file_names.is_empty() {
        return Err(Error::Validation("Select at least one file to import".to_string()));
    }
    if file_names.len() > MAX_FILES {
        return Err(Error::Validation(format!(
            "At most {} files can be imported at once, got {}",
            MAX_FILES,
            file_names.len()
        )));
    }
    file_names
        .iter()
        .try_for_each(|name| validate_file_name(name.as_ref()))
}

/// Download name for a template kind
pub fn template_file_name(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::Objects => "objects_template.csv",
        TemplateKind::Diagnostics => "diagnostics_template.csv",
        TemplateKind::Both => "import_templates.zip",
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub struct ImportClient {
    api: Arc<dyn ImportApi>,
    event_bus: EventBus,
}

impl ImportClient {
    pub fn new(api: Arc<dyn ImportApi>, event_bus: EventBus) -> Self {
        Self { api, event_bus }
    }

    /// Validate, read and upload files from disk
    ///
    /// Nothing is read or sent if any file fails validation.
    pub async fn import_paths(&self, paths: &[PathBuf], clear_existing: bool) -> Result<ImportStats> {
        let names: Vec<String> = paths.iter().map(|p| file_name_of(p)).collect();
        validate_selection(&names)?;

        let mut files = Vec::with_capacity(paths.len());
        for (path, file_name) in paths.iter().zip(names) {
            let bytes = tokio::fs::read(path).await?;
            files.push(UploadFile { file_name, bytes });
        }
        self.import_files(files, clear_existing).await
    }

    /// Validate and upload in-memory files
    pub async fn import_files(&self, files: Vec<UploadFile>, clear_existing: bool) -> Result<ImportStats> {
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        validate_selection(&names)?;

        info!(files = ?names, clear_existing, "Uploading import files");
        let stats = self.api.upload(files, clear_existing).await?;
        self.report(stats)
    }

    /// Load the backend's bundled sample dataset
    pub async fn import_sample_dataset(&self, clear_existing: bool) -> Result<ImportStats> {
        info!(clear_existing, "Importing sample dataset");
        let stats = self.api.import_sample_dataset(clear_existing).await?;
        self.report(stats)
    }

    fn report(&self, stats: ImportStats) -> Result<ImportStats> {
        info!(summary = %stats.summary(), errors = stats.errors.len(), "Import completed");
        self.event_bus.emit_lossy(IntegrityEvent::ImportCompleted {
            stats: stats.clone(),
            timestamp: chrono::Utc::now(),
        });
        Ok(stats)
    }

    /// Save an import template into `dest_dir`
    pub async fn download_template(&self, kind: TemplateKind, dest_dir: &Path) -> Result<PathBuf> {
        let bytes = self.api.template(kind).await?;
        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(template_file_name(kind));
        tokio::fs::write(&path, &bytes).await?;
        info!(path = %path.display(), bytes = bytes.len(), "Template saved");
        Ok(path)
    }
}
