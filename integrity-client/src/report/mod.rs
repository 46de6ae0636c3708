//! Report composition and export
//!
//! A report is a [`ReportDocument`]: an ordered list of blocks. Exporters
//! render the visible blocks to HTML, PDF or XLSX. Blocks flagged
//! `no_export` (toolbars, hints) are hidden for the duration of an export
//! by an [`ExportGuard`] and restored afterwards on every exit path.

pub mod builders;
pub mod excel;
pub mod html;
pub mod pdf;
pub mod raster;

pub use builders::{technical_state_report, work_permit_document, PermitDocumentInput, TechnicalReportInput};

use chrono::{DateTime, NaiveDate, Utc};
use integrity_common::models::{ObjectId, RiskLevel};
use integrity_common::time::display_date;
use integrity_common::{Error, Result};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use tracing::{error, info};

/// Export target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Html,
    Pdf,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(ExportFormat::Html),
            "pdf" => Ok(ExportFormat::Pdf),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(Error::Validation(format!("Unknown export format: {}", other))),
        }
    }
}

/// Which workbook sheet a block feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    Summary,
    Defects,
    Excavation,
    Conclusion,
    #[default]
    Other,
}

/// One table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    /// Measurement, shown with two decimals
    Number(Option<f64>),
    Integer(i64),
    Date(Option<NaiveDate>),
}

/// Placeholder for missing values
pub const MISSING: &str = "-";

impl Cell {
    pub fn text(value: impl Into<String>) -> Cell {
        Cell::Text(value.into())
    }

    pub fn optional_text(value: Option<&str>) -> Cell {
        Cell::Text(value.unwrap_or_default().to_string())
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) if s.trim().is_empty() => MISSING.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Number(Some(v)) if v.is_finite() => format!("{:.2}", v),
            Cell::Number(_) => MISSING.to_string(),
            Cell::Integer(v) => v.to_string(),
            Cell::Date(Some(d)) => display_date(*d),
            Cell::Date(None) => MISSING.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub header: String,
    /// Width in characters
    pub width: f64,
}

impl Column {
    pub fn new(header: impl Into<String>, width: f64) -> Self {
        Self {
            header: header.into(),
            width,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: impl ToString) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapPoint {
    pub object_id: ObjectId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub risk: Option<RiskLevel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignatureLine {
    pub role: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Heading { level: u8, text: String },
    Paragraph(String),
    Metrics(Vec<Metric>),
    Table(Table),
    /// Live map; replaced by a coordinate table in HTML, omitted from PDF
    Map(Vec<MapPoint>),
    Signatures(Vec<SignatureLine>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub section: Section,
    /// Interactive element never included in exports
    pub no_export: bool,
    /// Not rendered
    pub hidden: bool,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            section: Section::Other,
            no_export: false,
            hidden: false,
        }
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::new(BlockKind::Heading {
            level,
            text: text.into(),
        })
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Paragraph(text.into()))
    }

    pub fn in_section(mut self, section: Section) -> Self {
        self.section = section;
        self
    }

    pub fn interactive(mut self) -> Self {
        self.no_export = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub blocks: Vec<Block>,
}

impl ReportDocument {
    pub fn new(title: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            generated_at,
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn visible_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| !b.hidden)
    }

    pub fn hidden_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.hidden).count()
    }

    /// Visible blocks of one section
    pub fn section(&self, section: Section) -> impl Iterator<Item = &Block> {
        self.visible_blocks().filter(move |b| b.section == section)
    }

    /// Suggested file name, e.g. `technical-state-report-2025-03-14.pdf`
    pub fn file_name(&self, format: ExportFormat) -> String {
        let slug: String = self
            .title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        let slug = if slug.is_empty() { "report".to_string() } else { slug };
        format!(
            "{}-{}.{}",
            slug,
            self.generated_at.format("%Y-%m-%d"),
            format.extension()
        )
    }
}

/// Hides `no_export` blocks until dropped
///
/// Only blocks that were visible when the guard was created are touched,
/// and they are restored exactly once.
pub struct ExportGuard<'a> {
    doc: &'a mut ReportDocument,
    hidden_by_guard: Vec<usize>,
    restored: bool,
}

impl<'a> ExportGuard<'a> {
    pub fn hide_no_export(doc: &'a mut ReportDocument) -> Self {
        let mut hidden_by_guard = Vec::new();
        for (i, block) in doc.blocks.iter_mut().enumerate() {
            if block.no_export && !block.hidden {
                block.hidden = true;
                hidden_by_guard.push(i);
            }
        }
        Self {
            doc,
            hidden_by_guard,
            restored: false,
        }
    }

    pub fn document(&self) -> &ReportDocument {
        self.doc
    }

    /// Restore now; returns how many blocks were made visible again
    pub fn restore(mut self) -> usize {
        self.restore_once()
    }

    fn restore_once(&mut self) -> usize {
        if self.restored {
            return 0;
        }
        self.restored = true;
        for &i in &self.hidden_by_guard {
            if let Some(block) = self.doc.blocks.get_mut(i) {
                block.hidden = false;
            }
        }
        self.hidden_by_guard.len()
    }
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.restore_once();
    }
}

fn render(doc: &ReportDocument, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Html => Ok(html::render_html(doc).into_bytes()),
        ExportFormat::Pdf => pdf::render_pdf(doc, &pdf::PageLayout::a4()),
        ExportFormat::Xlsx => excel::render_xlsx(doc),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "renderer panicked".to_string())
}

/// Export `doc` in `format`
///
/// Any failure, including a renderer panic, becomes [`Error::Render`]; the
/// document's visibility flags are unchanged afterwards.
pub fn export(doc: &mut ReportDocument, format: ExportFormat) -> Result<Vec<u8>> {
    let guard = ExportGuard::hide_no_export(doc);
    let outcome = catch_unwind(AssertUnwindSafe(|| render(guard.document(), format)));
    drop(guard);

    match outcome {
        Ok(Ok(bytes)) => {
            info!(format = %format, bytes = bytes.len(), "Report exported");
            Ok(bytes)
        }
        Ok(Err(Error::Render(msg))) => {
            error!(format = %format, error = %msg, "Report export failed");
            Err(Error::Render(msg))
        }
        Ok(Err(other)) => {
            error!(format = %format, error = %other, "Report export failed");
            Err(Error::Render(other.to_string()))
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            error!(format = %format, error = %msg, "Report renderer panicked");
            Err(Error::Render(msg))
        }
    }
}

/// Export and write to `dir`; returns the written path
pub async fn export_to_dir(
    doc: &mut ReportDocument,
    format: ExportFormat,
    dir: &std::path::Path,
) -> Result<std::path::PathBuf> {
    let bytes = export(doc, format)?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(doc.file_name(format));
    tokio::fs::write(&path, &bytes).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn doc() -> ReportDocument {
        let mut doc = ReportDocument::new(
            "Technical State Report",
            Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap(),
        );
        doc.push(Block::heading(1, "Title"));
        doc.push(Block::paragraph("Export buttons").interactive());
        doc.push(Block::paragraph("Already hidden").interactive());
        doc.blocks[2].hidden = true;
        doc
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Number(Some(3.14159)).display(), "3.14");
        assert_eq!(Cell::Number(None).display(), "-");
        assert_eq!(Cell::Number(Some(f64::NAN)).display(), "-");
        assert_eq!(Cell::text("").display(), "-");
        assert_eq!(Cell::Date(NaiveDate::from_ymd_opt(2024, 5, 2)).display(), "02.05.2024");
    }

    #[test]
    fn test_guard_restores_only_what_it_hid() {
        let mut doc = doc();
        let guard = ExportGuard::hide_no_export(&mut doc);
        assert_eq!(guard.document().hidden_count(), 2);
        assert_eq!(guard.restore(), 1);

        assert!(!doc.blocks[1].hidden);
        assert!(doc.blocks[2].hidden);
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let mut doc = doc();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let guard = ExportGuard::hide_no_export(&mut doc);
            assert!(guard.document().blocks[1].hidden);
            panic!("renderer exploded");
        }));
        assert!(result.is_err());
        assert!(!doc.blocks[1].hidden);
        assert_eq!(doc.hidden_count(), 1);
    }

    #[test]
    fn test_export_leaves_flags_unchanged() {
        let mut doc = doc();
        let before = doc.clone();
        let html = export(&mut doc, ExportFormat::Html).unwrap();
        assert!(!String::from_utf8(html).unwrap().contains("Export buttons"));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            doc().file_name(ExportFormat::Pdf),
            "technical-state-report-2025-03-14.pdf"
        );
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert!("docx".parse::<ExportFormat>().is_err());
    }
}
