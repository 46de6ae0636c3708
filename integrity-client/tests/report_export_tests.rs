//! Technical report built from fetched data, exported in every format

mod helpers;

use std::io::{Cursor, Read};

use chrono::{TimeZone, Utc};
use helpers::{object, FakeApi};
use integrity_client::batch::fetch_diagnostics;
use integrity_client::fallback::load_analytics;
use integrity_client::report::pdf::PageLayout;
use integrity_client::report::raster::rasterize;
use integrity_client::report::{
    export, export_to_dir, technical_state_report, ExportFormat, ReportDocument, TechnicalReportInput,
};
use integrity_common::models::RiskLevel;
use zip::ZipArchive;

async fn report() -> ReportDocument {
    let objects = vec![
        object(1, Some(51.17), Some(71.45), Some(RiskLevel::High)),
        object(2, Some(51.20), Some(71.50), Some(RiskLevel::Normal)),
        object(3, None, None, Some(RiskLevel::Medium)),
    ];
    let mut api = FakeApi::new(objects.clone());
    api.failing_ids.insert(2);

    let ids: Vec<_> = objects.iter().map(|o| o.id).collect();
    let diagnostics = fetch_diagnostics(&api, &ids, 2).await;
    let analytics = load_analytics(&api, 5).await.unwrap();

    technical_state_report(&TechnicalReportInput {
        objects,
        diagnostics,
        analytics,
        filter: None,
        generated_at: Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap(),
    })
}

fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut s = String::new();
    file.read_to_string(&mut s).unwrap();
    s
}

#[tokio::test]
async fn test_xlsx_defects_sheet_lists_every_defect_in_order() {
    let mut doc = report().await;
    let before = doc.clone();
    let bytes = export(&mut doc, ExportFormat::Xlsx).unwrap();
    assert_eq!(doc, before);

    let sheet = read_part(&bytes, "xl/worksheets/sheet2.xml");
    // Heading, spacer, column headers, then one row per defect
    assert_eq!(sheet.matches("<row ").count(), 3 + 2);

    let first = sheet.find("defect 10").unwrap();
    let second = sheet.find("defect 30").unwrap();
    assert!(first < second);
    assert!(!sheet.contains("defect 20"));

    // Param 1 is numeric, params 2 and 3 are missing
    assert!(sheet.contains(r#"<c r="E4" s="2"><v>3.33</v></c>"#));
    assert!(sheet.contains(r#"<c r="F4" t="inlineStr"><is><t xml:space="preserve">-</t></is></c>"#));
}

#[tokio::test]
async fn test_pdf_pages_follow_bitmap_height() {
    let mut doc = report().await;
    let layout = PageLayout::a4();

    let mut printable = doc.clone();
    for block in printable.blocks.iter_mut().filter(|b| b.no_export) {
        block.hidden = true;
    }
    let height = rasterize(&printable, layout.content_width_px()).unwrap().height();
    let expected = height.div_ceil(layout.band_height_px()) as usize;

    let bytes = export(&mut doc, ExportFormat::Pdf).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    let parsed = lopdf::Document::load_mem(&bytes).unwrap();
    assert_eq!(parsed.get_pages().len(), expected);
    assert_eq!(doc.hidden_count(), 0);
}

#[tokio::test]
async fn test_html_omits_interactive_blocks() {
    let mut doc = report().await;
    let html = String::from_utf8(export(&mut doc, ExportFormat::Html).unwrap()).unwrap();

    assert!(html.contains("Technical State Report"));
    assert!(html.contains("Detected defects"));
    assert!(!html.contains("Use the toolbar"));
    assert!(doc.blocks.iter().any(|b| b.no_export && !b.hidden));
}

#[tokio::test]
async fn test_export_to_dir_writes_named_file() {
    let mut doc = report().await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reports");

    let path = export_to_dir(&mut doc, ExportFormat::Html, &out).await.unwrap();
    assert_eq!(path, out.join("technical-state-report-2025-03-14.html"));
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("Excavation recommendations"));
}
