//! Standalone HTML export with an inline print stylesheet

use std::fmt::Write as _;

use super::{BlockKind, Cell, Column, MapPoint, Metric, ReportDocument, SignatureLine, Table};

const STYLESHEET: &str = "\
@page { size: A4; margin: 12mm; }
body { font-family: 'Segoe UI', Arial, sans-serif; color: #1f2937; font-size: 11pt; margin: 0 auto; max-width: 190mm; }
h1 { color: #1e4078; border-bottom: 2px solid #1e4078; padding-bottom: 4px; }
h2 { color: #1e4078; border-bottom: 1px solid #cbd5e1; margin-top: 18px; }
h3 { color: #334155; }
.meta { color: #64748b; font-size: 9pt; }
.metrics { display: flex; flex-wrap: wrap; gap: 8px; margin: 8px 0; }
.metric { background: #f5f7fa; border-left: 3px solid #1e4078; padding: 6px 10px; min-width: 150px; }
.metric .label { color: #64748b; font-size: 9pt; }
.metric .value { font-size: 14pt; font-weight: 600; }
table { border-collapse: collapse; width: 100%; margin: 8px 0; font-size: 9pt; page-break-inside: auto; }
th { background: #e8ecf1; text-align: left; }
th, td { border: 1px solid #cbd5e1; padding: 3px 5px; }
tr { page-break-inside: avoid; }
.signatures td { border: none; padding: 14px 5px 2px; }
.signatures .line { border-bottom: 1px solid #1f2937; min-width: 60mm; }
";

/// Escape text for HTML and XML bodies and attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn write_table(out: &mut String, columns: &[Column], rows: &[Vec<Cell>]) {
    out.push_str("<table>\n<thead><tr>");
    for col in columns {
        let _ = write!(out, "<th style=\"width:{:.0}ch\">{}</th>", col.width, escape(&col.header));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            let _ = write!(out, "<td>{}</td>", escape(&cell.display()));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
}

fn write_metrics(out: &mut String, metrics: &[Metric]) {
    out.push_str("<div class=\"metrics\">\n");
    for m in metrics {
        let _ = writeln!(
            out,
            "<div class=\"metric\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>",
            escape(&m.label),
            escape(&m.value)
        );
    }
    out.push_str("</div>\n");
}

/// Static stand-in for the live map
fn map_table(points: &[MapPoint]) -> Table {
    Table {
        columns: vec![
            Column::new("ID", 6.0),
            Column::new("Object", 30.0),
            Column::new("Latitude", 12.0),
            Column::new("Longitude", 12.0),
            Column::new("Risk", 10.0),
        ],
        rows: points
            .iter()
            .map(|p| {
                vec![
                    Cell::Integer(p.object_id),
                    Cell::text(p.name.clone()),
                    Cell::text(format!("{:.5}", p.lat)),
                    Cell::text(format!("{:.5}", p.lon)),
                    Cell::optional_text(p.risk.map(|r| r.label())),
                ]
            })
            .collect(),
    }
}

fn write_signatures(out: &mut String, lines: &[SignatureLine]) {
    out.push_str("<table class=\"signatures\">\n");
    for line in lines {
        let _ = writeln!(
            out,
            "<tr><td>{}:</td><td class=\"line\">{}</td></tr>",
            escape(&line.role),
            line.name.as_deref().map(escape).unwrap_or_default()
        );
    }
    out.push_str("</table>\n");
}

/// Render the visible blocks of `doc` as a self-contained HTML page
pub fn render_html(doc: &ReportDocument) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n",
        escape(&doc.title),
        STYLESHEET
    );
    let _ = writeln!(
        out,
        "<h1>{}</h1>\n<p class=\"meta\">Generated {}</p>",
        escape(&doc.title),
        doc.generated_at.format("%d.%m.%Y %H:%M UTC")
    );

    for block in doc.visible_blocks() {
        match &block.kind {
            BlockKind::Heading { level, text } => {
                let level = (*level).clamp(2, 4);
                let _ = writeln!(out, "<h{level}>{}</h{level}>", escape(text));
            }
            BlockKind::Paragraph(text) => {
                let _ = writeln!(out, "<p>{}</p>", escape(text));
            }
            BlockKind::Metrics(metrics) => write_metrics(&mut out, metrics),
            BlockKind::Table(table) => write_table(&mut out, &table.columns, &table.rows),
            BlockKind::Map(points) => {
                let table = map_table(points);
                write_table(&mut out, &table.columns, &table.rows);
            }
            BlockKind::Signatures(lines) => write_signatures(&mut out, lines),
        }
    }

    out.push_str("</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Block;
    use chrono::Utc;
    use integrity_common::models::RiskLevel;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">T&C's</a>"#), "&lt;a href=&quot;x&quot;&gt;T&amp;C&#39;s&lt;/a&gt;");
    }

    #[test]
    fn test_map_becomes_coordinate_table() {
        let mut doc = ReportDocument::new("Map", Utc::now());
        doc.push(Block::new(BlockKind::Map(vec![MapPoint {
            object_id: 4,
            name: "Valve <V-4>".into(),
            lat: 51.1,
            lon: 71.4,
            risk: Some(RiskLevel::High),
        }])));
        let html = render_html(&doc);
        assert!(html.contains("<td>51.10000</td>"));
        assert!(html.contains("Valve &lt;V-4&gt;"));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn test_hidden_blocks_skipped() {
        let mut doc = ReportDocument::new("Hidden", Utc::now());
        doc.push(Block::paragraph("visible"));
        doc.push(Block::paragraph("secret"));
        doc.blocks[1].hidden = true;
        let html = render_html(&doc);
        assert!(html.contains("visible"));
        assert!(!html.contains("secret"));
    }
}
