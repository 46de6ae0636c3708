//! XLSX export
//!
//! Writes a minimal SpreadsheetML package: one worksheet per report
//! section, inline strings, two number styles.

use integrity_common::{Error, Result};
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::html::escape;
use super::{BlockKind, Cell, Column, ReportDocument, Section, MISSING};

/// Workbook sheets in tab order
pub const SHEETS: [(Section, &str); 4] = [
    (Section::Summary, "Summary"),
    (Section::Defects, "Defects"),
    (Section::Excavation, "Excavation"),
    (Section::Conclusion, "Conclusion"),
];

const STYLE_HEADER: u8 = 1;
const STYLE_DECIMAL: u8 = 2;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
{sheets}</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="3">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
<xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/>
<xf numFmtId="2" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
</cellXfs>
</styleSheet>"#;

/// Spreadsheet column name for a zero-based index: 0 -> A, 26 -> AA
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

#[derive(Debug, Clone, PartialEq)]
enum XlsxValue {
    Text(String),
    Number(f64),
    Integer(i64),
}

#[derive(Debug, Clone, PartialEq)]
struct XlsxCell {
    value: XlsxValue,
    style: u8,
}

impl XlsxCell {
    fn text(s: impl Into<String>) -> Self {
        Self {
            value: XlsxValue::Text(s.into()),
            style: 0,
        }
    }

    fn header(s: impl Into<String>) -> Self {
        Self {
            value: XlsxValue::Text(s.into()),
            style: STYLE_HEADER,
        }
    }
}

impl From<&Cell> for XlsxCell {
    fn from(cell: &Cell) -> Self {
        match cell {
            Cell::Number(Some(v)) if v.is_finite() => XlsxCell {
                value: XlsxValue::Number((v * 100.0).round() / 100.0),
                style: STYLE_DECIMAL,
            },
            Cell::Number(_) => XlsxCell::text(MISSING),
            Cell::Integer(v) => XlsxCell {
                value: XlsxValue::Integer(*v),
                style: 0,
            },
            other => XlsxCell::text(other.display()),
        }
    }
}

#[derive(Debug, Default)]
struct Sheet {
    widths: Vec<f64>,
    rows: Vec<Vec<XlsxCell>>,
}

impl Sheet {
    fn separate(&mut self) {
        if !self.rows.is_empty() {
            self.rows.push(Vec::new());
        }
    }

    fn fit_columns(&mut self, columns: &[Column]) {
        for (i, col) in columns.iter().enumerate() {
            match self.widths.get_mut(i) {
                Some(w) => *w = w.max(col.width),
                None => self.widths.push(col.width),
            }
        }
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );
        let widths: &[f64] = if self.widths.is_empty() { &[40.0, 20.0] } else { &self.widths };
        xml.push_str("<cols>");
        for (i, w) in widths.iter().enumerate() {
            let _ = write!(xml, r#"<col min="{n}" max="{n}" width="{w:.1}" customWidth="1"/>"#, n = i + 1);
        }
        xml.push_str("</cols><sheetData>");

        for (r, row) in self.rows.iter().enumerate() {
            let _ = write!(xml, r#"<row r="{}">"#, r + 1);
            for (c, cell) in row.iter().enumerate() {
                let reference = format!("{}{}", column_name(c), r + 1);
                let style = if cell.style == 0 { String::new() } else { format!(r#" s="{}""#, cell.style) };
                let _ = match &cell.value {
                    XlsxValue::Text(s) => write!(
                        xml,
                        r#"<c r="{}" t="inlineStr"{}><is><t xml:space="preserve">{}</t></is></c>"#,
                        reference,
                        style,
                        escape(s)
                    ),
                    XlsxValue::Number(v) => write!(xml, r#"<c r="{}"{}><v>{:.2}</v></c>"#, reference, style, v),
                    XlsxValue::Integer(v) => write!(xml, r#"<c r="{}"{}><v>{}</v></c>"#, reference, style, v),
                };
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }
}

fn build_sheet(doc: &ReportDocument, section: Section) -> Sheet {
    let mut sheet = Sheet::default();
    for block in doc.section(section) {
        match &block.kind {
            BlockKind::Heading { text, .. } => {
                sheet.separate();
                sheet.rows.push(vec![XlsxCell::header(text.clone())]);
            }
            BlockKind::Paragraph(text) => {
                sheet.rows.push(vec![XlsxCell::text(text.clone())]);
            }
            BlockKind::Metrics(metrics) => {
                sheet.separate();
                for m in metrics {
                    sheet.rows.push(vec![XlsxCell::text(m.label.clone()), XlsxCell::text(m.value.clone())]);
                }
            }
            BlockKind::Table(table) => {
                sheet.separate();
                sheet.fit_columns(&table.columns);
                sheet
                    .rows
                    .push(table.columns.iter().map(|c| XlsxCell::header(c.header.clone())).collect());
                for row in &table.rows {
                    sheet.rows.push(row.iter().map(XlsxCell::from).collect());
                }
            }
            BlockKind::Map(points) => {
                sheet.separate();
                for p in points {
                    sheet.rows.push(vec![
                        XlsxCell::text(p.name.clone()),
                        XlsxCell::from(&Cell::Number(Some(p.lat))),
                        XlsxCell::from(&Cell::Number(Some(p.lon))),
                    ]);
                }
            }
            BlockKind::Signatures(lines) => {
                sheet.separate();
                for line in lines {
                    sheet.rows.push(vec![
                        XlsxCell::text(line.role.clone()),
                        XlsxCell::text(line.name.clone().unwrap_or_else(|| "____________".to_string())),
                    ]);
                }
            }
        }
    }
    sheet
}

fn workbook_xml() -> String {
    let mut sheets = String::new();
    for (i, (_, name)) in SHEETS.iter().enumerate() {
        let _ = write!(sheets, r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#, name, i + 1, i + 1);
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>{}</sheets></workbook>"#,
        sheets
    )
}

fn workbook_rels() -> String {
    let mut rels = String::new();
    for i in 1..=SHEETS.len() {
        let _ = write!(
            rels,
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        );
    }
    let _ = write!(
        rels,
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        SHEETS.len() + 1
    );
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        rels
    )
}

fn content_types() -> String {
    let mut overrides = String::new();
    for i in 1..=SHEETS.len() {
        let _ = writeln!(
            overrides,
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        );
    }
    CONTENT_TYPES.replace("{sheets}", &overrides)
}

fn zip_err(e: impl std::fmt::Display) -> Error {
    Error::Render(format!("XLSX packaging failed: {}", e))
}

/// Render `doc` as an XLSX workbook
pub fn render_xlsx(doc: &ReportDocument) -> Result<Vec<u8>> {
    let mut parts: Vec<(String, String)> = vec![
        ("[Content_Types].xml".to_string(), content_types()),
        ("_rels/.rels".to_string(), ROOT_RELS.to_string()),
        ("xl/workbook.xml".to_string(), workbook_xml()),
        ("xl/_rels/workbook.xml.rels".to_string(), workbook_rels()),
        ("xl/styles.xml".to_string(), STYLES.to_string()),
    ];
    for (i, (section, _)) in SHEETS.iter().enumerate() {
        parts.push((
            format!("xl/worksheets/sheet{}.xml", i + 1),
            build_sheet(doc, *section).to_xml(),
        ));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    for (name, body) in &parts {
        zip.start_file(name.as_str(), options).map_err(zip_err)?;
        zip.write_all(body.as_bytes()).map_err(zip_err)?;
    }
    let cursor = zip.finish().map_err(zip_err)?;
    Ok(cursor.into_inner())
}
