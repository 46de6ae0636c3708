//! Standard report layouts

use chrono::{DateTime, Utc};
use integrity_common::models::{
    DiagnosticRecord, Filter, InspectionObject, ObjectId, RiskLevel, WorkPermit,
};
use integrity_common::time::display_date;
use std::collections::HashMap;

use super::{Block, BlockKind, Cell, Column, MapPoint, Metric, ReportDocument, Section, SignatureLine, Table};
use crate::batch::BatchOutcome;
use crate::fallback::AnalyticsSnapshot;

/// Diagnostics shown on a work permit
pub const PERMIT_DIAGNOSTICS_SHOWN: usize = 5;

const EXCAVATION_ADVICE: &str = "Excavation and additional NDT of the section";

pub struct TechnicalReportInput {
    pub objects: Vec<InspectionObject>,
    pub diagnostics: BatchOutcome,
    pub analytics: AnalyticsSnapshot,
    pub filter: Option<Filter>,
    pub generated_at: DateTime<Utc>,
}

pub struct PermitDocumentInput {
    pub object: InspectionObject,
    pub diagnostics: Vec<DiagnosticRecord>,
    /// `None` renders a draft
    pub permit: Option<WorkPermit>,
    pub generated_at: DateTime<Utc>,
}

fn table(columns: Vec<Column>, rows: Vec<Vec<Cell>>) -> Block {
    Block::new(BlockKind::Table(Table { columns, rows }))
}

fn map_point(object: &InspectionObject) -> Option<MapPoint> {
    let point = object.map_location()?;
    Some(MapPoint {
        object_id: object.id,
        name: object.name.clone(),
        lat: point.lat,
        lon: point.lon,
        risk: object.risk_level,
    })
}

fn coordinates(object: &InspectionObject) -> String {
    match object.map_location() {
        Some(p) => format!("{:.5}, {:.5}", p.lat, p.lon),
        None => "not set".to_string(),
    }
}

fn defect_rows(input: &TechnicalReportInput) -> Vec<Vec<Cell>> {
    let names: HashMap<ObjectId, &str> = input.objects.iter().map(|o| (o.id, o.name.as_str())).collect();
    input
        .diagnostics
        .results
        .iter()
        .flat_map(|(_, records)| records.iter())
        .filter(|d| d.defect_found)
        .enumerate()
        .map(|(i, d)| {
            let [p1, p2, p3] = d.params();
            vec![
                Cell::Integer(i as i64 + 1),
                Cell::text(
                    names
                        .get(&d.object_id)
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| format!("#{}", d.object_id)),
                ),
                Cell::text(d.method.code()),
                Cell::Date(Some(d.date)),
                Cell::Number(p1),
                Cell::Number(p2),
                Cell::Number(p3),
                Cell::optional_text(d.ml_label.map(|r| r.label())),
                Cell::optional_text(d.defect_description.as_deref()),
            ]
        })
        .collect()
}

/// Technical state report for the current object selection
pub fn technical_state_report(input: &TechnicalReportInput) -> ReportDocument {
    let mut doc = ReportDocument::new("Technical State Report", input.generated_at);
    let analytics = &input.analytics;
    let stats = analytics.stats.value();

    doc.push(Block::paragraph(format!(
        "Scope: {}. Objects in selection: {}.",
        Filter::describe(input.filter.as_ref()),
        input.objects.len()
    )));
    if analytics.has_demo() {
        doc.push(Block::paragraph(
            "Backend unavailable: some figures below are demonstration data.",
        ));
    }
    doc.push(Block::paragraph("Use the toolbar to save this report as PDF, Excel or HTML.").interactive());

    // Summary
    doc.push(Block::heading(2, "Summary").in_section(Section::Summary));
    doc.push(
        Block::new(BlockKind::Metrics(vec![
            Metric::new("Objects", stats.total_objects),
            Metric::new("Diagnostics", stats.total_diagnostics),
            Metric::new("Defects", stats.total_defects),
            Metric::new("Active defects", stats.active_defects),
            Metric::new("Defect rate", format!("{:.2}%", stats.defects_percentage)),
            Metric::new("Repairs this year", stats.repairs_this_year),
            Metric::new("High criticality", stats.criticality.high),
            Metric::new("Medium criticality", stats.criticality.medium),
        ]))
        .in_section(Section::Summary),
    );
    doc.push(Block::heading(3, "Inspection methods").in_section(Section::Summary));
    doc.push(
        table(
            vec![
                Column::new("Method", 12.0),
                Column::new("Inspections", 12.0),
                Column::new("Defects", 10.0),
                Column::new("Defect rate, %", 14.0),
            ],
            analytics
                .methods
                .value()
                .iter()
                .map(|m| {
                    vec![
                        Cell::text(m.method.clone()),
                        Cell::Integer(m.total as i64),
                        Cell::Integer(m.defects as i64),
                        Cell::Number(Some(m.percentage)),
                    ]
                })
                .collect(),
        )
        .in_section(Section::Summary),
    );
    doc.push(Block::heading(3, "Criticality").in_section(Section::Summary));
    doc.push(
        table(
            vec![Column::new("Level", 12.0), Column::new("Count", 10.0), Column::new("Share, %", 10.0)],
            analytics
                .criticality
                .value()
                .iter()
                .map(|c| {
                    vec![
                        Cell::text(c.label.label()),
                        Cell::Integer(c.count as i64),
                        Cell::Number(Some(c.percentage)),
                    ]
                })
                .collect(),
        )
        .in_section(Section::Summary),
    );

    // Defects
    let defects = defect_rows(input);
    doc.push(Block::heading(2, "Detected defects").in_section(Section::Defects));
    doc.push(
        table(
            vec![
                Column::new("No.", 6.0),
                Column::new("Object", 28.0),
                Column::new("Method", 8.0),
                Column::new("Date", 11.0),
                Column::new("Param 1", 9.0),
                Column::new("Param 2", 9.0),
                Column::new("Param 3", 9.0),
                Column::new("Risk", 8.0),
                Column::new("Description", 36.0),
            ],
            defects,
        )
        .in_section(Section::Defects),
    );

    // Excavation
    let high_risk: Vec<&InspectionObject> = input
        .objects
        .iter()
        .filter(|o| o.risk_level == Some(RiskLevel::High))
        .collect();
    doc.push(Block::heading(2, "Excavation recommendations").in_section(Section::Excavation));
    if high_risk.is_empty() {
        doc.push(
            Block::paragraph("No high-risk objects in the selection; excavation is not required.")
                .in_section(Section::Excavation),
        );
    } else {
        doc.push(
            table(
                vec![
                    Column::new("No.", 6.0),
                    Column::new("Object", 28.0),
                    Column::new("Pipeline", 10.0),
                    Column::new("Coordinates", 22.0),
                    Column::new("Recommendation", 40.0),
                ],
                high_risk
                    .iter()
                    .enumerate()
                    .map(|(i, o)| {
                        vec![
                            Cell::Integer(i as i64 + 1),
                            Cell::text(o.name.clone()),
                            Cell::optional_text(o.pipeline_id.as_deref()),
                            Cell::text(coordinates(o)),
                            Cell::text(EXCAVATION_ADVICE),
                        ]
                    })
                    .collect(),
            )
            .in_section(Section::Excavation),
        );
    }

    let points: Vec<MapPoint> = input.objects.iter().filter_map(map_point).collect();
    if !points.is_empty() {
        doc.push(Block::heading(2, "Object locations"));
        doc.push(Block::new(BlockKind::Map(points)));
    }

    // Conclusion
    let critical = input.objects.iter().filter(|o| o.is_critical()).count();
    doc.push(Block::heading(2, "Conclusion").in_section(Section::Conclusion));
    doc.push(
        Block::paragraph(format!(
            "{} of {} objects are in critical condition. {} high-risk objects require excavation. \
             Active defects: {}.",
            critical,
            input.objects.len(),
            high_risk.len(),
            stats.active_defects
        ))
        .in_section(Section::Conclusion),
    );
    doc.push(
        Block::new(BlockKind::Signatures(vec![
            SignatureLine {
                role: "Prepared by".to_string(),
                name: None,
            },
            SignatureLine {
                role: "Approved by".to_string(),
                name: None,
            },
        ]))
        .in_section(Section::Conclusion),
    );
    doc
}

/// Printable work permit for one object
pub fn work_permit_document(input: &PermitDocumentInput) -> ReportDocument {
    let title = match &input.permit {
        Some(p) => format!("Work Permit {}", p.permit_number),
        None => "Work Permit (draft)".to_string(),
    };
    let mut doc = ReportDocument::new(title, input.generated_at);
    let object = &input.object;

    doc.push(Block::paragraph("Print").interactive());
    doc.push(Block::heading(2, "Object").in_section(Section::Summary));
    doc.push(
        Block::new(BlockKind::Metrics(vec![
            Metric::new("Object ID", object.id),
            Metric::new("Name", &object.name),
            Metric::new("Type", object.category.label()),
            Metric::new("Pipeline", object.pipeline_id.as_deref().unwrap_or("-")),
            Metric::new("Coordinates", coordinates(object)),
            Metric::new("Risk", object.risk_level.map(|r| r.label()).unwrap_or("-")),
        ]))
        .in_section(Section::Summary),
    );

    if let Some(permit) = &input.permit {
        let row = |label: &str, value: Cell| vec![Cell::text(label), value];
        doc.push(Block::heading(2, "Permit").in_section(Section::Summary));
        doc.push(
            table(
                vec![Column::new("Field", 16.0), Column::new("Value", 40.0)],
                vec![
                    row("Number", Cell::text(permit.permit_number.clone())),
                    row("Status", Cell::text(permit.status.as_str())),
                    row("Issued", Cell::Date(Some(permit.issued_date))),
                    row("Issued by", Cell::optional_text(permit.issued_by.as_deref())),
                    row("Closed", Cell::Date(permit.closed_date)),
                    row("Closed by", Cell::optional_text(permit.closed_by.as_deref())),
                    row("Notes", Cell::optional_text(permit.notes.as_deref())),
                ],
            )
            .in_section(Section::Summary),
        );
    }

    let mut latest: Vec<&DiagnosticRecord> = input.diagnostics.iter().collect();
    latest.sort_by(|a, b| b.date.cmp(&a.date));
    latest.truncate(PERMIT_DIAGNOSTICS_SHOWN);
    doc.push(Block::heading(2, "Latest diagnostics").in_section(Section::Defects));
    doc.push(
        table(
            vec![
                Column::new("Date", 11.0),
                Column::new("Method", 8.0),
                Column::new("Defect", 7.0),
                Column::new("Grade", 16.0),
                Column::new("Description", 36.0),
            ],
            latest
                .iter()
                .map(|d| {
                    vec![
                        Cell::text(display_date(d.date)),
                        Cell::text(d.method.code()),
                        Cell::text(if d.defect_found { "yes" } else { "no" }),
                        Cell::optional_text(d.quality_grade.map(|g| g.label())),
                        Cell::optional_text(d.defect_description.as_deref()),
                    ]
                })
                .collect(),
        )
        .in_section(Section::Defects),
    );

    let issuer = input.permit.as_ref().and_then(|p| p.issued_by.clone());
    doc.push(
        Block::new(BlockKind::Signatures(vec![
            SignatureLine {
                role: "Issued by".to_string(),
                name: issuer,
            },
            SignatureLine {
                role: "Work supervisor".to_string(),
                name: None,
            },
            SignatureLine {
                role: "Safety officer".to_string(),
                name: None,
            },
        ]))
        .in_section(Section::Conclusion),
    );
    doc
}
