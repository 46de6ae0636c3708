//! Shared fakes for client integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use integrity_client::api::InspectionApi;
use integrity_common::events::IntegrityEvent;
use integrity_common::models::{
    CriticalityShare, DefectsTimelineItem, DiagnosticMethod, DiagnosticRecord, InspectionObject,
    LocationStatus, MarkFixedOutcome, MethodDistribution, ObjectCategory, ObjectId, ObjectStatus,
    RiskLevel, StatsSummary, TopRiskObject,
};
use integrity_common::{Error, Filter, Result};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;

pub fn object(id: ObjectId, lat: Option<f64>, lon: Option<f64>, risk: Option<RiskLevel>) -> InspectionObject {
    InspectionObject {
        id,
        name: format!("Object {}", id),
        category: ObjectCategory::PipelineSection,
        pipeline_id: Some("MT-01".to_string()),
        lat,
        lon,
        location_status: Some(LocationStatus::Verified),
        status: if risk == Some(RiskLevel::High) { ObjectStatus::Critical } else { ObjectStatus::Normal },
        risk_level: risk,
    }
}

pub fn diagnostic(diag_id: i64, object_id: ObjectId, defect: bool) -> DiagnosticRecord {
    DiagnosticRecord {
        diag_id,
        object_id,
        method: DiagnosticMethod::MFL,
        date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
        temperature: None,
        humidity: None,
        illumination: None,
        defect_found: defect,
        defect_description: defect.then(|| format!("defect {}", diag_id)),
        quality_grade: None,
        param1: Some(diag_id as f64 / 3.0),
        param2: None,
        param3: None,
        ml_label: None,
        source_file: None,
        ml_probabilities: None,
    }
}

/// In-memory backend
///
/// Records every filter it was asked for and tracks the peak number of
/// concurrent diagnostic requests.
pub struct FakeApi {
    pub objects: Vec<InspectionObject>,
    pub filters_seen: Mutex<Vec<Option<Filter>>>,
    pub fail: AtomicBool,
    pub failing_ids: HashSet<ObjectId>,
    pub diagnostics_delay: Duration,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl FakeApi {
    pub fn new(objects: Vec<InspectionObject>) -> Self {
        Self {
            objects,
            filters_seen: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            failing_ids: HashSet::new(),
            diagnostics_delay: Duration::from_millis(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> usize {
        self.filters_seen.lock().unwrap().len()
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(Error::Network("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl InspectionApi for FakeApi {
    async fn list_objects(&self, filter: Option<&Filter>) -> Result<Vec<InspectionObject>> {
        self.filters_seen.lock().unwrap().push(filter.cloned());
        self.check()?;
        Ok(self
            .objects
            .iter()
            .filter(|o| match filter.and_then(|f| f.pipeline_id.as_deref()) {
                Some(p) => o.pipeline_id.as_deref() == Some(p),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn object_diagnostics(&self, object_id: ObjectId) -> Result<Vec<DiagnosticRecord>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.diagnostics_delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_ids.contains(&object_id) {
            return Err(Error::Api {
                status: 500,
                message: "boom".to_string(),
            });
        }
        Ok(vec![
            diagnostic(object_id * 10, object_id, true),
            diagnostic(object_id * 10 + 1, object_id, false),
        ])
    }

    async fn stats_summary(&self) -> Result<StatsSummary> {
        self.check()?;
        Ok(StatsSummary {
            total_objects: self.objects.len() as u64,
            ..Default::default()
        })
    }

    async fn top_risks(&self, _limit: u32) -> Result<Vec<TopRiskObject>> {
        Ok(Vec::new())
    }

    async fn methods_distribution(&self) -> Result<Vec<MethodDistribution>> {
        Ok(Vec::new())
    }

    async fn criticality_distribution(&self) -> Result<Vec<CriticalityShare>> {
        Ok(Vec::new())
    }

    async fn defects_timeline(&self) -> Result<Vec<DefectsTimelineItem>> {
        Ok(Vec::new())
    }

    async fn mark_fixed(&self, object_id: ObjectId) -> Result<MarkFixedOutcome> {
        Err(Error::NotFound(format!("Object {}", object_id)))
    }
}

/// Wait for the first event matching `pred`, failing the test after 2s
pub async fn wait_for<F>(rx: &mut broadcast::Receiver<IntegrityEvent>, mut pred: F) -> IntegrityEvent
where
    F: FnMut(&IntegrityEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("event bus closed: {}", e),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
