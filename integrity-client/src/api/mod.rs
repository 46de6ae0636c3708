//! Backend REST API seam
//!
//! Each trait groups the endpoints one client component needs so tests can
//! substitute an in-memory backend. [`ApiClient`] implements all of them
//! over HTTP.

pub mod client;

pub use client::ApiClient;

use async_trait::async_trait;
use integrity_common::models::{
    ChatReply, ChatTurn, CriticalityShare, DefectsTimelineItem, DiagnosticRecord, ImportStats,
    InspectionObject, MarkFixedOutcome, MethodDistribution, MlDrift, MlMetrics, MlStatus,
    MlSuggestions, ObjectId, PermitQuery, PermitUpdate, StatsSummary, TemplateKind, TopRiskObject,
    WorkPermit, WorkPermitSummary,
};
use integrity_common::{Filter, Result};

/// Objects, diagnostics and analytics
#[async_trait]
pub trait InspectionApi: Send + Sync {
    /// `GET /api/objects`, scoped by `filter` when present
    async fn list_objects(&self, filter: Option<&Filter>) -> Result<Vec<InspectionObject>>;

    /// `GET /api/diagnostics/{object_id}`
    async fn object_diagnostics(&self, object_id: ObjectId) -> Result<Vec<DiagnosticRecord>>;

    async fn stats_summary(&self) -> Result<StatsSummary>;

    async fn top_risks(&self, limit: u32) -> Result<Vec<TopRiskObject>>;

    async fn methods_distribution(&self) -> Result<Vec<MethodDistribution>>;

    async fn criticality_distribution(&self) -> Result<Vec<CriticalityShare>>;

    async fn defects_timeline(&self) -> Result<Vec<DefectsTimelineItem>>;

    /// Record a repair for the object's latest defect
    async fn mark_fixed(&self, object_id: ObjectId) -> Result<MarkFixedOutcome>;
}

/// One file to upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Import and template endpoints
#[async_trait]
pub trait ImportApi: Send + Sync {
    /// `POST /api/import/upload` as multipart `file1` / `file2`
    async fn upload(&self, files: Vec<UploadFile>, clear_existing: bool) -> Result<ImportStats>;

    /// `GET /api/import/template/{kind}`
    async fn template(&self, kind: TemplateKind) -> Result<Vec<u8>>;

    /// `POST /api/import/hackathon`: load the bundled sample dataset
    async fn import_sample_dataset(&self, clear_existing: bool) -> Result<ImportStats>;
}

/// Work permit endpoints
#[async_trait]
pub trait PermitApi: Send + Sync {
    async fn list_permits(&self, query: &PermitQuery) -> Result<Vec<WorkPermitSummary>>;

    async fn permit(&self, permit_id: i64) -> Result<WorkPermit>;

    async fn permit_by_number(&self, permit_number: &str) -> Result<WorkPermit>;

    async fn permits_for_object(&self, object_id: ObjectId) -> Result<Vec<WorkPermitSummary>>;

    /// `POST /api/work-permits/create-for-object/{object_id}`
    async fn create_permit_for_object(
        &self,
        object_id: ObjectId,
        issued_by: Option<&str>,
        notes: Option<&str>,
    ) -> Result<WorkPermit>;

    /// `PATCH /api/work-permits/{permit_id}`
    async fn update_permit(&self, permit_id: i64, update: &PermitUpdate) -> Result<WorkPermit>;
}

/// AI assistant endpoint
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `POST /api/ai/chat`
    async fn chat(&self, message: &str, history: &[ChatTurn]) -> Result<ChatReply>;
}

/// Risk-model status and monitoring, read-only
#[async_trait]
pub trait MlApi: Send + Sync {
    /// `GET /api/ml/status`
    async fn ml_status(&self) -> Result<MlStatus>;

    /// `GET /api/ml/monitor/metrics`
    async fn ml_metrics(&self) -> Result<MlMetrics>;

    /// `GET /api/ml/drift`
    async fn ml_drift(&self) -> Result<MlDrift>;

    /// `GET /api/ml/monitor/suggestions`
    async fn ml_suggestions(&self) -> Result<MlSuggestions>;
}
