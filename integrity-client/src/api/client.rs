//! HTTP implementation of the backend API traits

use async_trait::async_trait;
use integrity_common::models::{
    ChatReply, ChatRequest, ChatTurn, CriticalityShare, DefectsTimelineItem, DiagnosticRecord,
    ImportStats, InspectionObject, MarkFixedOutcome, MethodDistribution, MlDrift, MlMetrics,
    MlStatus, MlSuggestions, ObjectId, PermitQuery, PermitUpdate, StatsSummary, TemplateKind,
    TopRiskObject, WorkPermit, WorkPermitSummary,
};
use integrity_common::{Error, Filter, Result};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{ChatApi, ImportApi, InspectionApi, MlApi, PermitApi, UploadFile};

const USER_AGENT: &str = concat!("integrity-os/", env!("CARGO_PKG_VERSION"));

/// Longest backend error body kept in an error message
const MAX_ERROR_BODY: usize = 300;

/// REST client for the IntegrityOS backend
#[derive(Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    /// `{base_url}/api`
    api_root: String,
}

impl ApiClient {
    /// `base_url` is the backend root, e.g. `http://localhost:8000`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_root: format!("{}/api", base_url.trim_end_matches('/')),
        })
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_root, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        what: &str,
    ) -> Result<T> {
        let url = self.url(path);
        tracing::debug!(url = %url, params = query.len(), "GET");

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(network_error)?;

        decode(check_status(response, what).await?).await
    }

    async fn get_bytes(&self, path: &str, what: &str) -> Result<Vec<u8>> {
        let url = self.url(path);
        tracing::debug!(url = %url, "GET (binary)");

        let response = self.http_client.get(&url).send().await.map_err(network_error)?;
        let bytes = check_status(response, what)
            .await?
            .bytes()
            .await
            .map_err(network_error)?;
        Ok(bytes.to_vec())
    }
}

fn network_error(err: reqwest::Error) -> Error {
    if err.is_decode() {
        Error::Decode(err.to_string())
    } else {
        Error::Network(err.to_string())
    }
}

/// Map non-success statuses to the error taxonomy
///
/// The backend reports failures as `{"detail": "..."}`.
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_detail(&body);

    if status == reqwest::StatusCode::NOT_FOUND {
        tracing::debug!(what = %what, detail = %message, "Backend returned 404");
        return Err(Error::NotFound(what.to_string()));
    }

    tracing::warn!(status = status.as_u16(), what = %what, detail = %message, "Backend request failed");
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

fn error_detail(body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .unwrap_or_else(|| body.trim().to_string());

    if detail.chars().count() > MAX_ERROR_BODY {
        detail.chars().take(MAX_ERROR_BODY).collect::<String>() + "..."
    } else {
        detail
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let bytes = response.bytes().await.map_err(network_error)?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Decode(e.to_string()))
}

/// `success == false` with a 2xx status is still a failed import
fn import_outcome(stats: ImportStats) -> Result<ImportStats> {
    if stats.success {
        Ok(stats)
    } else {
        Err(Error::Api {
            status: 200,
            message: stats
                .error
                .clone()
                .unwrap_or_else(|| "Import failed".to_string()),
        })
    }
}

#[async_trait]
impl InspectionApi for ApiClient {
    async fn list_objects(&self, filter: Option<&Filter>) -> Result<Vec<InspectionObject>> {
        let query = filter.map(Filter::to_query_pairs).unwrap_or_default();
        let objects: Vec<InspectionObject> = self.get_json("/objects", &query, "objects").await?;
        tracing::debug!(count = objects.len(), filter = %Filter::describe(filter), "Fetched objects");
        Ok(objects)
    }

    async fn object_diagnostics(&self, object_id: ObjectId) -> Result<Vec<DiagnosticRecord>> {
        self.get_json(
            &format!("/diagnostics/{}", object_id),
            &[],
            &format!("Diagnostics for object {}", object_id),
        )
        .await
    }

    async fn stats_summary(&self) -> Result<StatsSummary> {
        self.get_json("/analytics/stats-summary", &[], "Statistics").await
    }

    async fn top_risks(&self, limit: u32) -> Result<Vec<TopRiskObject>> {
        self.get_json(
            "/analytics/top-risks",
            &[("limit".to_string(), limit.to_string())],
            "Top risks",
        )
        .await
    }

    async fn methods_distribution(&self) -> Result<Vec<MethodDistribution>> {
        self.get_json("/analytics/methods-distribution", &[], "Method distribution")
            .await
    }

    async fn criticality_distribution(&self) -> Result<Vec<CriticalityShare>> {
        self.get_json("/analytics/criticality-distribution", &[], "Criticality distribution")
            .await
    }

    async fn defects_timeline(&self) -> Result<Vec<DefectsTimelineItem>> {
        self.get_json("/analytics/defects-timeline", &[], "Defects timeline")
            .await
    }

    async fn mark_fixed(&self, object_id: ObjectId) -> Result<MarkFixedOutcome> {
        let url = self.url(&format!("/diagnostics/mark-fixed/{}", object_id));
        tracing::info!(object_id, "Marking object as repaired");

        let response = self.http_client.post(&url).send().await.map_err(network_error)?;
        decode(check_status(response, &format!("Object {}", object_id)).await?).await
    }
}

#[async_trait]
impl ImportApi for ApiClient {
    async fn upload(&self, files: Vec<UploadFile>, clear_existing: bool) -> Result<ImportStats> {
        let url = self.url("/import/upload");
        let mut form = Form::new();
        for (i, file) in files.into_iter().enumerate() {
            tracing::debug!(field = i + 1, file = %file.file_name, bytes = file.bytes.len(), "Attaching import file");
            let part = Part::bytes(file.bytes).file_name(file.file_name);
            form = form.part(format!("file{}", i + 1), part);
        }

        let response = self
            .http_client
            .post(&url)
            .query(&[("clear_existing", clear_existing)])
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;

        let stats: ImportStats = decode(check_status(response, "Import").await?).await?;
        import_outcome(stats)
    }

    async fn template(&self, kind: TemplateKind) -> Result<Vec<u8>> {
        self.get_bytes(
            &format!("/import/template/{}", kind.path_segment()),
            "Import template",
        )
        .await
    }

    async fn import_sample_dataset(&self, clear_existing: bool) -> Result<ImportStats> {
        let url = self.url("/import/hackathon");
        let response = self
            .http_client
            .post(&url)
            .query(&[("clear_existing", clear_existing)])
            .send()
            .await
            .map_err(network_error)?;

        let stats: ImportStats = decode(check_status(response, "Sample dataset").await?).await?;
        import_outcome(stats)
    }
}

#[async_trait]
impl PermitApi for ApiClient {
    async fn list_permits(&self, query: &PermitQuery) -> Result<Vec<WorkPermitSummary>> {
        let pairs: Vec<(String, String)> = query
            .to_query_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        self.get_json("/work-permits", &pairs, "Work permits").await
    }

    async fn permit(&self, permit_id: i64) -> Result<WorkPermit> {
        self.get_json(
            &format!("/work-permits/{}", permit_id),
            &[],
            &format!("Work permit {}", permit_id),
        )
        .await
    }

    async fn permit_by_number(&self, permit_number: &str) -> Result<WorkPermit> {
        self.get_json(
            &format!("/work-permits/by-number/{}", permit_number),
            &[],
            &format!("Work permit {}", permit_number),
        )
        .await
    }

    async fn permits_for_object(&self, object_id: ObjectId) -> Result<Vec<WorkPermitSummary>> {
        self.get_json(
            &format!("/work-permits/for-object/{}", object_id),
            &[],
            &format!("Object {}", object_id),
        )
        .await
    }

    async fn create_permit_for_object(
        &self,
        object_id: ObjectId,
        issued_by: Option<&str>,
        notes: Option<&str>,
    ) -> Result<WorkPermit> {
        let url = self.url(&format!("/work-permits/create-for-object/{}", object_id));
        let mut query = Vec::new();
        if let Some(by) = issued_by {
            query.push(("issued_by", by));
        }
        if let Some(n) = notes {
            query.push(("notes", n));
        }

        let response = self
            .http_client
            .post(&url)
            .query(&query)
            .send()
            .await
            .map_err(network_error)?;

        let permit: WorkPermit =
            decode(check_status(response, &format!("Object {}", object_id)).await?).await?;
        tracing::info!(object_id, permit_number = %permit.permit_number, "Work permit issued");
        Ok(permit)
    }

    async fn update_permit(&self, permit_id: i64, update: &PermitUpdate) -> Result<WorkPermit> {
        let url = self.url(&format!("/work-permits/{}", permit_id));
        let response = self
            .http_client
            .patch(&url)
            .json(update)
            .send()
            .await
            .map_err(network_error)?;

        decode(check_status(response, &format!("Work permit {}", permit_id)).await?).await
    }
}

#[async_trait]
impl ChatApi for ApiClient {
    async fn chat(&self, message: &str, history: &[ChatTurn]) -> Result<ChatReply> {
        let url = self.url("/ai/chat");
        let request = ChatRequest {
            message: message.to_string(),
            conversation_history: history.to_vec(),
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(network_error)?;

        decode(check_status(response, "Assistant").await?).await
    }
}

#[async_trait]
impl MlApi for ApiClient {
    async fn ml_status(&self) -> Result<MlStatus> {
        self.get_json("/ml/status", &[], "Model status").await
    }

    async fn ml_metrics(&self) -> Result<MlMetrics> {
        self.get_json("/ml/monitor/metrics", &[], "Model metrics").await
    }

    async fn ml_drift(&self) -> Result<MlDrift> {
        self.get_json("/ml/drift", &[], "Drift check").await
    }

    async fn ml_suggestions(&self) -> Result<MlSuggestions> {
        self.get_json("/ml/monitor/suggestions", &[], "Model suggestions").await
    }
}
