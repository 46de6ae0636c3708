//! Work-permit operations with client-side lifecycle checks

use integrity_common::events::{EventBus, IntegrityEvent};
use integrity_common::models::{
    ObjectId, PermitNumber, PermitQuery, PermitStatus, PermitUpdate, WorkPermit, WorkPermitSummary,
};
use integrity_common::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::PermitApi;

pub struct PermitService {
    api: Arc<dyn PermitApi>,
    event_bus: EventBus,
}

impl PermitService {
    pub fn new(api: Arc<dyn PermitApi>, event_bus: EventBus) -> Self {
        Self { api, event_bus }
    }

    pub async fn list(&self, query: &PermitQuery) -> Result<Vec<WorkPermitSummary>> {
        self.api.list_permits(query).await
    }

    pub async fn get(&self, permit_id: i64) -> Result<WorkPermit> {
        self.api.permit(permit_id).await
    }

    /// Look up by `ND-YYYY-NNNN`; malformed numbers fail before any request
    pub async fn by_number(&self, permit_number: &str) -> Result<WorkPermit> {
        let permit_number = permit_number.trim();
        permit_number.parse::<PermitNumber>()?;
        self.api.permit_by_number(permit_number).await
    }

    pub async fn for_object(&self, object_id: ObjectId) -> Result<Vec<WorkPermitSummary>> {
        self.api.permits_for_object(object_id).await
    }

    /// Issue a permit for an object; the backend assigns the number
    pub async fn issue(
        &self,
        object_id: ObjectId,
        issued_by: Option<&str>,
        notes: Option<&str>,
    ) -> Result<WorkPermit> {
        let permit = self
            .api
            .create_permit_for_object(object_id, issued_by, notes)
            .await?;

        if permit.permit_number.parse::<PermitNumber>().is_err() {
            warn!(permit_number = %permit.permit_number, "Backend issued a non-standard permit number");
        }
        self.event_bus.emit_lossy(IntegrityEvent::PermitIssued {
            permit_number: permit.permit_number.clone(),
            object_id,
            timestamp: chrono::Utc::now(),
        });
        Ok(permit)
    }

    /// Move a permit to `next`, rejecting transitions out of terminal states
    pub async fn transition(&self, permit_id: i64, next: PermitStatus, actor: Option<&str>) -> Result<WorkPermit> {
        let current = self.api.permit(permit_id).await?;
        if !current.status.can_transition_to(next) {
            return Err(Error::Validation(format!(
                "Permit {} cannot go from {} to {}",
                current.permit_number, current.status, next
            )));
        }

        let update = match next {
            PermitStatus::Closed => PermitUpdate::close(
                actor.unwrap_or("system"),
                chrono::Utc::now().date_naive(),
            ),
            other => PermitUpdate {
                status: Some(other),
                ..Default::default()
            },
        };

        let updated = self.api.update_permit(permit_id, &update).await?;
        info!(
            permit_number = %updated.permit_number,
            from = %current.status,
            to = %updated.status,
            "Work permit status changed"
        );
        Ok(updated)
    }

    pub async fn close(&self, permit_id: i64, closed_by: &str) -> Result<WorkPermit> {
        self.transition(permit_id, PermitStatus::Closed, Some(closed_by)).await
    }
}
