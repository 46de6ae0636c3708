//! Batched per-object diagnostic fetch
//!
//! Requests run in batches of at most `batch_size`; each batch completes
//! before the next starts.

use futures::future::join_all;
use integrity_common::models::{DiagnosticRecord, ObjectId};
use tracing::{debug, warn};

use crate::api::InspectionApi;

/// Diagnostics per object, in request order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<(ObjectId, Vec<DiagnosticRecord>)>,
    /// Objects whose fetch failed (reported with an empty list above)
    pub failed: Vec<ObjectId>,
}

impl BatchOutcome {
    pub fn diagnostics_for(&self, object_id: ObjectId) -> &[DiagnosticRecord] {
        self.results
            .iter()
            .find(|(id, _)| *id == object_id)
            .map(|(_, d)| d.as_slice())
            .unwrap_or(&[])
    }

    pub fn total_records(&self) -> usize {
        self.results.iter().map(|(_, d)| d.len()).sum()
    }
}

/// Fetch diagnostics for `object_ids`
///
/// A failed fetch yields an empty list for that object; it never aborts the
/// other fetches. A `batch_size` of 0 is treated as 1.
pub async fn fetch_diagnostics(
    api: &dyn InspectionApi,
    object_ids: &[ObjectId],
    batch_size: usize,
) -> BatchOutcome {
    let batch_size = batch_size.max(1);
    let mut outcome = BatchOutcome {
        results: Vec::with_capacity(object_ids.len()),
        failed: Vec::new(),
    };

    for (batch_no, batch) in object_ids.chunks(batch_size).enumerate() {
        debug!(batch = batch_no, size = batch.len(), "Fetching diagnostics batch");

        let fetches = batch.iter().map(|&object_id| async move {
            (object_id, api.object_diagnostics(object_id).await)
        });

        for (object_id, result) in join_all(fetches).await {
            match result {
                Ok(records) => outcome.results.push((object_id, records)),
                Err(e) => {
                    warn!(object_id, error = %e, "Diagnostics fetch failed, using empty list");
                    outcome.failed.push(object_id);
                    outcome.results.push((object_id, Vec::new()));
                }
            }
        }
    }

    debug!(
        objects = object_ids.len(),
        records = outcome.total_records(),
        failed = outcome.failed.len(),
        "Batched diagnostics fetch complete"
    );
    outcome
}
