//! Batched diagnostics fetch against the in-memory backend

mod helpers;

use std::sync::atomic::Ordering;
use std::time::Duration;

use helpers::FakeApi;
use integrity_client::batch::fetch_diagnostics;
use integrity_common::models::ObjectId;

fn slow_api(failing: &[ObjectId]) -> FakeApi {
    let mut api = FakeApi::new(Vec::new());
    api.diagnostics_delay = Duration::from_millis(20);
    api.failing_ids.extend(failing.iter().copied());
    api
}

#[tokio::test]
async fn test_batches_bound_concurrency_and_keep_order() {
    let api = slow_api(&[5]);
    let ids: Vec<ObjectId> = (1..=10).collect();

    let outcome = fetch_diagnostics(&api, &ids, 3).await;

    assert_eq!(api.peak_in_flight.load(Ordering::SeqCst), 3);
    let order: Vec<ObjectId> = outcome.results.iter().map(|(id, _)| *id).collect();
    assert_eq!(order, ids);

    assert_eq!(outcome.failed, vec![5]);
    assert!(outcome.diagnostics_for(5).is_empty());
    assert_eq!(outcome.diagnostics_for(4).len(), 2);
    assert_eq!(outcome.total_records(), 18);
}

#[tokio::test]
async fn test_zero_batch_size_is_sequential() {
    let api = slow_api(&[]);
    let outcome = fetch_diagnostics(&api, &[1, 2, 3], 0).await;

    assert_eq!(api.peak_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.failed.is_empty());
}

#[tokio::test]
async fn test_every_fetch_failing_still_reports_each_object() {
    let api = slow_api(&[1, 2]);
    let outcome = fetch_diagnostics(&api, &[1, 2], 5).await;

    assert_eq!(outcome.failed, vec![1, 2]);
    assert_eq!(outcome.total_records(), 0);
    assert_eq!(outcome.results.len(), 2);
}

#[tokio::test]
async fn test_no_objects() {
    let api = FakeApi::new(Vec::new());
    let outcome = fetch_diagnostics(&api, &[], 4).await;
    assert_eq!(outcome, Default::default());
    assert_eq!(api.peak_in_flight.load(Ordering::SeqCst), 0);
}
