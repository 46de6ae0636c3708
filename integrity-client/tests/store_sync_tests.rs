//! Map store / data store filter synchronization through the Dashboard

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use helpers::{object, wait_for, FakeApi};
use integrity_client::map::{MapView, DEFAULT_FLY_DURATION};
use integrity_client::store::Dashboard;
use integrity_common::events::{FilterOrigin, IntegrityEvent};
use integrity_common::models::{LocationStatus, RiskLevel};
use integrity_common::Filter;

fn objects() -> Vec<integrity_common::models::InspectionObject> {
    let mut other_pipeline = object(3, Some(47.1), Some(51.9), None);
    other_pipeline.pipeline_id = Some("MT-02".to_string());
    vec![
        object(1, Some(51.17), Some(71.45), Some(RiskLevel::High)),
        object(2, Some(51.20), Some(71.50), Some(RiskLevel::Medium)),
        other_pipeline,
    ]
}

fn is_refreshed(e: &IntegrityEvent) -> bool {
    matches!(e, IntegrityEvent::DataRefreshed { .. })
}

#[tokio::test]
async fn test_map_filter_reaches_data_store() {
    let api = Arc::new(FakeApi::new(objects()));
    let mut dashboard = Dashboard::new(api.clone());
    let mut rx = dashboard.event_bus().subscribe();
    dashboard.start();

    assert!(dashboard.map().set_filter(Some(Filter::pipeline("MT-02"))).await.unwrap());
    wait_for(&mut rx, is_refreshed).await;

    assert_eq!(dashboard.data().filter().await, Some(Filter::pipeline("MT-02")));
    let state = dashboard.data().snapshot().await;
    assert_eq!(state.objects.len(), 1);
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert_eq!(api.filters_seen.lock().unwrap().last().cloned(), Some(Some(Filter::pipeline("MT-02"))));

    dashboard.shutdown().await;
}

#[tokio::test]
async fn test_data_filter_pushes_to_map_silently() {
    let api = Arc::new(FakeApi::new(objects()));
    let mut dashboard = Dashboard::new(api.clone());
    let mut rx = dashboard.event_bus().subscribe();
    dashboard.start();

    assert!(dashboard.data().set_filter(Some(Filter::pipeline("MT-01"))).await.unwrap());
    assert_eq!(dashboard.map().filter().await, Some(Filter::pipeline("MT-01")));

    // The only events are the refresh; no FilterChanged echo
    let event = wait_for(&mut rx, |_| true).await;
    assert!(is_refreshed(&event));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(api.requests(), 1);

    dashboard.shutdown().await;
}

async fn wait_for_data_filter(dashboard: &Dashboard, expected: Option<Filter>) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while dashboard.data().filter().await != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("data store never settled");
}

#[tokio::test]
async fn test_repeated_filters_do_not_loop() {
    let api = Arc::new(FakeApi::new(objects()));
    let mut dashboard = Dashboard::new(api.clone());
    dashboard.start();
    let map_rev_before = dashboard.map().revision().await;

    let filters = [
        Some(Filter::pipeline("MT-01")),
        Some(Filter::pipeline("MT-01")),
        Some(Filter::pipeline(" MT-01 ")),
        None,
        Some(Filter::default()),
        Some(Filter::pipeline("MT-02")),
    ];
    let mut changed = 0;
    for f in filters {
        if dashboard.map().set_filter(f).await.unwrap() {
            changed += 1;
        }
    }
    assert_eq!(changed, 3);

    wait_for_data_filter(&dashboard, Some(Filter::pipeline("MT-02"))).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Superseded filters may be skipped, never replayed
    let requests = api.requests();
    assert!((1..=3).contains(&requests), "unexpected request count {}", requests);
    assert_eq!(dashboard.map().revision().await, map_rev_before + 3);
    assert_eq!(dashboard.map().filter().await, Some(Filter::pipeline("MT-02")));
    assert_eq!(
        api.filters_seen.lock().unwrap().last().cloned(),
        Some(Some(Filter::pipeline("MT-02")))
    );

    dashboard.shutdown().await;
}

#[tokio::test]
async fn test_failed_refresh_keeps_stale_data() {
    let api = Arc::new(FakeApi::new(objects()));
    let dashboard = Dashboard::new(api.clone());

    assert!(dashboard.data().refresh().await);
    let before = dashboard.data().snapshot().await;
    assert_eq!(before.objects.len(), 3);

    api.set_failing(true);
    let mut rx = dashboard.event_bus().subscribe();
    assert!(!dashboard.data().refresh().await);

    let after = dashboard.data().snapshot().await;
    assert_eq!(after.objects, before.objects);
    assert_eq!(after.last_synced, before.last_synced);
    assert!(after.error.is_some());
    assert!(!after.loading);
    assert!(matches!(
        wait_for(&mut rx, |_| true).await,
        IntegrityEvent::RefreshFailed { .. }
    ));

    api.set_failing(false);
    assert!(dashboard.data().refresh().await);
    assert!(dashboard.data().snapshot().await.error.is_none());
}

#[tokio::test]
async fn test_inverted_range_is_rejected() {
    let api = Arc::new(FakeApi::new(objects()));
    let mut dashboard = Dashboard::new(api.clone());
    dashboard.start();

    let inverted = Filter::default().with_dates(
        NaiveDate::from_ymd_opt(2024, 12, 1),
        NaiveDate::from_ymd_opt(2024, 1, 1),
    );
    assert!(dashboard.data().set_filter(Some(inverted)).await.is_err());
    assert_eq!(dashboard.data().filter().await, None);
    assert!(dashboard.data().snapshot().await.error.is_some());
    assert_eq!(api.requests(), 0);

    dashboard.shutdown().await;
}

#[tokio::test]
async fn test_inverted_range_from_map_keeps_stores_together() {
    let api = Arc::new(FakeApi::new(objects()));
    let mut dashboard = Dashboard::new(api.clone());
    dashboard.start();

    assert!(dashboard.map().set_filter(Some(Filter::pipeline("MT-02"))).await.unwrap());
    wait_for_data_filter(&dashboard, Some(Filter::pipeline("MT-02"))).await;

    let inverted = Filter::pipeline("MT-01").with_dates(
        NaiveDate::from_ymd_opt(2024, 5, 1),
        NaiveDate::from_ymd_opt(2024, 4, 1),
    );
    assert!(dashboard.map().set_filter(Some(inverted)).await.is_err());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(dashboard.map().filter().await, Some(Filter::pipeline("MT-02")));
    assert_eq!(dashboard.data().filter().await, dashboard.map().filter().await);
    assert_eq!(api.requests(), 1);

    dashboard.shutdown().await;
}

#[tokio::test]
async fn test_periodic_refresh_stops_on_shutdown() {
    let api = Arc::new(FakeApi::new(objects()));
    let mut dashboard = Dashboard::new(api.clone());
    let mut rx = dashboard.event_bus().subscribe();
    dashboard.start_with_refresh(Duration::from_millis(20));
    assert!(dashboard.is_running());

    wait_for(&mut rx, is_refreshed).await;
    wait_for(&mut rx, is_refreshed).await;
    dashboard.shutdown().await;

    let seen = api.requests();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(api.requests(), seen);
}

#[tokio::test]
async fn test_fly_to_skips_unusable_locations() {
    let api = Arc::new(FakeApi::new(objects()));
    let dashboard = Dashboard::new(api);
    let map = dashboard.map();

    let mut nan = object(10, Some(f64::NAN), Some(71.0), None);
    let zero = object(11, Some(0.0), Some(0.0), None);
    let mut pending = object(12, Some(51.0), Some(71.0), None);
    pending.location_status = Some(LocationStatus::Pending);
    let good = object(1, Some(51.17), Some(71.45), Some(RiskLevel::High));

    let view = MapView::mount(map, &[nan.clone(), zero.clone(), pending.clone(), good.clone()]);
    assert_eq!(view.markers().len(), 1);

    for o in [&nan, &zero, &pending] {
        assert!(!map.fly_to_object(o, DEFAULT_FLY_DURATION).await);
        assert_eq!(map.highlighted().await, Some(o.id));
    }
    assert!(view.last_camera_move().is_none());

    assert!(map.fly_to_object(&good, DEFAULT_FLY_DURATION).await);
    assert_eq!(view.open_popup(), Some(1));
    assert_eq!(view.last_camera_move().and_then(|m| m.target), Some(1));

    nan.lat = Some(50.0);
    drop(view);
    assert!(!map.camera_mounted());
    assert!(!map.fly_to_object(&nan, DEFAULT_FLY_DURATION).await);
}

#[tokio::test]
async fn test_filter_event_origin() {
    let api = Arc::new(FakeApi::new(objects()));
    let dashboard = Dashboard::new(api);
    let mut rx = dashboard.event_bus().subscribe();

    dashboard.map().set_filter(Some(Filter::pipeline("MT-01"))).await.unwrap();
    match wait_for(&mut rx, |_| true).await {
        IntegrityEvent::FilterChanged { origin, filter, .. } => {
            assert_eq!(origin, FilterOrigin::MapStore);
            assert_eq!(filter, Some(Filter::pipeline("MT-01")));
        }
        other => panic!("unexpected event {:?}", other),
    }
}
