//! Demo-data fallback for dashboard widgets
//!
//! When the backend cannot be reached a widget may show built-in demo data
//! instead of an empty panel. [`Sourced`] keeps the two cases apart so the
//! caller can label demo figures as such.

use integrity_common::models::{
    CriticalityCounts, CriticalityShare, DefectsTimelineItem, MethodDistribution, ObjectCategory,
    RiskLevel, StatsSummary, TopRiskObject,
};
use integrity_common::Result;
use std::future::Future;
use tracing::warn;

use crate::api::InspectionApi;

/// Value fetched from the backend or substituted demo data
#[derive(Debug, Clone, PartialEq)]
pub enum Sourced<T> {
    Live(T),
    Demo(T),
}

impl<T> Sourced<T> {
    pub fn is_demo(&self) -> bool {
        matches!(self, Sourced::Demo(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Sourced::Live(v) | Sourced::Demo(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Sourced::Live(v) | Sourced::Demo(v) => v,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        match self {
            Sourced::Live(v) => Sourced::Live(f(v)),
            Sourced::Demo(v) => Sourced::Demo(f(v)),
        }
    }
}

/// Await `fetch`; on a transport failure substitute `demo()`
///
/// Other errors (not found, validation) are returned unchanged.
pub async fn live_or_demo<T, F>(what: &str, fetch: F, demo: impl FnOnce() -> T) -> Result<Sourced<T>>
where
    F: Future<Output = Result<T>>,
{
    match fetch.await {
        Ok(value) => Ok(Sourced::Live(value)),
        Err(e) if e.is_transport() => {
            warn!(widget = %what, error = %e, "Fetch failed, showing demo data");
            Ok(Sourced::Demo(demo()))
        }
        Err(e) => Err(e),
    }
}

/// All dashboard analytics widgets
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSnapshot {
    pub stats: Sourced<StatsSummary>,
    pub top_risks: Sourced<Vec<TopRiskObject>>,
    pub methods: Sourced<Vec<MethodDistribution>>,
    pub criticality: Sourced<Vec<CriticalityShare>>,
    pub timeline: Sourced<Vec<DefectsTimelineItem>>,
}

impl AnalyticsSnapshot {
    /// True if any widget is showing demo data
    pub fn has_demo(&self) -> bool {
        self.stats.is_demo()
            || self.top_risks.is_demo()
            || self.methods.is_demo()
            || self.criticality.is_demo()
            || self.timeline.is_demo()
    }
}

/// Fetch every analytics widget concurrently
pub async fn load_analytics(api: &dyn InspectionApi, top_limit: u32) -> Result<AnalyticsSnapshot> {
    let (stats, top_risks, methods, criticality, timeline) = tokio::join!(
        live_or_demo("stats", api.stats_summary(), demo_stats),
        live_or_demo("top-risks", api.top_risks(top_limit), demo_top_risks),
        live_or_demo("methods", api.methods_distribution(), demo_methods),
        live_or_demo("criticality", api.criticality_distribution(), demo_criticality),
        live_or_demo("timeline", api.defects_timeline(), demo_timeline),
    );

    Ok(AnalyticsSnapshot {
        stats: stats?,
        top_risks: top_risks?,
        methods: methods?,
        criticality: criticality?,
        timeline: timeline?,
    })
}

pub fn demo_stats() -> StatsSummary {
    StatsSummary {
        total_objects: 48,
        total_diagnostics: 612,
        total_defects: 87,
        active_defects: 14,
        defects_percentage: 14.22,
        repairs_this_year: 9,
        criticality: CriticalityCounts {
            high: 23,
            medium: 64,
            normal: 525,
        },
        ..Default::default()
    }
}

pub fn demo_top_risks() -> Vec<TopRiskObject> {
    vec![
        TopRiskObject {
            object_id: 12,
            object_name: "MT-01 section 12".to_string(),
            object_type: ObjectCategory::PipelineSection,
            lat: Some(51.169),
            lon: Some(71.449),
            high_defects_count: 5,
        },
        TopRiskObject {
            object_id: 31,
            object_name: "Compressor station KS-3".to_string(),
            object_type: ObjectCategory::Compressor,
            lat: Some(47.094),
            lon: Some(51.923),
            high_defects_count: 3,
        },
        TopRiskObject {
            object_id: 7,
            object_name: "Crane K-7".to_string(),
            object_type: ObjectCategory::Crane,
            lat: Some(43.238),
            lon: Some(76.889),
            high_defects_count: 2,
        },
    ]
}

pub fn demo_methods() -> Vec<MethodDistribution> {
    [("VIK", 180, 21), ("UZK", 142, 25), ("MFL", 96, 19), ("UTWM", 74, 11), ("EC", 60, 6)]
        .into_iter()
        .map(|(method, total, defects)| MethodDistribution {
            method: method.to_string(),
            total,
            defects,
            percentage: round2(defects as f64 * 100.0 / total as f64),
        })
        .collect()
}

pub fn demo_criticality() -> Vec<CriticalityShare> {
    let counts = demo_stats().criticality;
    let total = counts.total() as f64;
    [
        (RiskLevel::Normal, counts.normal),
        (RiskLevel::Medium, counts.medium),
        (RiskLevel::High, counts.high),
    ]
    .into_iter()
    .map(|(label, count)| CriticalityShare {
        label,
        count,
        percentage: round2(count as f64 * 100.0 / total),
    })
    .collect()
}

pub fn demo_timeline() -> Vec<DefectsTimelineItem> {
    [(2021, 118, 19), (2022, 143, 22), (2023, 165, 24), (2024, 186, 22)]
        .into_iter()
        .map(|(year, total, defects)| DefectsTimelineItem {
            year,
            total,
            defects,
            percentage: round2(defects as f64 * 100.0 / total as f64),
        })
        .collect()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use integrity_common::Error;

    #[tokio::test]
    async fn test_live_value_passes_through() {
        let got = live_or_demo("stats", async { Ok(5u32) }, || 0).await.unwrap();
        assert_eq!(got, Sourced::Live(5));
    }

    #[tokio::test]
    async fn test_network_failure_uses_demo() {
        let got = live_or_demo(
            "stats",
            async { Err::<u32, _>(Error::Network("refused".into())) },
            || 42,
        )
        .await
        .unwrap();
        assert!(got.is_demo());
        assert_eq!(got.into_inner(), 42);
    }

    #[tokio::test]
    async fn test_not_found_is_not_masked() {
        let got = live_or_demo(
            "stats",
            async { Err::<u32, _>(Error::NotFound("Statistics".into())) },
            || 42,
        )
        .await;
        assert!(matches!(got, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_demo_data_is_consistent() {
        let shares = demo_criticality();
        let sum: u64 = shares.iter().map(|s| s.count).sum();
        assert_eq!(sum, demo_stats().criticality.total());
        assert!(demo_methods().iter().all(|m| m.defects <= m.total));
    }
}
