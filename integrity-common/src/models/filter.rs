//! Filter value object shared by the data store and the map store
//!
//! A filter with no field set means "no filter". Stores keep filters in
//! normalized form (`Option<Filter>`, never `Some(empty)`) so that value
//! equality is a reliable guard against update ping-pong.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::diagnostic::DiagnosticMethod;
use super::object::RiskLevel;
use crate::{Error, Result};

/// Inclusive numeric range for one measurement parameter
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ParamRange {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    fn normalized(self) -> Self {
        Self {
            min: self.min.filter(|v| v.is_finite()),
            max: self.max.filter(|v| v.is_finite()),
        }
    }
}

/// Sort column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Param1,
    Param2,
    Param3,
    Date,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Param1 => "param1",
            SortKey::Param2 => "param2",
            SortKey::Param3 => "param3",
            SortKey::Date => "date",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Sort key plus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

/// Object list filter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub pipeline_id: Option<String>,
    #[serde(default)]
    pub method: Option<DiagnosticMethod>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub params: [ParamRange; 3],
    #[serde(default)]
    pub sort: Option<SortSpec>,
}

impl Filter {
    pub fn pipeline(pipeline_id: impl Into<String>) -> Self {
        Self::default().with_pipeline(pipeline_id)
    }

    pub fn with_pipeline(mut self, pipeline_id: impl Into<String>) -> Self {
        self.pipeline_id = Some(pipeline_id.into());
        self
    }

    pub fn with_method(mut self, method: DiagnosticMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk_level = Some(risk);
        self
    }

    pub fn with_dates(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// `index` is 0-based (param1 is index 0)
    pub fn with_param_range(mut self, index: usize, min: Option<f64>, max: Option<f64>) -> Self {
        if let Some(range) = self.params.get_mut(index) {
            *range = ParamRange { min, max };
        }
        self
    }

    pub fn with_sort(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort = Some(SortSpec { key, order });
        self
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.pipeline_id.is_none()
            && self.method.is_none()
            && self.risk_level.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
            && self.params.iter().all(ParamRange::is_empty)
            && self.sort.is_none()
    }

    /// Canonical form: blank pipeline ids and non-finite bounds dropped,
    /// empty filter collapsed to `None`
    pub fn normalize(filter: Option<Filter>) -> Option<Filter> {
        let mut filter = filter?;
        filter.pipeline_id = filter
            .pipeline_id
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        for range in filter.params.iter_mut() {
            *range = range.normalized();
        }
        if filter.is_empty() {
            None
        } else {
            Some(filter)
        }
    }

    /// Reject inverted ranges
    pub fn validate(&self) -> Result<()> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(Error::Validation(format!(
                    "Date range is inverted: {} is after {}",
                    from, to
                )));
            }
        }
        for (i, range) in self.params.iter().enumerate() {
            if let (Some(min), Some(max)) = (range.min, range.max) {
                if min > max {
                    return Err(Error::Validation(format!(
                        "param{} range is inverted: {} > {}",
                        i + 1,
                        min,
                        max
                    )));
                }
            }
        }
        Ok(())
    }

    /// Query parameters understood by `GET /api/objects`
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(pipeline) = &self.pipeline_id {
            pairs.push(("pipeline_id".to_string(), pipeline.clone()));
        }
        if let Some(method) = self.method {
            pairs.push(("method".to_string(), method.code().to_string()));
        }
        if let Some(risk) = self.risk_level {
            pairs.push(("risk_level".to_string(), risk.as_str().to_string()));
        }
        if let Some(from) = self.date_from {
            pairs.push(("date_from".to_string(), from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.date_to {
            pairs.push(("date_to".to_string(), to.format("%Y-%m-%d").to_string()));
        }
        for (i, range) in self.params.iter().enumerate() {
            if let Some(min) = range.min {
                pairs.push((format!("param{}_min", i + 1), min.to_string()));
            }
            if let Some(max) = range.max {
                pairs.push((format!("param{}_max", i + 1), max.to_string()));
            }
        }
        if let Some(sort) = self.sort {
            pairs.push(("sort_by".to_string(), sort.key.as_str().to_string()));
            pairs.push(("sort_order".to_string(), sort.order.as_str().to_string()));
        }
        pairs
    }

    /// One-line description for logs and report headers
    pub fn describe(filter: Option<&Filter>) -> String {
        match filter {
            None => "all objects".to_string(),
            Some(f) => f
                .to_query_pairs()
                .into_iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}
