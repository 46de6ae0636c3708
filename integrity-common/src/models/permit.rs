//! Work permits (`/api/work-permits`)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::object::ObjectId;
use crate::Error;

/// Permit lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermitStatus {
    Issued,
    Active,
    Closed,
    Cancelled,
}

impl PermitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermitStatus::Issued => "issued",
            PermitStatus::Active => "active",
            PermitStatus::Closed => "closed",
            PermitStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PermitStatus::Closed | PermitStatus::Cancelled)
    }

    /// issued → active | closed | cancelled, active → closed | cancelled
    pub fn can_transition_to(&self, next: PermitStatus) -> bool {
        match (self, next) {
            (PermitStatus::Issued, PermitStatus::Active)
            | (PermitStatus::Issued, PermitStatus::Closed)
            | (PermitStatus::Issued, PermitStatus::Cancelled)
            | (PermitStatus::Active, PermitStatus::Closed)
            | (PermitStatus::Active, PermitStatus::Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PermitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermitStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "issued" => Ok(PermitStatus::Issued),
            "active" => Ok(PermitStatus::Active),
            "closed" => Ok(PermitStatus::Closed),
            "cancelled" => Ok(PermitStatus::Cancelled),
            other => Err(Error::Validation(format!("Unknown permit status: {}", other))),
        }
    }
}

/// Human-readable permit number, `ND-YYYY-NNNN`
///
/// Numbering restarts every year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermitNumber {
    pub year: i32,
    pub sequence: u32,
}

impl PermitNumber {
    /// Number following the latest one issued in `year` (if any)
    pub fn next_after(year: i32, latest: Option<PermitNumber>) -> PermitNumber {
        let sequence = match latest {
            Some(last) if last.year == year => last.sequence + 1,
            _ => 1,
        };
        PermitNumber { year, sequence }
    }
}

impl fmt::Display for PermitNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ND-{}-{:04}", self.year, self.sequence)
    }
}

impl FromStr for PermitNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::Validation(format!("Invalid permit number: {}", s));
        let mut parts = s.trim().splitn(3, '-');
        if parts.next() != Some("ND") {
            return Err(invalid());
        }
        let year = parts
            .next()
            .filter(|y| y.len() == 4)
            .and_then(|y| y.parse::<i32>().ok())
            .ok_or_else(invalid)?;
        // A duplicate-number suffix ("ND-2025-0001-17") is tolerated
        let sequence = parts
            .next()
            .and_then(|rest| rest.split('-').next())
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .ok_or_else(invalid)?;
        Ok(PermitNumber { year, sequence })
    }
}

/// Full permit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPermit {
    pub permit_id: i64,
    pub permit_number: String,
    pub object_id: ObjectId,
    #[serde(default)]
    pub diagnostic_id: Option<i64>,
    pub status: PermitStatus,
    pub issued_date: NaiveDate,
    #[serde(default)]
    pub issued_by: Option<String>,
    #[serde(default)]
    pub closed_date: Option<NaiveDate>,
    #[serde(default)]
    pub closed_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Permit list row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPermitSummary {
    pub permit_id: i64,
    pub permit_number: String,
    pub object_id: ObjectId,
    #[serde(default)]
    pub object_name: Option<String>,
    pub status: PermitStatus,
    pub issued_date: NaiveDate,
    #[serde(default)]
    pub issued_by: Option<String>,
    #[serde(default)]
    pub closed_date: Option<NaiveDate>,
}

/// Sort column for permit lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitSort {
    IssuedDate,
    PermitNumber,
}

/// Query for `GET /api/work-permits`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PermitQuery {
    pub object_id: Option<ObjectId>,
    pub status: Option<PermitStatus>,
    pub limit: Option<u32>,
    pub sort_by: Option<PermitSort>,
    pub descending: bool,
}

impl PermitQuery {
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.object_id {
            pairs.push(("object_id", id.to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(sort) = self.sort_by {
            let column = match sort {
                PermitSort::IssuedDate => "issued_date",
                PermitSort::PermitNumber => "permit_number",
            };
            pairs.push(("sort_by", column.to_string()));
            pairs.push(("sort_order", if self.descending { "desc" } else { "asc" }.to_string()));
        }
        pairs
    }
}

/// Body of `PATCH /api/work-permits/{permit_id}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PermitUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PermitStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PermitUpdate {
    /// Close a permit today on behalf of `closed_by`
    pub fn close(closed_by: impl Into<String>, on: NaiveDate) -> Self {
        Self {
            status: Some(PermitStatus::Closed),
            closed_date: Some(on),
            closed_by: Some(closed_by.into()),
            notes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permit_number_format() {
        let n = PermitNumber { year: 2025, sequence: 7 };
        assert_eq!(n.to_string(), "ND-2025-0007");
    }

    #[test]
    fn test_permit_number_parse() {
        let n: PermitNumber = "ND-2025-0042".parse().unwrap();
        assert_eq!(n, PermitNumber { year: 2025, sequence: 42 });

        let suffixed: PermitNumber = "ND-2024-0003-15".parse().unwrap();
        assert_eq!(suffixed.sequence, 3);

        assert!("NX-2025-0001".parse::<PermitNumber>().is_err());
        assert!("ND-25-0001".parse::<PermitNumber>().is_err());
        assert!("ND-2025-0000".parse::<PermitNumber>().is_err());
        assert!("ND-2025".parse::<PermitNumber>().is_err());
    }

    #[test]
    fn test_next_number_restarts_each_year() {
        let last = PermitNumber { year: 2024, sequence: 118 };
        assert_eq!(PermitNumber::next_after(2024, Some(last)).sequence, 119);
        assert_eq!(PermitNumber::next_after(2025, Some(last)).sequence, 1);
        assert_eq!(PermitNumber::next_after(2025, None).to_string(), "ND-2025-0001");
    }

    #[test]
    fn test_status_transitions() {
        assert!(PermitStatus::Issued.can_transition_to(PermitStatus::Active));
        assert!(PermitStatus::Active.can_transition_to(PermitStatus::Closed));
        assert!(!PermitStatus::Active.can_transition_to(PermitStatus::Issued));
        assert!(!PermitStatus::Closed.can_transition_to(PermitStatus::Active));
        assert!(!PermitStatus::Cancelled.can_transition_to(PermitStatus::Closed));
        assert!(PermitStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_query_pairs() {
        let query = PermitQuery {
            object_id: Some(12),
            status: Some(PermitStatus::Active),
            limit: Some(50),
            sort_by: Some(PermitSort::PermitNumber),
            descending: true,
        };
        assert_eq!(
            query.to_query_pairs(),
            vec![
                ("object_id", "12".to_string()),
                ("status", "active".to_string()),
                ("limit", "50".to_string()),
                ("sort_by", "permit_number".to_string()),
                ("sort_order", "desc".to_string()),
            ]
        );
        assert!(PermitQuery::default().to_query_pairs().is_empty());
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let json = serde_json::to_value(PermitUpdate::close("Inspector", date)).unwrap();
        assert_eq!(json["status"], "closed");
        assert_eq!(json["closed_date"], "2025-03-01");
        assert!(json.get("notes").is_none());
    }
}
