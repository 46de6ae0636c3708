//! Domain models consumed from the IntegrityOS backend
//!
//! All entities are server-owned; the client only caches them.

pub mod analytics;
pub mod chat;
pub mod diagnostic;
pub mod filter;
pub mod import;
pub mod ml;
pub mod object;
pub mod permit;

pub use analytics::{
    CriticalityCounts, CriticalityShare, DefectsTimelineItem, MethodDistribution, StatsSummary,
    TopRiskObject, Trend, TrendDirection, Trends,
};
pub use chat::{ChatReply, ChatRequest, ChatRole, ChatTurn};
pub use diagnostic::{DiagnosticMethod, DiagnosticRecord, MarkFixedOutcome, MlProbabilities, QualityGrade};
pub use filter::{Filter, ParamRange, SortKey, SortOrder, SortSpec};
pub use import::{ImportStats, TemplateKind};
pub use ml::{
    AccuracyEstimate, DriftCheck, MlDrift, MlMetrics, MlStatus, MlSuggestion, MlSuggestions,
    SuggestionPriority,
};
pub use object::{
    GeoPoint, InspectionObject, LocationStatus, ObjectCategory, ObjectId, ObjectStatus, RiskLevel,
};
pub use permit::{
    PermitNumber, PermitQuery, PermitSort, PermitStatus, PermitUpdate, WorkPermit,
    WorkPermitSummary,
};
