use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{FullAnalysis, LotSummary, RiskLevel, SortBy};

/// Liveness flag reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Ok,
    Error,
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ServiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_lots: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer_ready: Option<bool>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: u64,
    pub page: u32,
    pub size: u32,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Response of `GET /api/lots`.
pub type GetLotsResponse = Page<LotSummary>;

/// Filters, sorting and pagination for `GET /api/lots`.
///
/// Only the fields that are set end up in the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GetLotsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_desc: Option<bool>,
}

impl GetLotsRequest {
    pub fn page(page: u32, size: u32) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
            ..Default::default()
        }
    }

    pub fn with_risk_level(mut self, level: RiskLevel) -> Self {
        self.risk_level = Some(level);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn sorted_by(mut self, sort_by: SortBy, descending: bool) -> Self {
        self.sort_by = Some(sort_by);
        self.sort_desc = Some(descending);
        self
    }
}

/// Body of `POST /api/analyze`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeTextRequest {
    /// Technical specification text (ТЗ)
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_code: Option<String>,
}

impl AnalyzeTextRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Analyst verdict on a lot, sent as `0` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackLabel {
    Normal = 0,
    Risky = 1,
}

impl Serialize for FeedbackLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for FeedbackLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Risky),
            other => Err(serde::de::Error::custom(format!(
                "feedback label must be 0 or 1, got {other}"
            ))),
        }
    }
}

/// Body of `POST /api/feedback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub lot_id: String,
    pub label: FeedbackLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub status: ServiceStatus,
}

/// Filters for `GET /api/export/csv`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_synthetic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
}

/// Body of `POST /api/compare`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareRequest {
    pub lot_ids: Vec<String>,
}

/// Side-by-side comparison of several analysed lots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareResponse {
    #[serde(default)]
    pub lots: Vec<FullAnalysis>,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub avg_risk_score: f64,
    #[serde(default)]
    pub high_risk_count: u32,
}
