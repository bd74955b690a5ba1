use serde::{Deserialize, Serialize};

use crate::LevelCounts;

/// Bucket width of the risk timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Day,
    Week,
    Month,
    Quarter,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
        }
    }
}

impl std::str::FromStr for PeriodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "quarter" => Ok(Self::Quarter),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

/// Parameters of `GET /api/stats/timeline`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimelineQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<PeriodType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineData {
    /// Period label, e.g. `2025-03`
    pub period: String,
    pub count: u64,
    #[serde(default)]
    pub avg_risk: f64,
    #[serde(default)]
    pub risk_dist: LevelCounts,
    #[serde(default)]
    pub total_budget: f64,
    #[serde(default)]
    pub high_risk_count: u64,
    #[serde(default)]
    pub high_risk_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineResponse {
    pub period_type: PeriodType,
    #[serde(default)]
    pub timeline: Vec<TimelineData>,
    #[serde(default)]
    pub total_periods: u64,
}
