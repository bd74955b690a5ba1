//! Wire contract for the Goszakup risk-analysis backend.
//!
//! This crate defines the types exchanged with the backend HTTP API:
//! - `RiskLevel`: the four-band classification of a 0-100 risk score
//! - `LotSummary` / `LotData`: procurement lots as listed and as analysed
//! - `FullAnalysis`: the per-lot verdict (rules, ML prediction, network flags)
//! - request parameter objects for every query the client issues
//!
//! Every entity is owned by the backend. The client only holds read-only
//! snapshots of them.

use serde::{Deserialize, Deserializer, Serialize};

mod analysis;
mod directory;
mod lot;
mod network;
mod pricing;
mod requests;
mod stats;
mod timeline;

pub use analysis::{FullAnalysis, LotFeatures, MlPrediction, RuleAnalysis, RuleMatch, SimilarLot};
pub use directory::{
    CategoryDetail, CategoryListItem, CategoryPriceStats, CustomerCategory, CustomerDetail,
    CustomerListItem, CustomerLot, DirectoryQuery, TopCustomer,
};
pub use lot::{LotData, LotSummary};
pub use network::{
    NetworkAnalysis, NetworkEdge, NetworkGraph, NetworkGraphQuery, NetworkGraphStats, NetworkNode,
    NetworkNodeKind, NodeProfile,
};
pub use pricing::{
    CategoryPricingDetail, CategoryPricingQuery, CategoryPricingResponse, CategoryPricingStats,
    PriceDistribution, PricedLot,
};
pub use requests::{
    AnalyzeTextRequest, CompareRequest, CompareResponse, ExportFilters, FeedbackLabel,
    FeedbackRequest, FeedbackResponse, GetLotsRequest, GetLotsResponse, HealthResponse, Page,
    ServiceStatus,
};
pub use stats::{CategoryStats, DashboardStats, DataTypeStats, LevelCounts};
pub use timeline::{PeriodType, TimelineData, TimelineQuery, TimelineResponse};

/// Read an explicit `null` as the field's default value.
///
/// The backend fills scalar lot fields with `None` when the caller did not
/// supply them, so `#[serde(default)]` alone is not enough.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Banded classification of a procurement lot's risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Score below 25
    Low,
    /// Score in [25, 50)
    Medium,
    /// Score in [50, 75)
    High,
    /// Score of 75 and above
    Critical,
}

impl RiskLevel {
    /// All levels in ascending order of severity.
    pub const ALL: [RiskLevel; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Band a 0-100 risk score.
    ///
    /// Each boundary belongs to the higher band: 25 is MEDIUM, 50 is HIGH,
    /// 75 is CRITICAL. A NaN score bands as LOW.
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            Self::Critical
        } else if score >= 50.0 {
            Self::High
        } else if score >= 25.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Wire name of the level (`LOW`, `MEDIUM`, `HIGH`, `CRITICAL`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// HIGH and CRITICAL lots count as high-risk in every aggregate.
    pub fn is_high_risk(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

/// Severity of a single triggered rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for RuleSeverity {
    fn default() -> Self {
        Self::Low
    }
}

/// Family a risk rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Specification,
    SupplierRestriction,
    Timeline,
    Price,
    Process,
    /// Categories introduced by newer backends
    #[serde(other)]
    Other,
}

impl Default for RuleCategory {
    fn default() -> Self {
        Self::Other
    }
}

/// Sort key accepted by the lots listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    RiskScore,
    Budget,
    DeadlineDays,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RiskScore => "risk_score",
            Self::Budget => "budget",
            Self::DeadlineDays => "deadline_days",
        }
    }
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "risk_score" => Ok(Self::RiskScore),
            "budget" => Ok(Self::Budget),
            "deadline_days" => Ok(Self::DeadlineDays),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banding_boundaries() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(24.9), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(25.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(49.99), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(50.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(74.9), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(75.0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(100.0), RiskLevel::Critical);
    }

    #[test]
    fn test_banding_is_monotonic() {
        let mut previous = RiskLevel::Low;
        for tenth in 0..=1000 {
            let level = RiskLevel::from_score(tenth as f64 / 10.0);
            assert!(level >= previous, "band dropped at {}", tenth as f64 / 10.0);
            previous = level;
        }
    }

    #[test]
    fn test_nan_bands_low() {
        assert_eq!(RiskLevel::from_score(f64::NAN), RiskLevel::Low);
    }

    #[test]
    fn test_level_wire_names() {
        assert_eq!(serde_json::to_string(&RiskLevel::Critical).unwrap(), "\"CRITICAL\"");
        let level: RiskLevel = serde_json::from_str("\"MEDIUM\"").unwrap();
        assert_eq!(level, RiskLevel::Medium);
        assert_eq!("high".parse::<RiskLevel>(), Ok(RiskLevel::High));
        assert!("severe".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_unknown_rule_category() {
        let category: RuleCategory = serde_json::from_str("\"geo\"").unwrap();
        assert_eq!(category, RuleCategory::Other);
        let category: RuleCategory = serde_json::from_str("\"supplier_restriction\"").unwrap();
        assert_eq!(category, RuleCategory::SupplierRestriction);
    }
}
