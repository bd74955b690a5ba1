use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{FullAnalysis, RiskLevel};

/// Lot counts per risk level. All four buckets are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelCounts {
    #[serde(rename = "LOW", default)]
    pub low: u64,
    #[serde(rename = "MEDIUM", default)]
    pub medium: u64,
    #[serde(rename = "HIGH", default)]
    pub high: u64,
    #[serde(rename = "CRITICAL", default)]
    pub critical: u64,
}

impl LevelCounts {
    pub fn get(&self, level: RiskLevel) -> u64 {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
            RiskLevel::Critical => self.critical,
        }
    }

    pub fn increment(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.low + self.medium + self.high + self.critical
    }

    /// HIGH plus CRITICAL.
    pub fn high_risk(&self) -> u64 {
        self.high + self.critical
    }
}

/// Per-category aggregate reported by the dashboard endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub high_risk: u64,
    #[serde(default)]
    pub avg_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
}

/// Synthetic versus imported lots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTypeStats {
    pub total_synthetic: u64,
    pub total_real: u64,
    #[serde(default)]
    pub synthetic_risk_dist: LevelCounts,
    #[serde(default)]
    pub real_risk_dist: LevelCounts,
}

/// Response of `GET /api/stats/dashboard`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_lots: u64,
    #[serde(default)]
    pub processed_lots: u64,
    #[serde(default)]
    pub all_lots: u64,
    #[serde(default)]
    pub by_level: LevelCounts,
    #[serde(default)]
    pub avg_score: f64,
    #[serde(default)]
    pub total_budget: f64,
    #[serde(default)]
    pub by_category: BTreeMap<String, CategoryStats>,
    #[serde(default)]
    pub top_risks: Vec<FullAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type_stats: Option<DataTypeStats>,
}
