//! Category and customer directories.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Pagination, sorting and search for the category and customer listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryQuery {
    pub page: u32,
    pub size: u32,
    /// `lot_count`, `total_budget` or `avg_risk_score`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_desc: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for DirectoryQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: 20,
            sort_by: None,
            sort_desc: None,
            search: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryListItem {
    pub category_code: String,
    #[serde(default)]
    pub category_name: String,
    pub lot_count: u64,
    #[serde(default)]
    pub total_budget: f64,
    #[serde(default)]
    pub avg_risk_score: f64,
    /// Counts keyed by risk level name
    #[serde(default)]
    pub risk_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub high_critical_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryPriceStats {
    pub count: u64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCustomer {
    pub customer_bin: String,
    #[serde(default)]
    pub customer_name: String,
    pub lot_count: u64,
}

/// Response of `GET /api/categories/{code}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDetail {
    pub category_code: String,
    #[serde(default)]
    pub category_name: String,
    pub total_lots: u64,
    #[serde(default)]
    pub total_budget: f64,
    #[serde(default)]
    pub avg_risk_score: f64,
    #[serde(default)]
    pub risk_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub price_stats: CategoryPriceStats,
    #[serde(default)]
    pub top_customers: Vec<TopCustomer>,
    #[serde(default)]
    pub sample_high_risk_lots: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerListItem {
    pub customer_bin: String,
    #[serde(default)]
    pub customer_name: String,
    pub lot_count: u64,
    #[serde(default)]
    pub total_budget: f64,
    #[serde(default)]
    pub avg_risk_score: f64,
    #[serde(default)]
    pub category_count: u64,
    #[serde(default)]
    pub risk_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub high_critical_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerCategory {
    pub category_code: String,
    #[serde(default)]
    pub category_name: String,
    pub lot_count: u64,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub avg_risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerLot {
    pub lot_id: String,
    #[serde(default)]
    pub name_ru: String,
    #[serde(default)]
    pub category_code: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub budget: f64,
    pub risk_score: f64,
    /// Kept as sent; customer pages may carry legacy level names
    #[serde(default)]
    pub risk_level: String,
    #[serde(default)]
    pub publish_date: String,
}

/// Response of `GET /api/customers/{bin}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDetail {
    /// Business identification number
    pub customer_bin: String,
    #[serde(default)]
    pub customer_name: String,
    pub total_lots: u64,
    #[serde(default)]
    pub total_budget: f64,
    #[serde(default)]
    pub avg_risk_score: f64,
    #[serde(default)]
    pub categories: Vec<CustomerCategory>,
    #[serde(default)]
    pub recent_lots: Vec<CustomerLot>,
}
