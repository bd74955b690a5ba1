use serde::{Deserialize, Serialize};

use crate::RiskLevel;

/// Parameters of `GET /api/stats/category-pricing`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryPricingQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    /// Hide categories with fewer lots than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_count: Option<u32>,
}

/// Budget statistics of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPricingStats {
    pub category_code: String,
    #[serde(default)]
    pub category_name: String,
    pub count: u64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    #[serde(default)]
    pub std_dev: f64,
    #[serde(default)]
    pub high_risk_count: u64,
    #[serde(default)]
    pub high_risk_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPricingResponse {
    #[serde(default)]
    pub categories: Vec<CategoryPricingStats>,
    #[serde(default)]
    pub total: u64,
}

/// Budget distribution including quartiles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceDistribution {
    pub count: u64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub std_dev: f64,
    pub percentile_25: f64,
    pub percentile_75: f64,
}

/// Sample lot with its deviation from the category median.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLot {
    pub lot_id: String,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub name_ru: String,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub budget: f64,
    /// Percent above (positive) or below the category median
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub deviation_pct: f64,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

/// Response of `GET /api/categories/{code}/pricing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPricingDetail {
    pub category_code: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub stats: PriceDistribution,
    #[serde(default)]
    pub sample_lots: Vec<PricedLot>,
}

impl CategoryPricingDetail {
    /// Sample lots priced above the upper quartile.
    pub fn outliers(&self) -> impl Iterator<Item = &PricedLot> {
        let upper = self.stats.percentile_75;
        self.sample_lots.iter().filter(move |lot| lot.budget > upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outliers_above_upper_quartile() {
        let detail: CategoryPricingDetail = serde_json::from_value(serde_json::json!({
            "category_code": "101111",
            "category_name": "Говядина",
            "stats": {"count": 3, "median": 100.0, "percentile_25": 80.0, "percentile_75": 120.0},
            "sample_lots": [
                {"lot_id": "A", "budget": 90.0, "deviation_pct": -10.0, "risk_score": 10.0, "risk_level": "LOW"},
                {"lot_id": "B", "budget": 380.0, "deviation_pct": 280.0, "risk_score": 60.0, "risk_level": "HIGH"}
            ]
        }))
        .unwrap();

        let outliers: Vec<_> = detail.outliers().map(|lot| lot.lot_id.as_str()).collect();
        assert_eq!(outliers, vec!["B"]);
        assert_eq!(detail.stats.min, 0.0);
    }
}
