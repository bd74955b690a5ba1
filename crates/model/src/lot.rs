use serde::{Deserialize, Serialize};

use crate::RiskLevel;

/// Descriptive data of one procurement lot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LotData {
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub name_ru: String,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub category_code: String,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub category_name: String,
    /// Planned budget in tenge
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub budget: f64,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub participants_count: u32,
    /// Days between publication and the bid deadline
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub deadline_days: i64,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub city: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc_ru: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_desc_ru: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_bin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_date: Option<String>,

    // Procurement details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advance_payment_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financing_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoterms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dumping_status: Option<String>,

    // Contact information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_status: Option<String>,

    /// Lot generated for demos rather than imported from the registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_synthetic: Option<bool>,
}

/// One row of the paginated lots listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotSummary {
    pub lot_id: String,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub name_ru: String,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub category_code: String,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub category_name: String,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub budget: f64,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub participants_count: u32,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub deadline_days: i64,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub city: String,
    /// Score in [0, 100]
    pub risk_score: f64,
    /// Banding of `risk_score`, owned by the scoring engine
    pub risk_level: RiskLevel,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub rules_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_median: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_deviation_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_synthetic: Option<bool>,
}

impl LotSummary {
    /// Create a minimal summary, mostly useful in tests.
    pub fn new(lot_id: impl Into<String>, risk_score: f64) -> Self {
        Self {
            lot_id: lot_id.into(),
            name_ru: String::new(),
            category_code: String::new(),
            category_name: String::new(),
            budget: 0.0,
            participants_count: 0,
            deadline_days: 0,
            city: String::new(),
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            rules_count: 0,
            category_median: None,
            price_deviation_pct: None,
            is_synthetic: None,
        }
    }

    pub fn with_category(mut self, code: impl Into<String>, name: impl Into<String>) -> Self {
        self.category_code = code.into();
        self.category_name = name.into();
        self
    }

    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = budget;
        self
    }

    /// Whether the server-supplied level agrees with the score banding.
    ///
    /// The scoring engine owns this invariant; the client only reports it.
    pub fn level_matches_score(&self) -> bool {
        RiskLevel::from_score(self.risk_score) == self.risk_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_backend_row() {
        let row = serde_json::json!({
            "lot_id": "LOT-10045",
            "name_ru": "Закупка: Ноутбуки",
            "category_name": "Ноутбуки",
            "budget": 780000,
            "participants_count": 1,
            "deadline_days": 5,
            "city": "Алматы",
            "risk_score": 65.5,
            "risk_level": "HIGH",
            "rules_count": 4
        });
        let lot: LotSummary = serde_json::from_value(row).unwrap();
        assert_eq!(lot.lot_id, "LOT-10045");
        assert_eq!(lot.category_code, "");
        assert_eq!(lot.budget, 780000.0);
        assert_eq!(lot.risk_level, RiskLevel::High);
        assert!(lot.level_matches_score());
    }

    #[test]
    fn test_null_scalars_read_as_defaults() {
        let body = serde_json::json!({
            "name_ru": "Ручной анализ",
            "category_code": null,
            "category_name": "",
            "budget": null,
            "participants_count": null,
            "deadline_days": null,
            "city": ""
        });
        let data: LotData = serde_json::from_value(body).unwrap();
        assert_eq!(data.name_ru, "Ручной анализ");
        assert_eq!(data.category_code, "");
        assert_eq!(data.budget, 0.0);
        assert_eq!(data.participants_count, 0);
        assert_eq!(data.deadline_days, 0);

        let row = serde_json::json!({
            "lot_id": "LOT-7",
            "name_ru": null,
            "budget": null,
            "city": null,
            "risk_score": 12.0,
            "risk_level": "LOW"
        });
        let lot: LotSummary = serde_json::from_value(row).unwrap();
        assert_eq!(lot.budget, 0.0);
        assert_eq!(lot.city, "");
    }

    #[test]
    fn test_lot_data_optional_fields_skipped() {
        let data = LotData {
            name_ru: "Говядина".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&data).unwrap();
        assert!(json.get("desc_ru").is_none());
        assert!(json.get("is_synthetic").is_none());
        assert_eq!(json["name_ru"], "Говядина");
    }
}
