use serde::{Deserialize, Serialize};

use crate::{LotData, RiskLevel, RuleCategory, RuleSeverity};

/// One triggered heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule_id: String,
    /// Code in the Datanomix risk taxonomy
    #[serde(default)]
    pub datanomix_code: String,
    #[serde(default)]
    pub rule_name_ru: String,
    #[serde(default)]
    pub category: RuleCategory,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub raw_score: f64,
    #[serde(default)]
    pub explanation_ru: String,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub severity: RuleSeverity,
    /// Article of the procurement law the rule enforces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub law_reference: Option<String>,
}

/// Rule-engine verdict for one lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAnalysis {
    pub lot_id: String,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub rules_triggered: Vec<RuleMatch>,
    #[serde(default)]
    pub rules_passed_count: u32,
    #[serde(default)]
    pub total_rules_checked: u32,
    #[serde(default)]
    pub summary_ru: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub datanomix_codes: Vec<String>,
}

/// Engineered features fed to the backend models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotFeatures {
    pub lot_id: String,
    pub has_brand: bool,
    pub brand_count: u32,
    pub brand_names: Vec<String>,
    pub has_exclusive_phrase: bool,
    pub exclusive_count: u32,
    pub has_no_analogs: bool,
    pub dealer_requirement: bool,
    pub geo_restriction: bool,
    pub standard_count: u32,
    pub text_length: u32,
    pub precise_param_count: u32,
    #[serde(deserialize_with = "crate::null_as_default")]
    pub participants_count: u32,
    #[serde(deserialize_with = "crate::null_as_default")]
    pub deadline_days: i64,
    #[serde(deserialize_with = "crate::null_as_default")]
    pub budget: f64,
    pub budget_ratio: f64,
    pub is_copypaste: bool,
    pub is_unique: bool,
    pub winner_repeat_count: u32,
    #[serde(deserialize_with = "crate::null_as_default")]
    pub category_code: String,
}

/// Outputs of the gradient-boosting classifier and the anomaly detector.
///
/// The backend sends an empty object when the models are not loaded, so
/// every field defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlPrediction {
    pub isolation_anomaly: bool,
    pub isolation_score: f64,
    pub catboost_proba: f64,
    /// Blend of the two model outputs, 0-100
    pub ml_score: f64,
}

/// A previously seen lot with a near-identical specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarLot {
    pub lot_id: String,
    /// Cosine-like similarity in [0, 1]
    pub similarity: f64,
    #[serde(default)]
    pub name_ru: String,
}

/// Complete analysis of one lot. Read-only snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullAnalysis {
    pub lot_id: String,
    #[serde(default)]
    pub lot_data: LotData,
    pub final_score: f64,
    pub final_level: RiskLevel,
    #[serde(default)]
    pub rule_analysis: Option<RuleAnalysis>,
    #[serde(default)]
    pub features: Option<LotFeatures>,
    #[serde(default)]
    pub similar_lots: Vec<SimilarLot>,
    #[serde(default)]
    pub ml_prediction: MlPrediction,
    #[serde(default)]
    pub network_flags: Vec<String>,
    #[serde(default)]
    pub explanation: Vec<String>,
}

impl FullAnalysis {
    /// Rules that fired, empty when the rule engine did not run.
    pub fn triggered_rules(&self) -> &[RuleMatch] {
        self.rule_analysis
            .as_ref()
            .map(|r| r.rules_triggered.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_with_missing_sections() {
        let body = serde_json::json!({
            "lot_id": "TEXT-1",
            "lot_data": {"name_ru": "", "budget": 0},
            "final_score": 75.0,
            "final_level": "HIGH",
            "rule_analysis": null,
            "features": null,
            "similar_lots": [],
            "ml_prediction": {},
            "network_flags": [],
            "explanation": ["Правила: 75/100"]
        });
        let analysis: FullAnalysis = serde_json::from_value(body).unwrap();
        assert_eq!(analysis.final_level, RiskLevel::High);
        assert!(analysis.triggered_rules().is_empty());
        assert_eq!(analysis.ml_prediction, MlPrediction::default());
    }

    #[test]
    fn test_rule_match_severity_and_law() {
        let body = serde_json::json!({
            "rule_id": "R01",
            "datanomix_code": "DX-07",
            "rule_name_ru": "Указание конкретного бренда",
            "category": "specification",
            "weight": 1.0,
            "raw_score": 35.0,
            "explanation_ru": "Dell",
            "evidence": "...Dell Latitude 5540...",
            "severity": "high",
            "law_reference": "ст. 21"
        });
        let rule: RuleMatch = serde_json::from_value(body).unwrap();
        assert_eq!(rule.severity, RuleSeverity::High);
        assert_eq!(rule.category, RuleCategory::Specification);
        assert_eq!(rule.law_reference.as_deref(), Some("ст. 21"));
    }
}
