//! Offline quick-check of a technical specification text.
//!
//! A handful of regular expressions that flag the most common signs of a
//! tailored specification (named brand, banned analogues, dealer status,
//! suspiciously exact figures, exclusivity). The result is an estimate for
//! when the backend is unavailable; it never replaces a `FullAnalysis`.

use goszakup_model::{RiskLevel, RuleSeverity};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use thiserror::Error;

/// Brands named in the demo rule set.
pub const DEFAULT_BRANDS: &[&str] = &[
    "Apple", "MacBook", "Dell", "HP", "Lenovo", "Samsung", "Toyota", "Lexus", "Hyundai", "Kia",
    "Siemens", "Philips", "Cisco", "Canon", "Xerox", "Agilent", "Kaspersky", "BMW", "Mercedes",
    "Audi",
];

const NO_ANALOGS: &str = r"аналоги?\s+не\s+допуск|эквивалент\w*\s+не\s+допуск";
const DEALER: &str = r"авторизованн\w+\s+(?:дилер|партн)|официальн\w+\s+дилер";
const EXACT_PARAMETERS: &str = r"(?:именно|ровно)\s+[\d.,]+";
const EXCLUSIVITY: &str = r"эксклюзивн";

#[derive(Debug, Error)]
pub enum QuickCheckError {
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Rule weights and brand list.
#[derive(Debug, Clone)]
pub struct QuickCheckConfig {
    pub brand_weight: f64,
    pub no_analogs_weight: f64,
    pub dealer_weight: f64,
    pub exact_parameters_weight: f64,
    pub exclusivity_weight: f64,
    /// Matched as whole words, case-insensitively, in this order
    pub brands: Vec<String>,
}

impl Default for QuickCheckConfig {
    fn default() -> Self {
        Self {
            brand_weight: 35.0,
            no_analogs_weight: 40.0,
            dealer_weight: 30.0,
            exact_parameters_weight: 25.0,
            exclusivity_weight: 40.0,
            brands: DEFAULT_BRANDS.iter().map(|b| b.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickRule {
    Brand,
    NoAnalogs,
    DealerRequirement,
    ExactParameters,
    Exclusivity,
}

impl QuickRule {
    pub fn name_ru(&self) -> &'static str {
        match self {
            Self::Brand => "Указание конкретного бренда",
            Self::NoAnalogs => "Запрет аналогов",
            Self::DealerRequirement => "Требование дилера",
            Self::ExactParameters => "Точные параметры",
            Self::Exclusivity => "Эксклюзивность",
        }
    }

    pub fn severity(&self) -> RuleSeverity {
        match self {
            Self::Brand => RuleSeverity::High,
            Self::NoAnalogs | Self::Exclusivity => RuleSeverity::Critical,
            Self::DealerRequirement | Self::ExactParameters => RuleSeverity::Medium,
        }
    }
}

/// One rule that fired.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickRuleHit {
    pub rule: QuickRule,
    pub name_ru: &'static str,
    pub score: f64,
    pub severity: RuleSeverity,
    pub explanation_ru: String,
    /// The matched fragment of the text
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickCheckResult {
    /// Sum of rule weights, capped at 100
    pub score: f64,
    pub level: RiskLevel,
    pub rules: Vec<QuickRuleHit>,
    /// Always true: this is a local heuristic, not the backend verdict
    pub estimate: bool,
}

impl QuickCheckResult {
    pub fn is_clean(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Compiled quick-check rules.
#[derive(Debug, Clone)]
pub struct QuickChecker {
    config: QuickCheckConfig,
    brands: Vec<(String, Regex)>,
    no_analogs: Regex,
    dealer: Regex,
    exact_parameters: Regex,
    exclusivity: Regex,
}

impl QuickChecker {
    pub fn new(config: QuickCheckConfig) -> Result<Self, QuickCheckError> {
        let brands = config
            .brands
            .iter()
            .filter(|b| !b.trim().is_empty())
            .map(|brand| {
                let pattern = format!(r"\b{}\b", regex::escape(brand.trim()));
                Ok((brand.trim().to_string(), case_insensitive(&pattern)?))
            })
            .collect::<Result<Vec<_>, QuickCheckError>>()?;

        Ok(Self {
            brands,
            no_analogs: case_insensitive(NO_ANALOGS)?,
            dealer: case_insensitive(DEALER)?,
            exact_parameters: case_insensitive(EXACT_PARAMETERS)?,
            exclusivity: case_insensitive(EXCLUSIVITY)?,
            config,
        })
    }

    pub fn config(&self) -> &QuickCheckConfig {
        &self.config
    }

    /// Score `text`. Only the first brand of the list found in the text counts.
    pub fn check(&self, text: &str) -> QuickCheckResult {
        let mut rules = Vec::new();

        let brand = self
            .brands
            .iter()
            .find_map(|(brand, pattern)| pattern.find(text).map(|m| (brand, m.as_str())));
        if let Some((brand, evidence)) = brand {
            rules.push(self.hit(
                QuickRule::Brand,
                self.config.brand_weight,
                format!("Обнаружен бренд: {brand}"),
                evidence,
            ));
        }

        let phrase_rules = [
            (
                QuickRule::NoAnalogs,
                &self.no_analogs,
                self.config.no_analogs_weight,
                "Обнаружена фраза, запрещающая аналоги/эквиваленты.",
            ),
            (
                QuickRule::DealerRequirement,
                &self.dealer,
                self.config.dealer_weight,
                "Требуется статус авторизованного дилера.",
            ),
            (
                QuickRule::ExactParameters,
                &self.exact_parameters,
                self.config.exact_parameters_weight,
                "Подозрительно точные параметры.",
            ),
            (
                QuickRule::Exclusivity,
                &self.exclusivity,
                self.config.exclusivity_weight,
                "Эксклюзивные условия.",
            ),
        ];
        for (rule, pattern, weight, explanation) in phrase_rules {
            if let Some(m) = pattern.find(text) {
                rules.push(self.hit(rule, weight, explanation.to_string(), m.as_str()));
            }
        }

        let score = rules.iter().map(|r| r.score).sum::<f64>().min(100.0);
        QuickCheckResult {
            score,
            level: RiskLevel::from_score(score),
            rules,
            estimate: true,
        }
    }

    fn hit(&self, rule: QuickRule, score: f64, explanation_ru: String, evidence: &str) -> QuickRuleHit {
        QuickRuleHit {
            rule,
            name_ru: rule.name_ru(),
            score,
            severity: rule.severity(),
            explanation_ru,
            evidence: evidence.to_string(),
        }
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex, QuickCheckError> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn checker() -> QuickChecker {
        QuickChecker::new(QuickCheckConfig::default()).unwrap()
    }

    fn fired(result: &QuickCheckResult) -> Vec<QuickRule> {
        result.rules.iter().map(|r| r.rule).collect()
    }

    #[test]
    fn test_clean_text() {
        let result = checker().check("Бумага офисная формата А4, плотность 80 г/м2");
        assert!(result.is_clean());
        assert_eq!(result.score, 0.0);
        assert_eq!(result.level, RiskLevel::Low);
        assert!(result.estimate);
    }

    #[test]
    fn test_brand_and_no_analogs() {
        let result = checker().check("Требуется Dell Latitude, аналоги не допускаются");
        assert_eq!(fired(&result), vec![QuickRule::Brand, QuickRule::NoAnalogs]);
        assert_eq!(result.score, 75.0);
        assert_eq!(result.level, RiskLevel::Critical);
        assert_eq!(result.rules[0].explanation_ru, "Обнаружен бренд: Dell");
        assert_eq!(result.rules[1].evidence, "аналоги не допуск");
    }

    #[test]
    fn test_only_first_brand_counts() {
        let result = checker().check("Ноутбук Lenovo или Apple MacBook");
        assert_eq!(fired(&result), vec![QuickRule::Brand]);
        assert_eq!(result.rules[0].explanation_ru, "Обнаружен бренд: Apple");
        assert_eq!(result.score, 35.0);
    }

    #[test]
    fn test_brand_needs_whole_word() {
        let result = checker().check("Компания Kiama, модель HPX");
        assert!(result.is_clean());
        let result = checker().check("принтер hp laserjet");
        assert_eq!(result.rules[0].evidence, "hp");
    }

    #[test]
    fn test_equivalents_with_cyrillic_suffix() {
        let result = checker().check("Эквиваленты не допускаются.");
        assert_eq!(fired(&result), vec![QuickRule::NoAnalogs]);
        assert_eq!(result.level, RiskLevel::Medium);
    }

    #[test]
    fn test_dealer_and_exact_parameters() {
        let result = checker().check(
            "Поставщик должен быть официальным дилером. Мощность ровно 2,5 кВт.",
        );
        assert_eq!(
            fired(&result),
            vec![QuickRule::DealerRequirement, QuickRule::ExactParameters]
        );
        assert_eq!(result.score, 55.0);
        assert_eq!(result.level, RiskLevel::High);
        assert_eq!(result.rules[1].evidence, "ровно 2,5");
    }

    #[test]
    fn test_score_capped_at_100() {
        let result = checker().check(
            "Toyota Land Cruiser, аналоги не допускаются, авторизованный дилер, \
             именно 4.5 литра, эксклюзивное обслуживание",
        );
        assert_eq!(result.rules.len(), 5);
        assert_eq!(result.score, 100.0);
        assert_eq!(result.level, RiskLevel::Critical);
    }

    #[test]
    fn test_custom_config() {
        let config = QuickCheckConfig {
            brands: vec!["Astana Motors".into(), "  ".into()],
            brand_weight: 50.0,
            ..Default::default()
        };
        let result = QuickChecker::new(config).unwrap().check("Сервис ASTANA MOTORS");
        assert_eq!(result.score, 50.0);
        assert_eq!(result.level, RiskLevel::High);
        assert!(checker().check("Сервис Astana Motors").is_clean());
    }

    #[test]
    fn test_serializes_for_reports() {
        let result = checker().check("эксклюзивная поставка");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["rules"][0]["rule"], "exclusivity");
        assert_eq!(json["rules"][0]["severity"], "critical");
        assert_eq!(json["level"], "MEDIUM");
    }
}
