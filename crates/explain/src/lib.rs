//! Human-readable rendering of risk analyses.
//!
//! Turns backend rule matches and quick-check hits into explanations, and
//! formats scores and budgets for terminal output.

use goszakup_model::{FullAnalysis, RiskLevel, RuleMatch, RuleSeverity};
use goszakup_quickcheck::{QuickCheckResult, QuickRuleHit};
use serde::{Deserialize, Serialize};

/// A structured explanation of one triggered rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Rule name (1 line)
    pub summary: String,

    /// Why the rule fired
    pub detail: String,

    /// Severity weight (0.25 - 1.0)
    pub severity: f32,

    /// Evidence items supporting this explanation
    pub evidence: Vec<EvidenceItem>,
}

/// A piece of evidence supporting a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub kind: String,

    /// The matched text or code
    pub value: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Text and emoji shown for a rule severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityBadge {
    pub text: &'static str,
    pub emoji: &'static str,
}

/// Score with the marker of the level the backend reported, e.g. `🟠 62.5`.
pub fn format_risk(score: f64, level: RiskLevel) -> String {
    format!("{} {:.1}", level_emoji(level), score)
}

/// Score marked by its own banding.
///
/// Only for figures that come without a reported level, such as averages.
pub fn format_risk_score(score: f64) -> String {
    format_risk(score, RiskLevel::from_score(score))
}

/// Budget in tenge with K/M/B suffixes: `1.5M ₸`, `950 ₸`.
pub fn format_budget(amount: f64) -> String {
    if amount >= 1e9 {
        format!("{:.1}B ₸", amount / 1e9)
    } else if amount >= 1e6 {
        format!("{:.1}M ₸", amount / 1e6)
    } else if amount >= 1e3 {
        format!("{:.1}K ₸", amount / 1e3)
    } else {
        format!("{:.0} ₸", amount)
    }
}

/// Hex colour used for a risk level.
pub fn risk_level_color(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Critical => "#dc2626",
        RiskLevel::High => "#f97316",
        RiskLevel::Medium => "#eab308",
        RiskLevel::Low => "#22c55e",
    }
}

pub fn severity_badge(severity: RuleSeverity) -> SeverityBadge {
    match severity {
        RuleSeverity::Critical => SeverityBadge {
            text: "CRITICAL",
            emoji: "🔴",
        },
        RuleSeverity::High => SeverityBadge {
            text: "HIGH",
            emoji: "🟠",
        },
        RuleSeverity::Medium => SeverityBadge {
            text: "MEDIUM",
            emoji: "🟡",
        },
        RuleSeverity::Low => SeverityBadge {
            text: "LOW",
            emoji: "🟢",
        },
    }
}

fn level_emoji(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Critical => "🔴",
        RiskLevel::High => "🟠",
        RiskLevel::Medium => "🟡",
        RiskLevel::Low => "🟢",
    }
}

fn severity_weight(severity: RuleSeverity) -> f32 {
    match severity {
        RuleSeverity::Critical => 1.0,
        RuleSeverity::High => 0.75,
        RuleSeverity::Medium => 0.5,
        RuleSeverity::Low => 0.25,
    }
}

/// Explain a rule reported by the backend.
pub fn explain_rule(rule: &RuleMatch) -> Explanation {
    let mut evidence = Vec::new();
    if !rule.evidence.is_empty() {
        evidence.push(EvidenceItem {
            kind: "text".to_string(),
            value: rule.evidence.clone(),
            context: None,
        });
    }
    if !rule.datanomix_code.is_empty() {
        evidence.push(EvidenceItem {
            kind: "datanomix_code".to_string(),
            value: rule.datanomix_code.clone(),
            context: rule.law_reference.clone(),
        });
    }

    Explanation {
        summary: rule.rule_name_ru.clone(),
        detail: rule.explanation_ru.clone(),
        severity: severity_weight(rule.severity),
        evidence,
    }
}

/// Explain a quick-check hit.
pub fn explain_quick_rule(hit: &QuickRuleHit) -> Explanation {
    Explanation {
        summary: hit.name_ru.to_string(),
        detail: hit.explanation_ru.clone(),
        severity: severity_weight(hit.severity),
        evidence: vec![EvidenceItem {
            kind: "text".to_string(),
            value: hit.evidence.clone(),
            context: Some(format!("+{:.0}", hit.score)),
        }],
    }
}

/// Report lines for a lot analysis.
pub fn summarize_analysis(analysis: &FullAnalysis) -> Vec<String> {
    let lot = &analysis.lot_data;
    let name = if lot.name_ru.is_empty() {
        analysis.lot_id.as_str()
    } else {
        lot.name_ru.as_str()
    };

    let mut lines = vec![
        format!("📋 {name}"),
        format!("💰 Бюджет: {}", format_budget(lot.budget)),
        format!("⚠️ Риск: {}", format_risk(analysis.final_score, analysis.final_level)),
        format!("📊 Уровень: {}", analysis.final_level),
    ];

    let rules = analysis.triggered_rules();
    if !rules.is_empty() {
        lines.push(String::new());
        lines.push("Факторы риска:".to_string());
        for rule in rules {
            let badge = severity_badge(rule.severity);
            lines.push(format!("  {} {}: {}", badge.emoji, rule.rule_name_ru, rule.explanation_ru));
        }
    }

    if !analysis.network_flags.is_empty() {
        lines.push(String::new());
        lines.push("Сетевые признаки:".to_string());
        lines.extend(analysis.network_flags.iter().map(|flag| format!("  • {flag}")));
    }

    if !analysis.similar_lots.is_empty() {
        lines.push(String::new());
        lines.push("Похожие лоты:".to_string());
        for similar in analysis.similar_lots.iter().take(3) {
            lines.push(format!(
                "  - {} (сходство: {:.0}%)",
                similar.name_ru,
                similar.similarity * 100.0
            ));
        }
    }

    lines
}

/// Report lines for a quick-check result, marked as an estimate.
pub fn describe_quick_check(result: &QuickCheckResult) -> Vec<String> {
    let mut lines = vec![format!(
        "Предварительная оценка: {} ({})",
        format_risk(result.score, result.level),
        result.level
    )];

    if result.is_clean() {
        lines.push("✅ Признаков заточки не обнаружено".to_string());
        return lines;
    }

    for hit in &result.rules {
        let badge = severity_badge(hit.severity);
        lines.push(format!(
            "  {} {} (+{:.0}): {}",
            badge.emoji, hit.name_ru, hit.score, hit.explanation_ru
        ));
    }
    lines
}
