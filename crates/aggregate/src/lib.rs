//! Dashboard figures derived from a page of lots.
//!
//! Pure functions over `LotSummary` slices:
//! - per-level and per-category counts
//! - total budget, mean score and budget-weighted score
//! - the riskiest lots
//!
//! Levels are taken from the lots as the backend reported them, never
//! re-banded from the score.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use goszakup_model::{LevelCounts, LotSummary};
use serde::Serialize;

/// Lots of one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryAggregate {
    pub name: String,
    pub count: u64,
    /// HIGH or CRITICAL lots
    pub high_risk: u64,
    pub budget_sum: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_lots: u64,
    pub by_level: LevelCounts,
    pub by_category: BTreeMap<String, CategoryAggregate>,
    pub total_budget: f64,
    pub avg_score: f64,
    /// Scores weighted by budget; 0 when no lot has a budget
    pub budget_weighted_score: f64,
}

impl DashboardSummary {
    /// Share of HIGH and CRITICAL lots in percent.
    pub fn high_risk_pct(&self) -> f64 {
        if self.total_lots == 0 {
            return 0.0;
        }
        self.by_level.high_risk() as f64 * 100.0 / self.total_lots as f64
    }
}

/// Reduce `lots` to dashboard figures.
///
/// The result does not depend on the order of `lots`: lots are folded in a
/// canonical order so floating-point sums come out identical.
pub fn summarize(lots: &[LotSummary]) -> DashboardSummary {
    let mut ordered: Vec<&LotSummary> = lots.iter().collect();
    ordered.sort_by(|a, b| canonical_order(a, b));

    let mut summary = DashboardSummary::default();
    let mut score_sum = 0.0;
    let mut weighted_sum = 0.0;

    for lot in ordered {
        summary.total_lots += 1;
        summary.by_level.increment(lot.risk_level);
        summary.total_budget += lot.budget;
        score_sum += lot.risk_score;
        weighted_sum += lot.risk_score * lot.budget;

        let category = summary
            .by_category
            .entry(lot.category_code.clone())
            .or_default();
        if category.name.is_empty() {
            category.name = lot.category_name.clone();
        }
        category.count += 1;
        category.budget_sum += lot.budget;
        if lot.risk_level.is_high_risk() {
            category.high_risk += 1;
        }
    }

    if summary.total_lots > 0 {
        summary.avg_score = score_sum / summary.total_lots as f64;
    }
    if summary.total_budget > 0.0 {
        summary.budget_weighted_score = weighted_sum / summary.total_budget;
    }

    summary
}

/// The `n` riskiest lots: score descending, ties by lot id.
pub fn top_risks(lots: &[LotSummary], n: usize) -> Vec<&LotSummary> {
    let mut ranked: Vec<&LotSummary> = lots.iter().collect();
    ranked.sort_by(|a, b| {
        b.risk_score
            .total_cmp(&a.risk_score)
            .then_with(|| a.lot_id.cmp(&b.lot_id))
    });
    ranked.truncate(n);
    ranked
}

fn canonical_order(a: &LotSummary, b: &LotSummary) -> Ordering {
    a.lot_id
        .cmp(&b.lot_id)
        .then_with(|| a.risk_score.total_cmp(&b.risk_score))
        .then_with(|| a.budget.total_cmp(&b.budget))
        .then_with(|| a.category_code.cmp(&b.category_code))
        .then_with(|| a.category_name.cmp(&b.category_name))
}
