//! Heuristics that turn generated prose into structured fields
//!
//! These are substring heuristics, not ranking. A product whose name is a
//! common word will match any reply that uses that word.

use crate::domain::FinancialProduct;
use crate::intent::clamp_unit;

const REASONING_MARKERS: [&str; 5] = ["because", "since", "due to", "reason", "consider"];

/// Products used when nothing in the reply matches the catalog
const UNMATCHED_TAKE: usize = 3;

/// Catalog entries mentioned in `reply`, in catalog order
///
/// A product matches on its lowercase name, or failing that its type label.
/// With no match at all the first three catalog entries are returned.
pub fn extract_products(reply: &str, catalog: &[FinancialProduct]) -> Vec<FinancialProduct> {
    let lower = reply.to_lowercase();
    let matched: Vec<FinancialProduct> = catalog
        .iter()
        .filter(|p| {
            lower.contains(&p.name.to_lowercase()) || lower.contains(p.product_type.as_str())
        })
        .cloned()
        .collect();

    if matched.is_empty() {
        catalog.iter().take(UNMATCHED_TAKE).cloned().collect()
    } else {
        matched
    }
}

/// Lines using causal language, joined by spaces
///
/// Without any such line, the first three `.`-separated sentences are used.
pub fn extract_reasoning(reply: &str) -> String {
    let lines: Vec<&str> = reply
        .lines()
        .map(str::trim)
        .filter(|line| {
            let lower = line.to_lowercase();
            REASONING_MARKERS.iter().any(|m| lower.contains(m))
        })
        .collect();

    if !lines.is_empty() {
        return lines.join(" ");
    }

    let sentences: Vec<&str> = reply.split('.').take(3).collect();
    format!("{}.", sentences.join(". "))
}

/// Adjust the intent confidence by reply length, product hits and latency
///
/// `+0.1` above 200 chars, `-0.2` under 50; `+0.1` when products were found,
/// otherwise `-0.2`; `+0.05` under 2000 ms. Result is clamped to [0, 1].
pub fn score_confidence(
    intent_confidence: f64,
    reply: &str,
    products_found: bool,
    latency_ms: Option<f64>,
) -> f64 {
    let mut score = intent_confidence;

    let length = reply.chars().count();
    if length > 200 {
        score += 0.1;
    } else if length < 50 {
        score -= 0.2;
    }

    if products_found {
        score += 0.1;
    } else {
        score -= 0.2;
    }

    if latency_ms.is_some_and(|ms| ms > 0.0 && ms < 2000.0) {
        score += 0.05;
    }

    clamp_unit(score)
}
