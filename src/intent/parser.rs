//! Tolerant parser for the classifier's `KEY: value` reply
//!
//! The reply format is whatever the model chose to emit, so the parser ignores
//! unknown keys and lines without a colon, and defaults missing keys. The only
//! hard failure is a CONFIDENCE value that is present but unusable.

use crate::intent::{BudgetRange, ExtractedIntent, IntentType, InvestmentGoal, RiskTolerance};
use std::collections::HashMap;

const PRODUCT_TERMS: [&str; 7] = [
    "fund",
    "etf",
    "bond",
    "stock",
    "mutual",
    "investment",
    "portfolio",
];
const RISK_TERMS: [&str; 5] = ["risk", "safe", "conservative", "aggressive", "volatile"];
const GOAL_TERMS: [&str; 6] = [
    "retirement",
    "education",
    "house",
    "home",
    "emergency",
    "income",
];
const GENERAL_TERMS: [&str; 4] = ["invest", "money", "save", "financial"];

/// Reasons a reply is rejected as a whole
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplyParseError {
    #[error("CONFIDENCE is not a number: {raw:?}")]
    ConfidenceNotNumeric { raw: String },

    #[error("CONFIDENCE {value} is outside [0, 1]")]
    ConfidenceOutOfRange { value: f64 },
}

/// Parse a structured classifier reply
pub fn parse_reply(reply: &str) -> Result<ExtractedIntent, ReplyParseError> {
    let fields = split_fields(reply);
    let field = |key: &str| fields.get(key).map(String::as_str);

    let intent_type = field("INTENT_TYPE")
        .map(parse_intent_type)
        .unwrap_or(IntentType::Unknown);
    let confidence = match field("CONFIDENCE") {
        Some(raw) => parse_confidence(raw)?,
        None => 0.0,
    };

    let mut intent = ExtractedIntent::new(intent_type, confidence);
    intent.risk_tolerance = field("RISK_TOLERANCE").and_then(RiskTolerance::parse);
    intent.investment_goals = field("INVESTMENT_GOALS")
        .map(|raw| {
            split_list(raw)
                .iter()
                .filter_map(|token| match_goal(token))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    intent.investment_horizon = field("INVESTMENT_HORIZON")
        .filter(|raw| !is_null(raw))
        .map(str::to_string);
    intent.preferred_product_types = field("PREFERRED_PRODUCTS")
        .map(split_list)
        .unwrap_or_default();
    intent.budget_range = BudgetRange::new(
        field("BUDGET_MIN").and_then(parse_amount),
        field("BUDGET_MAX").and_then(parse_amount),
    );
    intent.keywords = field("KEYWORDS").map(split_list).unwrap_or_default();
    if let Some(raw) = field("ENTITIES").filter(|raw| !is_null(raw)) {
        intent
            .entities
            .insert("mentioned_entities".to_string(), raw.to_string());
    }

    Ok(intent)
}

/// Keyword fallback over the raw query; never fails
///
/// Product, risk and goal vocabulary are matched as case-insensitive
/// substrings in that order. General investing terms are only consulted when
/// nothing else matched.
pub fn keyword_scan(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let hits = |terms: &[&str]| -> Vec<String> {
        terms
            .iter()
            .filter(|term| lower.contains(*term))
            .map(|term| term.to_string())
            .collect()
    };

    let mut keywords = hits(&PRODUCT_TERMS);
    keywords.extend(hits(&RISK_TERMS));
    keywords.extend(hits(&GOAL_TERMS));
    if keywords.is_empty() {
        keywords = hits(&GENERAL_TERMS);
    }
    keywords
}

/// Split on the first colon of each line; keys are trimmed and upper-cased
///
/// A repeated key keeps its last value.
fn split_fields(reply: &str) -> HashMap<String, String> {
    reply
        .trim()
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_uppercase(), value.trim().to_string()))
        .collect()
}

fn parse_intent_type(raw: &str) -> IntentType {
    let lower = raw.to_lowercase();
    IntentType::ALL
        .into_iter()
        .find(|candidate| lower.contains(candidate.as_str()))
        .unwrap_or(IntentType::Unknown)
}

fn parse_confidence(raw: &str) -> Result<f64, ReplyParseError> {
    let value: f64 = raw
        .parse()
        .map_err(|_| ReplyParseError::ConfidenceNotNumeric {
            raw: raw.to_string(),
        })?;
    if value.is_nan() {
        return Err(ReplyParseError::ConfidenceNotNumeric {
            raw: raw.to_string(),
        });
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(ReplyParseError::ConfidenceOutOfRange { value });
    }
    Ok(value)
}

/// First goal whose label occurs inside the token
fn match_goal(token: &str) -> Option<InvestmentGoal> {
    InvestmentGoal::ALL
        .into_iter()
        .find(|goal| token.contains(goal.as_str()))
}

/// Finite number, or `None` for `null`, blanks and garbage
fn parse_amount(raw: &str) -> Option<f64> {
    if is_null(raw) {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Comma-separated tokens, trimmed and lower-cased; blank tokens dropped
fn split_list(raw: &str) -> Vec<String> {
    if is_null(raw) {
        return Vec::new();
    }
    raw.split(',')
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

fn is_null(raw: &str) -> bool {
    raw.is_empty() || raw.eq_ignore_ascii_case("null")
}
