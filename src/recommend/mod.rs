//! Recommendation composition and the terminal result type

pub mod composer;
pub mod extract;
pub mod prompt;

pub use composer::RecommendationComposer;

use crate::domain::FinancialProduct;
use crate::intent::{IntentType, clamp_unit};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Final structured answer returned for every query
///
/// Confidence is clamped to [0, 1] on construction. `metadata` always records
/// which provider produced the answer and whether it is a degraded response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResult {
    content: String,
    recommendations: Vec<FinancialProduct>,
    reasoning: String,
    confidence: f64,
    intent_type: IntentType,
    metadata: BTreeMap<String, Value>,
    created_at: DateTime<Utc>,
}

impl RecommendationResult {
    pub fn new(
        content: impl Into<String>,
        recommendations: Vec<FinancialProduct>,
        reasoning: impl Into<String>,
        confidence: f64,
        intent_type: IntentType,
        metadata: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            content: content.into(),
            recommendations,
            reasoning: reasoning.into(),
            confidence: clamp_unit(confidence),
            intent_type,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Add or replace one metadata entry
    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn recommendations(&self) -> &[FinancialProduct] {
        &self.recommendations
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn intent_type(&self) -> IntentType {
        self.intent_type
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Provider label recorded in metadata
    pub fn provider(&self) -> Option<&str> {
        self.metadata.get("provider").and_then(Value::as_str)
    }

    /// True for both the composer fallback and the manager's error response
    pub fn is_fallback(&self) -> bool {
        self.flag("fallback")
    }

    /// True only for the manager's all-backends-failed response
    pub fn is_error(&self) -> bool {
        self.flag("error")
    }

    fn flag(&self, key: &str) -> bool {
        self.metadata
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn result(confidence: f64) -> RecommendationResult {
        RecommendationResult::new(
            "text",
            Vec::new(),
            "because",
            confidence,
            IntentType::GeneralQuestion,
            BTreeMap::new(),
        )
    }

    #[test]
    fn test_flags_default_false() {
        let r = result(0.5);
        assert!(!r.is_fallback());
        assert!(!r.is_error());
        assert_eq!(r.provider(), None);
    }

    #[test]
    fn test_with_metadata_sets_flags() {
        let r = result(0.5)
            .with_metadata("fallback", true)
            .with_metadata("provider", "openai");
        assert!(r.is_fallback());
        assert_eq!(r.provider(), Some("openai"));
    }

    proptest! {
        #[test]
        fn prop_confidence_always_in_unit_interval(confidence in proptest::num::f64::ANY) {
            let c = result(confidence).confidence();
            prop_assert!((0.0..=1.0).contains(&c));
        }
    }
}
