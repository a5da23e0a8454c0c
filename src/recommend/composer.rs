//! Model-backed recommendation composition

use crate::domain::{ConversationTurn, FinancialProduct, UserProfile};
use crate::intent::ExtractedIntent;
use crate::providers::{
    GenerateOptions, GenerationContext, GenerationResult, ModelService, ProviderError,
    ProviderKind,
};
use crate::recommend::RecommendationResult;
use crate::recommend::extract::{extract_products, extract_reasoning, score_confidence};
use crate::recommend::prompt::recommendation_prompt;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const FALLBACK_REASONING: &str = "Fallback response due to generation error";
const FALLBACK_CONFIDENCE: f64 = 0.3;
const FALLBACK_TAKE: usize = 2;

/// Composes recommendations through one model service
#[derive(Clone)]
pub struct RecommendationComposer {
    service: Arc<dyn ModelService>,
}

impl RecommendationComposer {
    pub fn new(service: Arc<dyn ModelService>) -> Self {
        Self { service }
    }

    pub fn provider(&self) -> ProviderKind {
        self.service.provider()
    }

    /// Compose a recommendation, surfacing backend failures
    pub async fn try_compose(
        &self,
        query: &str,
        intent: &ExtractedIntent,
        catalog: &[FinancialProduct],
        profile: Option<&UserProfile>,
        history: &[ConversationTurn],
    ) -> Result<RecommendationResult, ProviderError> {
        let prompt = recommendation_prompt(query, intent, catalog, profile);
        let context = GenerationContext::new(catalog, profile, history);
        let reply = self
            .service
            .generate(&prompt, &context, &GenerateOptions::COMPOSE)
            .await?;

        let result = shape_reply(&reply, intent, catalog);
        tracing::debug!(
            provider = %reply.provider,
            recommendations = result.recommendations().len(),
            confidence = result.confidence(),
            "Recommendation composed"
        );
        Ok(result)
    }

    /// Compose a recommendation; any failure yields the canned fallback
    pub async fn compose(
        &self,
        query: &str,
        intent: &ExtractedIntent,
        catalog: &[FinancialProduct],
        profile: Option<&UserProfile>,
        history: &[ConversationTurn],
    ) -> RecommendationResult {
        match self
            .try_compose(query, intent, catalog, profile, history)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    provider = %self.provider(),
                    error = %e,
                    "Recommendation generation failed, using canned fallback"
                );
                fallback_result(query, intent, catalog, self.provider())
            }
        }
    }
}

/// Structure a successful reply
fn shape_reply(
    reply: &GenerationResult,
    intent: &ExtractedIntent,
    catalog: &[FinancialProduct],
) -> RecommendationResult {
    let recommendations = extract_products(&reply.text, catalog);
    let reasoning = extract_reasoning(&reply.text);
    let confidence = score_confidence(
        intent.confidence(),
        &reply.text,
        !recommendations.is_empty(),
        reply.latency_ms,
    );

    let mut metadata = BTreeMap::new();
    metadata.insert("provider".to_string(), json!(reply.provider));
    metadata.insert("model".to_string(), json!(reply.model));
    metadata.insert("tokens_used".to_string(), json!(reply.tokens_used));
    metadata.insert("latency_ms".to_string(), json!(reply.latency_ms));
    metadata.insert("fallback".to_string(), Value::Bool(false));

    RecommendationResult::new(
        reply.text.clone(),
        recommendations,
        reasoning,
        confidence,
        intent.intent_type,
        metadata,
    )
}

/// Canned advisory answer used when generation fails
pub fn fallback_result(
    query: &str,
    intent: &ExtractedIntent,
    catalog: &[FinancialProduct],
    provider: ProviderKind,
) -> RecommendationResult {
    let content = format!(
        "I understand you're asking about \"{query}\". I'm here to help with financial product recommendations.

Based on your query, I can help you find suitable financial products. Here are some general considerations:

• Risk tolerance is important when choosing investments
• Consider your investment timeline and goals
• Diversification can help manage risk
• Always review fees and expenses

Would you like me to provide specific product recommendations based on your needs? Please let me know your risk tolerance and investment goals."
    );

    let mut metadata = BTreeMap::new();
    metadata.insert("fallback".to_string(), Value::Bool(true));
    metadata.insert("provider".to_string(), json!(provider));

    RecommendationResult::new(
        content,
        catalog.iter().take(FALLBACK_TAKE).cloned().collect(),
        FALLBACK_REASONING,
        FALLBACK_CONFIDENCE,
        intent.intent_type,
        metadata,
    )
}
