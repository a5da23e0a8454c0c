//! Model-backed intent classification

use crate::intent::{ExtractedIntent, parse_reply};
use crate::providers::{
    GenerateOptions, GenerationContext, ModelService, ProviderError, ProviderKind,
};
use std::sync::Arc;

/// Classifies queries through one model service
#[derive(Clone)]
pub struct IntentClassifier {
    service: Arc<dyn ModelService>,
}

impl IntentClassifier {
    pub fn new(service: Arc<dyn ModelService>) -> Self {
        Self { service }
    }

    pub fn provider(&self) -> ProviderKind {
        self.service.provider()
    }

    /// Classify `query`, surfacing backend failures
    ///
    /// A reply that arrives but cannot be parsed is not an error: it resolves to
    /// [`ExtractedIntent::fallback`]. Only a failed `generate` call returns `Err`,
    /// so callers can fail over to another service.
    pub async fn try_analyze(
        &self,
        query: &str,
        context: &GenerationContext<'_>,
    ) -> Result<ExtractedIntent, ProviderError> {
        let prompt = analysis_prompt(query);
        let reply = self
            .service
            .generate(&prompt, context, &GenerateOptions::CLASSIFY)
            .await?;

        match parse_reply(&reply.text) {
            Ok(intent) => {
                tracing::debug!(
                    provider = %reply.provider,
                    intent_type = %intent.intent_type,
                    confidence = intent.confidence(),
                    "Intent classified"
                );
                Ok(intent)
            }
            Err(e) => {
                tracing::warn!(
                    provider = %reply.provider,
                    error = %e,
                    "Unparseable classifier reply, using keyword scan"
                );
                Ok(ExtractedIntent::fallback(query))
            }
        }
    }

    /// Classify `query`; any failure yields the keyword-scan fallback
    pub async fn analyze(&self, query: &str, context: &GenerationContext<'_>) -> ExtractedIntent {
        match self.try_analyze(query, context).await {
            Ok(intent) => intent,
            Err(e) => {
                tracing::error!(
                    provider = %self.provider(),
                    error = %e,
                    "Intent analysis failed, using keyword scan"
                );
                ExtractedIntent::fallback(query)
            }
        }
    }
}

/// Instruction prompt asking for the line-oriented `KEY: value` reply
pub fn analysis_prompt(query: &str) -> String {
    format!(
        r#"
Analyze the following user query for financial product recommendations and extract intent information.

Query: "{query}"

Please analyze this query and provide a structured response in the following format:

INTENT_TYPE: [product_recommendation|product_comparison|risk_assessment|investment_goals|portfolio_review|general_question|unknown]
CONFIDENCE: [0.0-1.0]
RISK_TOLERANCE: [low|medium|high|null]
INVESTMENT_GOALS: [retirement,education,home_purchase,emergency_fund,wealth_building,income_generation,tax_efficiency]
INVESTMENT_HORIZON: [short_term|medium_term|long_term|null]
PREFERRED_PRODUCTS: [mutual_fund,etf,bond,stock,real_estate,commodity]
BUDGET_MIN: [amount or null]
BUDGET_MAX: [amount or null]
KEYWORDS: [comma-separated keywords]
ENTITIES: [any specific entities mentioned]

Focus on:
1. What type of financial product or service the user is looking for
2. Their risk tolerance level
3. Investment goals and time horizon
4. Budget constraints
5. Specific product preferences
6. Any entities like company names, product names, etc.

Provide only the structured response, no additional text.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{IntentType, RiskTolerance};
    use crate::providers::test_support::ScriptedService;

    #[test]
    fn test_prompt_embeds_query_and_format() {
        let prompt = analysis_prompt("Best ETF for retirement?");
        assert!(prompt.contains(r#"Query: "Best ETF for retirement?""#));
        assert!(prompt.contains("INTENT_TYPE:"));
        assert!(prompt.contains("BUDGET_MAX: [amount or null]"));
    }

    #[tokio::test]
    async fn test_try_analyze_parses_reply() {
        let service = Arc::new(ScriptedService::new(ProviderKind::Anthropic).reply(
            "INTENT_TYPE: risk_assessment\nCONFIDENCE: 0.7\nRISK_TOLERANCE: low",
        ));
        let classifier = IntentClassifier::new(service.clone());

        let intent = classifier
            .try_analyze("How risky are bonds?", &GenerationContext::default())
            .await
            .unwrap();

        assert_eq!(intent.intent_type, IntentType::RiskAssessment);
        assert_eq!(intent.confidence(), 0.7);
        assert_eq!(intent.risk_tolerance, Some(RiskTolerance::Low));
        assert_eq!(service.calls(), 1);
        assert!(service.prompts()[0].contains("How risky are bonds?"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_fallback_not_error() {
        let service = Arc::new(
            ScriptedService::new(ProviderKind::OpenAi).reply("CONFIDENCE: very sure"),
        );
        let classifier = IntentClassifier::new(service);

        let intent = classifier
            .try_analyze("safe bond fund", &GenerationContext::default())
            .await
            .unwrap();

        assert_eq!(intent.intent_type, IntentType::Unknown);
        assert_eq!(intent.confidence(), 0.0);
        assert_eq!(intent.keywords, vec!["fund", "bond", "safe"]);
    }

    #[tokio::test]
    async fn test_backend_failure_propagates_from_try_analyze() {
        let service = Arc::new(ScriptedService::new(ProviderKind::Anthropic).fail("invalid key"));
        let classifier = IntentClassifier::new(service);

        let result = classifier
            .try_analyze("anything", &GenerationContext::default())
            .await;
        assert!(matches!(result, Err(ProviderError::Backend { .. })));
    }

    #[tokio::test]
    async fn test_analyze_absorbs_backend_failure() {
        let service = Arc::new(ScriptedService::new(ProviderKind::Anthropic).fail("invalid key"));
        let classifier = IntentClassifier::new(service);

        let intent = classifier
            .analyze("I want to invest for my retirement", &GenerationContext::default())
            .await;
        assert_eq!(intent.intent_type, IntentType::Unknown);
        assert_eq!(intent.keywords, vec!["retirement"]);
    }
}
