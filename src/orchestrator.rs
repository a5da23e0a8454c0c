//! Orchestration manager
//!
//! Owns the configured model services and runs every query through a two-stage
//! pipeline: classify the intent, then compose a recommendation. Each stage
//! walks the healthy services in preference order and falls back to a local
//! answer when all of them fail, so a query only errors on misuse.
//!
//! The manager has two phases. It starts uninitialized; [`OrchestrationManager::initialize`]
//! builds and probes the services exactly once and moves it to the ready phase
//! for the rest of its lifetime.

use crate::config::Config;
use crate::domain::{ConversationTurn, FinancialProduct, ProductType, RiskLevel, UserProfile};
use crate::error::{AppError, AppResult};
use crate::intent::{ExtractedIntent, IntentClassifier, IntentType};
use crate::metrics::{Metrics, ServedBy, Stage};
use crate::providers::{
    GenerationContext, ModelService, ProviderFactory, ProviderKind, ProviderRole,
};
use crate::recommend::{RecommendationComposer, RecommendationResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// Longest accepted query, in characters
pub const MAX_QUERY_CHARS: usize = 5000;

/// Label recorded as `intent_provider` when no backend classified the query
pub const KEYWORD_SCAN: &str = "keyword_scan";

pub const ERROR_REASONING: &str = "Error response due to system issues";

const ERROR_TAKE: usize = 2;
const SELF_TEST_QUERY: &str = "Hello, how can you help me with investments?";

/// A built service and the role it was configured for
#[derive(Clone)]
struct Adapter {
    role: ProviderRole,
    service: Arc<dyn ModelService>,
}

/// One built service wired to both pipeline stages
struct Route {
    classifier: IntentClassifier,
    composer: RecommendationComposer,
}

impl Route {
    fn new(service: Arc<dyn ModelService>) -> Self {
        Self {
            classifier: IntentClassifier::new(service.clone()),
            composer: RecommendationComposer::new(service),
        }
    }

    fn provider(&self) -> ProviderKind {
        self.classifier.provider()
    }
}

/// State fixed by `initialize()`
struct Ready {
    /// Every service that could be built, healthy or not
    adapters: Vec<Adapter>,
    /// Every built service; those healthy at initialization come first
    routes: Vec<Route>,
}

/// Point-in-time health of the configured services
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub primary: ProviderKind,
    /// `None` when fallback is disabled
    pub secondary: Option<ProviderKind>,
    pub primary_healthy: bool,
    pub secondary_healthy: bool,
    /// Provider name that would serve next, or `"none"`
    pub active_provider: String,
    /// Exactly one of the two services is healthy
    pub fallback_available: bool,
    pub last_check: DateTime<Utc>,
}

/// Output of [`OrchestrationManager::self_test`]
#[derive(Debug, Clone, Serialize)]
pub struct SelfTestReport {
    pub intent: ExtractedIntent,
    pub recommendation: RecommendationResult,
    pub health: HealthStatus,
}

pub struct OrchestrationManager {
    config: Config,
    factory: Arc<dyn ProviderFactory>,
    metrics: Metrics,
    ready: OnceLock<Ready>,
}

impl OrchestrationManager {
    pub fn new(config: Config, factory: Arc<dyn ProviderFactory>, metrics: Metrics) -> Self {
        Self {
            config,
            factory,
            metrics,
            ready: OnceLock::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.get().is_some()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Build and probe the configured services
    ///
    /// Every service that could be built becomes a route; the health probe
    /// only decides the order, healthy services first. Returns `Ok(false)`
    /// when no service is healthy. The manager is ready either way, and with
    /// no service configured every query gets the canned error response.
    /// Only a second call is an error.
    pub async fn initialize(&self) -> AppResult<bool> {
        if self.is_initialized() {
            return Err(AppError::AlreadyInitialized);
        }

        let adapters = self.build_adapters();
        let health =
            futures::future::join_all(adapters.iter().map(|a| a.service.check_health())).await;

        for (adapter, healthy) in adapters.iter().zip(&health) {
            if !healthy {
                tracing::warn!(
                    provider = %adapter.service.provider(),
                    role = adapter.role.as_str(),
                    "Model service failed its health probe, routing to it last"
                );
            }
        }

        // Healthy services first; the sort is stable so role order holds within each group
        let mut ranked: Vec<(&Adapter, bool)> = adapters.iter().zip(health).collect();
        ranked.sort_by_key(|(_, healthy)| !healthy);
        let healthy = ranked.iter().any(|(_, healthy)| *healthy);
        let routes: Vec<Route> = ranked
            .into_iter()
            .map(|(adapter, _)| Route::new(adapter.service.clone()))
            .collect();

        let order: Vec<&str> = routes.iter().map(|r| r.provider().as_str()).collect();
        if healthy {
            tracing::info!(routes = ?order, "Orchestration manager initialized");
        } else if routes.is_empty() {
            tracing::error!("No model service is configured, queries will get the canned response");
        } else {
            tracing::error!(
                routes = ?order,
                "No model service passed its health probe, queries will still try them"
            );
        }

        self.ready
            .set(Ready { adapters, routes })
            .map_err(|_| AppError::AlreadyInitialized)?;
        Ok(healthy)
    }

    fn build_adapters(&self) -> Vec<Adapter> {
        let mut adapters = Vec::new();
        for (kind, role) in self.config.route_order() {
            let Some(settings) = self.config.service_settings(kind, role) else {
                tracing::warn!(
                    provider = %kind,
                    role = role.as_str(),
                    "API key not configured or using placeholder, skipping provider"
                );
                continue;
            };

            match self.factory.build(settings) {
                Ok(service) => {
                    tracing::info!(
                        provider = %kind,
                        role = role.as_str(),
                        model = service.model(),
                        "Model service configured"
                    );
                    adapters.push(Adapter { role, service });
                }
                Err(e) => {
                    tracing::error!(
                        provider = %kind,
                        role = role.as_str(),
                        error = %e,
                        "Failed to build model service, treating it as not configured"
                    );
                }
            }
        }
        adapters
    }

    /// Answer one query
    ///
    /// Backend failures never surface here; they degrade the answer instead,
    /// and the result metadata says how. Errors are limited to calling before
    /// `initialize()` and a blank or oversized query.
    pub async fn process_query(
        &self,
        query: &str,
        catalog: &[FinancialProduct],
        profile: Option<&UserProfile>,
        history: &[ConversationTurn],
    ) -> AppResult<RecommendationResult> {
        let ready = self.ready.get().ok_or(AppError::NotInitialized)?;
        validate_query(query)?;

        let (_, result) = self.run_pipeline(ready, query, catalog, profile, history).await;
        Ok(result)
    }

    async fn run_pipeline(
        &self,
        ready: &Ready,
        query: &str,
        catalog: &[FinancialProduct],
        profile: Option<&UserProfile>,
        history: &[ConversationTurn],
    ) -> (ExtractedIntent, RecommendationResult) {
        let request_id = Uuid::new_v4().to_string();
        tracing::info!(
            request_id = %request_id,
            query_chars = query.chars().count(),
            catalog_size = catalog.len(),
            "Processing query"
        );

        let (intent, intent_provider) = self
            .classify(ready, &request_id, query, profile, history)
            .await;
        let result = self
            .compose(ready, &request_id, query, &intent, catalog, profile, history)
            .await
            .with_metadata("request_id", request_id.as_str())
            .with_metadata("intent_provider", intent_provider);

        tracing::info!(
            request_id = %request_id,
            intent_type = %result.intent_type(),
            provider = result.provider().unwrap_or("none"),
            fallback = result.is_fallback(),
            confidence = result.confidence(),
            "Query processed"
        );
        (intent, result)
    }

    async fn classify(
        &self,
        ready: &Ready,
        request_id: &str,
        query: &str,
        profile: Option<&UserProfile>,
        history: &[ConversationTurn],
    ) -> (ExtractedIntent, &'static str) {
        let context = GenerationContext::new(&[], profile, history);

        for route in &ready.routes {
            match route.classifier.try_analyze(query, &context).await {
                Ok(intent) => return (intent, route.provider().as_str()),
                Err(e) => {
                    tracing::warn!(
                        request_id = %request_id,
                        stage = Stage::Intent.as_str(),
                        provider = %route.provider(),
                        error = %e,
                        "Intent analysis failed, moving to next route"
                    );
                    self.record_stage_failure(route.provider(), Stage::Intent);
                }
            }
        }

        tracing::warn!(
            request_id = %request_id,
            stage = Stage::Intent.as_str(),
            "All model services failed intent analysis, using keyword scan"
        );
        (ExtractedIntent::fallback(query), KEYWORD_SCAN)
    }

    #[allow(clippy::too_many_arguments)]
    async fn compose(
        &self,
        ready: &Ready,
        request_id: &str,
        query: &str,
        intent: &ExtractedIntent,
        catalog: &[FinancialProduct],
        profile: Option<&UserProfile>,
        history: &[ConversationTurn],
    ) -> RecommendationResult {
        for route in &ready.routes {
            match route
                .composer
                .try_compose(query, intent, catalog, profile, history)
                .await
            {
                Ok(result) => {
                    let provider = route.provider();
                    if let Some(latency) = result.metadata().get("latency_ms").and_then(Value::as_f64)
                    {
                        log_recording(
                            self.metrics.record_generation_latency(provider, latency),
                            "record_generation_latency",
                        );
                    }
                    log_recording(
                        self.metrics.record_query(ServedBy::Provider(provider)),
                        "record_query",
                    );
                    return result;
                }
                Err(e) => {
                    tracing::warn!(
                        request_id = %request_id,
                        stage = Stage::Compose.as_str(),
                        provider = %route.provider(),
                        error = %e,
                        "Recommendation generation failed, moving to next route"
                    );
                    self.record_stage_failure(route.provider(), Stage::Compose);
                }
            }
        }

        tracing::error!(
            request_id = %request_id,
            stage = Stage::Compose.as_str(),
            "All model services failed, serving canned error response"
        );
        log_recording(self.metrics.record_query(ServedBy::Canned), "record_query");
        error_response(query, catalog)
    }

    fn record_stage_failure(&self, provider: ProviderKind, stage: Stage) {
        log_recording(
            self.metrics.record_backend_failure(provider, stage),
            "record_backend_failure",
        );
        log_recording(
            self.metrics.record_stage_fallback(stage),
            "record_stage_fallback",
        );
    }

    /// Probe every configured service concurrently
    ///
    /// Reports only; the route order decided at initialization is not changed.
    pub async fn health_check(&self) -> HealthStatus {
        let primary_kind = self.config.llm.primary;
        let secondary_kind = self
            .config
            .llm
            .fallback_enabled
            .then(|| self.config.llm.secondary());

        let (primary_healthy, secondary_healthy) = futures::join!(
            probe(self.adapter(ProviderRole::Primary)),
            probe(self.adapter(ProviderRole::Secondary)),
        );

        let active_provider = if primary_healthy {
            primary_kind.as_str()
        } else if secondary_healthy {
            secondary_kind.map_or("none", |kind| kind.as_str())
        } else {
            "none"
        };

        let status = HealthStatus {
            primary: primary_kind,
            secondary: secondary_kind,
            primary_healthy,
            secondary_healthy,
            active_provider: active_provider.to_string(),
            fallback_available: primary_healthy != secondary_healthy,
            last_check: Utc::now(),
        };
        tracing::debug!(
            primary_healthy,
            secondary_healthy,
            active_provider = %status.active_provider,
            "Health check complete"
        );
        status
    }

    fn adapter(&self, role: ProviderRole) -> Option<Arc<dyn ModelService>> {
        self.ready
            .get()?
            .adapters
            .iter()
            .find(|a| a.role == role)
            .map(|a| a.service.clone())
    }

    /// Model identifiers per configured provider
    ///
    /// A provider whose listing fails maps to an empty list.
    pub async fn list_available_models(&self) -> BTreeMap<String, Vec<String>> {
        let Some(ready) = self.ready.get() else {
            return BTreeMap::new();
        };

        let listings = futures::future::join_all(ready.adapters.iter().map(|adapter| async move {
            let kind = adapter.service.provider();
            let models = adapter.service.list_models().await.unwrap_or_else(|e| {
                tracing::error!(provider = %kind, error = %e, "Failed to list models");
                Vec::new()
            });
            (kind.as_str().to_string(), models)
        }))
        .await;

        listings.into_iter().collect()
    }

    /// Run the full pipeline against a one-product demo catalog
    pub async fn self_test(&self) -> AppResult<SelfTestReport> {
        let ready = self.ready.get().ok_or(AppError::NotInitialized)?;
        let catalog = [demo_product()];

        let (intent, recommendation) = self
            .run_pipeline(ready, SELF_TEST_QUERY, &catalog, None, &[])
            .await;
        let health = self.health_check().await;

        Ok(SelfTestReport {
            intent,
            recommendation,
            health,
        })
    }
}

async fn probe(service: Option<Arc<dyn ModelService>>) -> bool {
    match service {
        Some(service) => service.check_health().await,
        None => false,
    }
}

fn log_recording(outcome: Result<(), prometheus::Error>, operation: &str) {
    if let Err(e) = outcome {
        tracing::warn!(operation, error = %e, "Failed to record metric");
    }
}

fn validate_query(query: &str) -> AppResult<()> {
    if query.trim().is_empty() {
        return Err(AppError::Validation("query must not be empty".to_string()));
    }
    let chars = query.chars().count();
    if chars > MAX_QUERY_CHARS {
        return Err(AppError::Validation(format!(
            "query must be at most {} characters, got {}",
            MAX_QUERY_CHARS, chars
        )));
    }
    Ok(())
}

/// Answer served when every model service failed
///
/// Worded differently from the composer's own fallback so the two are
/// distinguishable; flagged with both `error` and `fallback`.
pub fn error_response(query: &str, catalog: &[FinancialProduct]) -> RecommendationResult {
    let content = format!(
        "I apologize, but I'm experiencing technical difficulties processing your query: \"{query}\".

I'm here to help with financial product recommendations. Please try again in a moment, or you can:

• Ask about specific types of investments (mutual funds, ETFs, bonds)
• Inquire about risk tolerance and investment goals
• Request product comparisons
• Ask about investment strategies

I'll be happy to assist once the system is back online."
    );

    let mut metadata = BTreeMap::new();
    metadata.insert("error".to_string(), Value::Bool(true));
    metadata.insert("fallback".to_string(), Value::Bool(true));
    metadata.insert("provider".to_string(), json!("none"));

    RecommendationResult::new(
        content,
        catalog.iter().take(ERROR_TAKE).cloned().collect(),
        ERROR_REASONING,
        0.0,
        IntentType::Unknown,
        metadata,
    )
}

fn demo_product() -> FinancialProduct {
    let mut product = FinancialProduct::new(
        "TEST_001",
        "Test Mutual Fund",
        ProductType::MutualFund,
        RiskLevel::Medium,
    )
    .with_description("A test mutual fund for demonstration")
    .with_expected_return("5-8%")
    .with_minimum_investment(1000.0)
    .with_expense_ratio(0.0125);
    product.issuer = "Test Financial Corp".to_string();
    product
}
