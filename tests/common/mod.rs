//! Shared helpers for integration tests
//!
//! `MockService` is an in-process `ModelService` with a fixed behaviour, and
//! `MockFactory` hands pre-built mocks to the orchestration manager.

#![allow(dead_code)]

use async_trait::async_trait;
use finrec::config::Config;
use finrec::domain::{FinancialProduct, ProductType, RiskLevel};
use finrec::error::{AppError, AppResult};
use finrec::metrics::Metrics;
use finrec::orchestrator::OrchestrationManager;
use finrec::providers::{
    GenerateOptions, GenerationContext, GenerationResult, ModelService, ProviderError,
    ProviderFactory, ProviderKind, ServiceSettings,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const CLASSIFIER_REPLY: &str = "INTENT_TYPE: product_recommendation\n\
CONFIDENCE: 0.8\n\
RISK_TOLERANCE: low\n\
INVESTMENT_GOALS: income_generation, retirement\n\
KEYWORDS: bond, income";

pub const COMPOSER_REPLY: &str = "**Executive Summary**\n\
The Core Bond Fund is a good match because you want steady income.\n\
Keep a small allocation to the Broad Market ETF for growth.";

#[derive(Clone)]
pub enum Behavior {
    /// Answers classifier prompts and composer prompts with canned replies
    Pipeline,
    /// Classifies normally, then fails every composition
    ClassifyOnly,
    Reply(String),
    Fail(ProviderError),
}

pub struct MockService {
    kind: ProviderKind,
    model: String,
    healthy: bool,
    behavior: Behavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockService {
    pub fn new(kind: ProviderKind, behavior: Behavior) -> Self {
        Self {
            kind,
            model: format!("{}-mock", kind),
            healthy: true,
            behavior,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn pipeline(kind: ProviderKind) -> Self {
        Self::new(kind, Behavior::Pipeline)
    }

    /// Fails every call with an error that is never retried
    pub fn broken(kind: ProviderKind) -> Self {
        Self::new(
            kind,
            Behavior::Fail(ProviderError::Http {
                provider: kind,
                status: 401,
                body: "invalid api key".to_string(),
            }),
        )
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelService for MockService {
    fn provider(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        _context: &GenerationContext<'_>,
        _options: &GenerateOptions,
    ) -> Result<GenerationResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let text = match &self.behavior {
            // The classifier prompt asks for INTENT_TYPE; the composer prompt never does
            Behavior::Pipeline if prompt.contains("INTENT_TYPE:") => CLASSIFIER_REPLY.to_string(),
            Behavior::Pipeline => COMPOSER_REPLY.to_string(),
            Behavior::ClassifyOnly if prompt.contains("INTENT_TYPE:") => {
                CLASSIFIER_REPLY.to_string()
            }
            Behavior::ClassifyOnly => {
                return Err(ProviderError::Timeout {
                    provider: self.kind,
                    timeout_ms: 30_000,
                });
            }
            Behavior::Reply(text) => text.clone(),
            Behavior::Fail(err) => return Err(err.clone()),
        };

        Ok(GenerationResult {
            text,
            model: self.model.clone(),
            provider: self.kind,
            tokens_used: Some(100),
            latency_ms: Some(350.0),
            created_at: chrono::Utc::now(),
        })
    }

    async fn check_health(&self) -> bool {
        self.healthy
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        if self.healthy {
            Ok(vec![self.model.clone()])
        } else {
            Err(ProviderError::Transport {
                provider: self.kind,
                message: "connection refused".to_string(),
            })
        }
    }
}

#[derive(Default)]
pub struct MockFactory {
    services: HashMap<ProviderKind, Arc<MockService>>,
}

impl MockFactory {
    pub fn with(mut self, service: MockService) -> Self {
        self.services.insert(service.provider(), Arc::new(service));
        self
    }

    pub fn service(&self, kind: ProviderKind) -> Arc<MockService> {
        self.services[&kind].clone()
    }
}

impl ProviderFactory for MockFactory {
    fn build(&self, settings: ServiceSettings) -> AppResult<Arc<dyn ModelService>> {
        let service = self
            .services
            .get(&settings.kind)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("no mock for {}", settings.kind)))?;
        Ok(service)
    }
}

/// Config with inline credentials for both providers plus `extra` TOML
pub fn config_with_keys(extra: &str) -> Config {
    Config::from_str(&format!(
        r#"
[providers.anthropic]
api_key = "sk-ant-integration"

[providers.openai]
api_key = "sk-openai-integration"

{extra}
"#
    ))
    .expect("test config should parse")
}

pub fn manager(factory: MockFactory, config: Config) -> (OrchestrationManager, Arc<MockFactory>) {
    let factory = Arc::new(factory);
    let manager = OrchestrationManager::new(
        config,
        factory.clone(),
        Metrics::new().expect("Failed to create metrics"),
    );
    (manager, factory)
}

pub fn catalog() -> Vec<FinancialProduct> {
    vec![
        FinancialProduct::new("BOND_001", "Core Bond Fund", ProductType::Bond, RiskLevel::Low)
            .with_expected_return("3-4%")
            .with_minimum_investment(500.0)
            .with_expense_ratio(0.0005),
        FinancialProduct::new("ETF_001", "Broad Market ETF", ProductType::Etf, RiskLevel::Medium)
            .with_expected_return("6-9%")
            .with_minimum_investment(1.0)
            .with_expense_ratio(0.0003),
        FinancialProduct::new("STK_001", "Growth Leaders", ProductType::Stock, RiskLevel::High)
            .with_expected_return("8-12%")
            .with_minimum_investment(100.0),
    ]
}
