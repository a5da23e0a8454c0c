//! Hosted model services
//!
//! A [`ModelService`] wraps one hosted text-generation endpoint. The orchestration
//! layer never knows which concrete backend it is talking to; it only holds an
//! ordered list of `Arc<dyn ModelService>` and walks it on failure.

pub mod anthropic;
pub mod context;
pub mod error;
pub mod factory;
pub mod openai;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_support;

pub use anthropic::AnthropicService;
pub use error::{ProviderError, RetryClass};
pub use factory::{HttpProviderFactory, ProviderFactory};
pub use openai::OpenAiService;
pub use retry::RetryPolicy;

use crate::domain::{ConversationTurn, FinancialProduct, UserProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which hosted backend a service talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
}

impl ProviderKind {
    /// Label used in metadata, metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }

    /// The provider that serves as secondary when `self` is primary
    pub fn other(&self) -> Self {
        match self {
            Self::Anthropic => Self::OpenAi,
            Self::OpenAi => Self::Anthropic,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a service in the preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderRole {
    Primary,
    Secondary,
}

impl ProviderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

/// Sampling parameters for one generation call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerateOptions {
    /// Deterministic-leaning settings for intent classification
    pub const CLASSIFY: Self = Self {
        temperature: 0.3,
        max_tokens: 500,
    };

    /// Settings for multi-section recommendation prose
    pub const COMPOSE: Self = Self {
        temperature: 0.7,
        max_tokens: 1500,
    };
}

/// Optional structured context rendered into the system preamble
///
/// Borrows everything; nothing here outlives the request that built it.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationContext<'a> {
    pub products: &'a [FinancialProduct],
    pub profile: Option<&'a UserProfile>,
    pub history: &'a [ConversationTurn],
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        products: &'a [FinancialProduct],
        profile: Option<&'a UserProfile>,
        history: &'a [ConversationTurn],
    ) -> Self {
        Self {
            products,
            profile,
            history,
        }
    }
}

/// Output of one successful `generate` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub text: String,
    pub model: String,
    pub provider: ProviderKind,
    pub tokens_used: Option<u64>,
    /// Wall-clock time across every attempt of the call
    pub latency_ms: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Connection settings for building one service
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub kind: ProviderKind,
    pub role: ProviderRole,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Hard per-attempt timeout
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

/// A hosted text-generation backend
///
/// Implementations must be safe to call concurrently; the orchestrator shares
/// one instance across every in-flight request.
#[async_trait]
pub trait ModelService: Send + Sync {
    fn provider(&self) -> ProviderKind;

    fn model(&self) -> &str;

    /// Generate a completion for `prompt`
    ///
    /// The context is rendered into a system preamble. Transient failures are
    /// retried according to the service's [`RetryPolicy`] before an error is
    /// returned.
    async fn generate(
        &self,
        prompt: &str,
        context: &GenerationContext<'_>,
        options: &GenerateOptions,
    ) -> Result<GenerationResult, ProviderError>;

    /// Lightweight liveness probe; never errors
    async fn check_health(&self) -> bool;

    /// Model identifiers the backend currently offers
    async fn list_models(&self) -> Result<Vec<String>, ProviderError>;
}

/// `GET /v1/models` body shared by both hosted APIs
#[derive(Debug, Deserialize)]
pub(crate) struct ModelList {
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelEntry {
    pub id: String,
}

impl ModelList {
    pub(crate) fn into_ids(self) -> Vec<String> {
        self.data.into_iter().map(|entry| entry.id).collect()
    }
}
