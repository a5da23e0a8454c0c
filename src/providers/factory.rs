//! Construction of model services from resolved settings
//!
//! The orchestrator asks a [`ProviderFactory`] for each configured backend.
//! Production uses [`HttpProviderFactory`]; tests inject factories that hand
//! back scripted services without any network access.

use crate::error::AppResult;
use crate::providers::{
    AnthropicService, ModelService, OpenAiService, ProviderKind, ServiceSettings,
};
use std::sync::Arc;

pub trait ProviderFactory: Send + Sync {
    /// Build a service for `settings.kind` in `settings.role`
    fn build(&self, settings: ServiceSettings) -> AppResult<Arc<dyn ModelService>>;
}

/// Builds the real HTTP adapters
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpProviderFactory;

impl ProviderFactory for HttpProviderFactory {
    fn build(&self, settings: ServiceSettings) -> AppResult<Arc<dyn ModelService>> {
        tracing::debug!(
            provider = %settings.kind,
            role = settings.role.as_str(),
            model = %settings.model,
            base_url = %settings.base_url,
            max_attempts = settings.retry.max_attempts(),
            "Building model service"
        );

        let service: Arc<dyn ModelService> = match settings.kind {
            ProviderKind::Anthropic => Arc::new(AnthropicService::new(settings)?),
            ProviderKind::OpenAi => Arc::new(OpenAiService::new(settings)?),
        };
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ProviderRole, RetryPolicy};
    use std::time::Duration;

    fn settings(kind: ProviderKind) -> ServiceSettings {
        ServiceSettings {
            kind,
            role: ProviderRole::Secondary,
            api_key: "sk-test".to_string(),
            model: "model-x".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::none(),
        }
    }

    #[test]
    fn test_http_factory_builds_requested_kind() {
        let factory = HttpProviderFactory;

        let anthropic = factory.build(settings(ProviderKind::Anthropic)).unwrap();
        assert_eq!(anthropic.provider(), ProviderKind::Anthropic);
        assert_eq!(anthropic.model(), "model-x");

        let openai = factory.build(settings(ProviderKind::OpenAi)).unwrap();
        assert_eq!(openai.provider(), ProviderKind::OpenAi);
    }
}
