//! Anthropic Messages API adapter

use crate::error::{AppError, AppResult};
use crate::providers::context::system_preamble;
use crate::providers::{
    GenerateOptions, GenerationContext, GenerationResult, ModelList, ModelService, ProviderError,
    ProviderKind, RetryPolicy, ServiceSettings,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROVIDER: ProviderKind = ProviderKind::Anthropic;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Claude via `POST /v1/messages`
#[derive(Debug, Clone)]
pub struct AnthropicService {
    http: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl AnthropicService {
    pub fn new(settings: ServiceSettings) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&settings.api_key).map_err(|e| {
            AppError::Config(format!("anthropic api key is not a valid header value: {e}"))
        })?;
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build anthropic client: {e}")))?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model,
            timeout: settings.timeout,
            retry: settings.retry,
        })
    }

    async fn create_message(
        &self,
        request: &MessagesRequest<'_>,
    ) -> Result<MessagesResponse, ProviderError> {
        let res = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(PROVIDER, e, self.timeout))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(PROVIDER, status.as_u16(), body));
        }

        res.json::<MessagesResponse>()
            .await
            .map_err(|e| ProviderError::Decode {
                provider: PROVIDER,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl ModelService for AnthropicService {
    fn provider(&self) -> ProviderKind {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        context: &GenerationContext<'_>,
        options: &GenerateOptions,
    ) -> Result<GenerationResult, ProviderError> {
        let started = Instant::now();
        let system = system_preamble(context, true);
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            system: &system,
            messages: vec![WireMessage {
                role: "user",
                content: prompt,
            }],
        };

        let request = &request;
        let response = self
            .retry
            .run(PROVIDER, self.timeout, |attempt| {
                tracing::debug!(provider = %PROVIDER, attempt = attempt, model = %self.model, "Sending messages request");
                self.create_message(request)
            })
            .await?;

        let text: String = response
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse { provider: PROVIDER });
        }

        Ok(GenerationResult {
            text,
            model: self.model.clone(),
            provider: PROVIDER,
            tokens_used: response
                .usage
                .map(|usage| usage.input_tokens + usage.output_tokens),
            latency_ms: Some(started.elapsed().as_secs_f64() * 1000.0),
            created_at: chrono::Utc::now(),
        })
    }

    async fn check_health(&self) -> bool {
        match self.list_models().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(provider = %PROVIDER, error = %e, "Health probe failed");
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let request = async {
            let res = self
                .http
                .get(format!("{}/v1/models", self.base_url))
                .send()
                .await
                .map_err(|e| ProviderError::from_transport(PROVIDER, e, self.timeout))?;

            let status = res.status();
            if !status.is_success() {
                let body = res.text().await.unwrap_or_default();
                return Err(ProviderError::from_status(PROVIDER, status.as_u16(), body));
            }

            res.json::<ModelList>()
                .await
                .map(ModelList::into_ids)
                .map_err(|e| ProviderError::Decode {
                    provider: PROVIDER,
                    message: e.to_string(),
                })
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .unwrap_or(Err(ProviderError::Timeout {
                provider: PROVIDER,
                timeout_ms: self.timeout.as_millis() as u64,
            }))
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}
