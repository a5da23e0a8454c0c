//! OpenAI Chat Completions adapter

use crate::error::{AppError, AppResult};
use crate::providers::context::{recent_history, system_preamble};
use crate::providers::{
    GenerateOptions, GenerationContext, GenerationResult, ModelList, ModelService, ProviderError,
    ProviderKind, RetryPolicy, ServiceSettings,
};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

const PROVIDER: ProviderKind = ProviderKind::OpenAi;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4";

/// GPT models via `POST /v1/chat/completions`
#[derive(Debug, Clone)]
pub struct OpenAiService {
    http: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl OpenAiService {
    pub fn new(settings: ServiceSettings) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
            .map_err(|e| {
                AppError::Config(format!("openai api key is not a valid header value: {e}"))
            })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build openai client: {e}")))?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model,
            timeout: settings.timeout,
            retry: settings.retry,
        })
    }

    async fn create_completion(
        &self,
        request: &ChatRequest<'_>,
    ) -> Result<ChatResponse, ProviderError> {
        let res = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(PROVIDER, e, self.timeout))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(PROVIDER, status.as_u16(), body));
        }

        res.json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::Decode {
                provider: PROVIDER,
                message: e.to_string(),
            })
    }
}

/// System preamble, then recent history as role messages, then the prompt
fn build_messages<'a>(
    system: &'a str,
    context: &GenerationContext<'a>,
    prompt: &'a str,
) -> Vec<ChatMessage<'a>> {
    let history = recent_history(context.history);
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage {
        role: "system",
        content: system,
    });
    messages.extend(history.iter().map(|turn| ChatMessage {
        role: turn.role.as_str(),
        content: &turn.content,
    }));
    messages.push(ChatMessage {
        role: "user",
        content: prompt,
    });
    messages
}

#[async_trait]
impl ModelService for OpenAiService {
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
        let system = system_preamble(context, false);
        let request = ChatRequest {
            model: &self.model,
            messages: build_messages(&system, context, prompt),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let request = &request;
        let response = self
            .retry
            .run(PROVIDER, self.timeout, |attempt| {
                tracing::debug!(provider = %PROVIDER, attempt = attempt, model = %self.model, "Sending chat completion request");
                self.create_completion(request)
            })
            .await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse { provider: PROVIDER });
        }

        Ok(GenerationResult {
            text,
            model: self.model.clone(),
            provider: PROVIDER,
            tokens_used: response.usage.map(|usage| usage.total_tokens),
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
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}
