//! Scripted in-process model service for unit tests

use crate::providers::{
    GenerateOptions, GenerationContext, GenerationResult, ModelService, ProviderError,
    ProviderKind,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Replies are popped in order; once the script runs dry the last entry repeats
pub(crate) struct ScriptedService {
    kind: ProviderKind,
    model: String,
    healthy: bool,
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    last: Mutex<Option<Result<String, ProviderError>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedService {
    pub(crate) fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            model: format!("{}-test-model", kind.as_str()),
            healthy: true,
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub(crate) fn reply(self, text: &str) -> Self {
        self.push(Ok(text.to_string()))
    }

    pub(crate) fn fail(self, message: &str) -> Self {
        let err = ProviderError::Backend {
            provider: self.kind,
            message: message.to_string(),
        };
        self.push(Err(err))
    }

    fn push(self, entry: Result<String, ProviderError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelService for ScriptedService {
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
        self.prompts.lock().unwrap().push(prompt.to_string());

        let next = self.script.lock().unwrap().pop_front();
        let entry = match next {
            Some(entry) => {
                *self.last.lock().unwrap() = Some(entry.clone());
                entry
            }
            None => self.last.lock().unwrap().clone().unwrap_or_else(|| {
                Err(ProviderError::Backend {
                    provider: self.kind,
                    message: "script exhausted".to_string(),
                })
            }),
        };

        entry.map(|text| GenerationResult {
            text,
            model: self.model.clone(),
            provider: self.kind,
            tokens_used: Some(42),
            latency_ms: Some(120.0),
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
