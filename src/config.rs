//! Configuration management for finrec
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Every section and field has a default, so an empty file is a valid
//! configuration that reads credentials from the environment.

use crate::error::{AppError, AppResult};
use crate::providers::{ProviderKind, ProviderRole, RetryPolicy, ServiceSettings, anthropic, openai};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Credential values shipped in sample `.env` files
const PLACEHOLDER_KEYS: [&str; 2] = ["your_actual_anthropic_key_here", "your_openai_api_key_here"];

const MAX_ATTEMPTS_LIMIT: u32 = 10;
const TIMEOUT_LIMIT_SECONDS: u64 = 300;
const BACKOFF_UNIT_LIMIT_MS: u64 = 60_000;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Provider preference, fallback and retry settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Preferred backend; the other one is the secondary
    #[serde(default = "default_primary")]
    pub primary: ProviderKind,
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,
    /// Total attempts for the primary backend on transient errors
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Hard per-attempt timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Backoff unit: overload waits `2^n` units, timeout waits `n` units
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            fallback_enabled: true,
            max_attempts: default_max_attempts(),
            timeout_seconds: default_timeout_seconds(),
            backoff_unit_ms: default_backoff_unit_ms(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    pub fn secondary(&self) -> ProviderKind {
        self.primary.other()
    }

    /// Retry policy for a service in `role`; only the primary retries
    pub fn retry_policy(&self, role: ProviderRole) -> RetryPolicy {
        match role {
            ProviderRole::Primary => RetryPolicy::standard(self.max_attempts, self.backoff_unit()),
            ProviderRole::Secondary => RetryPolicy::none(),
        }
    }
}

fn default_primary() -> ProviderKind {
    ProviderKind::Anthropic
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

/// Per-backend connection settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub anthropic: ProviderSettings,
    #[serde(default)]
    pub openai: ProviderSettings,
}

impl ProvidersConfig {
    pub fn get(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::OpenAi => &self.openai,
        }
    }
}

/// Connection settings for one backend
///
/// Unset fields fall back to the provider's defaults, which is why they are
/// resolved through accessors taking the provider kind.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderSettings {
    /// Inline credential; takes precedence over `api_key_env`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ProviderSettings {
    pub fn api_key_env(&self, kind: ProviderKind) -> &str {
        self.api_key_env.as_deref().unwrap_or(match kind {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
        })
    }

    pub fn model(&self, kind: ProviderKind) -> &str {
        self.model.as_deref().unwrap_or(match kind {
            ProviderKind::Anthropic => anthropic::DEFAULT_MODEL,
            ProviderKind::OpenAi => openai::DEFAULT_MODEL,
        })
    }

    pub fn base_url(&self, kind: ProviderKind) -> &str {
        self.base_url.as_deref().unwrap_or(match kind {
            ProviderKind::Anthropic => anthropic::DEFAULT_BASE_URL,
            ProviderKind::OpenAi => openai::DEFAULT_BASE_URL,
        })
    }

    /// Usable credential, or `None` when missing or a placeholder
    pub fn resolve_api_key(&self, kind: ProviderKind) -> Option<String> {
        if let Some(key) = self.api_key.as_deref().filter(|k| is_real_credential(k)) {
            return Some(key.trim().to_string());
        }
        std::env::var(self.api_key_env(kind))
            .ok()
            .filter(|k| is_real_credential(k))
            .map(|k| k.trim().to_string())
    }
}

/// False for blanks and `your_..._here` style sample values
pub fn is_real_credential(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || PLACEHOLDER_KEYS.contains(&value) {
        return false;
    }
    let lower = value.to_lowercase();
    !(lower.starts_with("your_") && lower.ends_with("_here"))
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(
                path = %path.as_ref().display(),
                "Config file not found, using defaults"
            );
            Ok(Self::default())
        }
    }

    /// Check value ranges; errors name the offending key
    pub fn validate(&self) -> AppResult<()> {
        let llm = &self.llm;
        if llm.max_attempts == 0 || llm.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(AppError::Config(format!(
                "llm.max_attempts must be between 1 and {}, got {}",
                MAX_ATTEMPTS_LIMIT, llm.max_attempts
            )));
        }
        if llm.timeout_seconds == 0 {
            return Err(AppError::Config(
                "llm.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if llm.timeout_seconds > TIMEOUT_LIMIT_SECONDS {
            return Err(AppError::Config(format!(
                "llm.timeout_seconds cannot exceed {} seconds, got {}",
                TIMEOUT_LIMIT_SECONDS, llm.timeout_seconds
            )));
        }
        if llm.backoff_unit_ms > BACKOFF_UNIT_LIMIT_MS {
            return Err(AppError::Config(format!(
                "llm.backoff_unit_ms cannot exceed {}, got {}",
                BACKOFF_UNIT_LIMIT_MS, llm.backoff_unit_ms
            )));
        }

        for kind in [ProviderKind::Anthropic, ProviderKind::OpenAi] {
            let settings = self.providers.get(kind);
            let base_url = settings.base_url(kind);
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(AppError::Config(format!(
                    "providers.{}.base_url must start with http:// or https://, got '{}'",
                    kind, base_url
                )));
            }
            if settings.model(kind).trim().is_empty() {
                return Err(AppError::Config(format!(
                    "providers.{}.model must not be empty",
                    kind
                )));
            }
        }

        let level = self.observability.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(AppError::Config(format!(
                "observability.log_level must be one of {:?}, got '{}'",
                LOG_LEVELS, self.observability.log_level
            )));
        }

        Ok(())
    }

    /// Backends in preference order, with their role
    ///
    /// The secondary is omitted when fallback is disabled.
    pub fn route_order(&self) -> Vec<(ProviderKind, ProviderRole)> {
        let mut order = vec![(self.llm.primary, ProviderRole::Primary)];
        if self.llm.fallback_enabled {
            order.push((self.llm.secondary(), ProviderRole::Secondary));
        }
        order
    }

    /// Settings for building `kind` in `role`, or `None` without a usable credential
    pub fn service_settings(
        &self,
        kind: ProviderKind,
        role: ProviderRole,
    ) -> Option<ServiceSettings> {
        let provider = self.providers.get(kind);
        let api_key = provider.resolve_api_key(kind)?;
        Some(ServiceSettings {
            kind,
            role,
            api_key,
            model: provider.model(kind).to_string(),
            base_url: provider.base_url(kind).to_string(),
            timeout: self.llm.timeout(),
            retry: self.llm.retry_policy(role),
        })
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        // Validate config before returning
        config.validate()?;
        Ok(config)
    }
}
