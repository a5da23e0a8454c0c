//! Backend error taxonomy
//!
//! Every failure of a hosted model call is a `ProviderError`. The retry loop
//! only cares about [`RetryClass`]: overload and timeout are transient and
//! retried locally, everything else escalates on the first occurrence.

use crate::providers::ProviderKind;
use std::time::Duration;

/// How the retry loop treats an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Backend reported it is overloaded; exponential backoff
    Overload,
    /// Call did not finish in time; linear backoff
    Timeout,
    /// Not retried
    Fatal,
}

/// Errors returned by a [`ModelService`](crate::providers::ModelService)
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Backend rejected the call because it is at capacity (HTTP 529 / `overloaded_error`)
    #[error("{provider} is overloaded: {message}")]
    Overloaded {
        provider: ProviderKind,
        message: String,
    },

    /// Call exceeded the hard wall-clock timeout
    #[error("{provider} request timed out after {timeout_ms}ms")]
    Timeout {
        provider: ProviderKind,
        timeout_ms: u64,
    },

    /// Backend or gateway answered 408/504 before the local timeout fired
    #[error("{provider} reported a timeout (HTTP {status}): {body}")]
    GatewayTimeout {
        provider: ProviderKind,
        status: u16,
        body: String,
    },

    /// Non-success HTTP status other than overload
    #[error("{provider} returned HTTP {status}: {body}")]
    Http {
        provider: ProviderKind,
        status: u16,
        body: String,
    },

    /// Connection-level failure before a response arrived
    #[error("{provider} transport error: {message}")]
    Transport {
        provider: ProviderKind,
        message: String,
    },

    /// Response body did not match the expected wire schema
    #[error("{provider} response could not be decoded: {message}")]
    Decode {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: ProviderKind },

    /// Opaque failure reported by a backend client
    #[error("{provider} error: {message}")]
    Backend {
        provider: ProviderKind,
        message: String,
    },
}

impl ProviderError {
    /// Provider that produced this error
    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::Overloaded { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::GatewayTimeout { provider, .. }
            | Self::Http { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Decode { provider, .. }
            | Self::EmptyResponse { provider }
            | Self::Backend { provider, .. } => *provider,
        }
    }

    /// Map a non-success HTTP response
    ///
    /// 529 and `overloaded_error` bodies are overload; 408/504 are timeouts.
    pub fn from_status(provider: ProviderKind, status: u16, body: String) -> Self {
        if status == 529 || body.contains("overloaded_error") {
            Self::Overloaded {
                provider,
                message: body,
            }
        } else if status == 408 || status == 504 {
            Self::GatewayTimeout {
                provider,
                status,
                body,
            }
        } else {
            Self::Http {
                provider,
                status,
                body,
            }
        }
    }

    /// Map a reqwest failure that happened before a status line arrived
    pub fn from_transport(provider: ProviderKind, err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider,
                timeout_ms: timeout.as_millis() as u64,
            }
        } else if err.is_decode() {
            Self::Decode {
                provider,
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                provider,
                message: err.to_string(),
            }
        }
    }

    /// Classify for the retry loop
    ///
    /// Typed variants map directly. Untyped variants fall back to the message:
    /// "overload" anywhere wins over "timeout", matched case-insensitively.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Overloaded { .. } => RetryClass::Overload,
            Self::Timeout { .. } | Self::GatewayTimeout { .. } => RetryClass::Timeout,
            Self::Decode { .. } | Self::EmptyResponse { .. } => RetryClass::Fatal,
            Self::Http { body: text, .. }
            | Self::Transport { message: text, .. }
            | Self::Backend { message: text, .. } => classify_message(text),
        }
    }
}

fn classify_message(message: &str) -> RetryClass {
    let lower = message.to_lowercase();
    if lower.contains("overload") {
        RetryClass::Overload
    } else if lower.contains("timeout") || lower.contains("timed out") {
        RetryClass::Timeout
    } else {
        RetryClass::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(message: &str) -> ProviderError {
        ProviderError::Backend {
            provider: ProviderKind::Anthropic,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_typed_variants_classify_directly() {
        let overloaded = ProviderError::Overloaded {
            provider: ProviderKind::Anthropic,
            message: "busy".to_string(),
        };
        assert_eq!(overloaded.retry_class(), RetryClass::Overload);

        let timeout = ProviderError::Timeout {
            provider: ProviderKind::Anthropic,
            timeout_ms: 30_000,
        };
        assert_eq!(timeout.retry_class(), RetryClass::Timeout);

        let empty = ProviderError::EmptyResponse {
            provider: ProviderKind::OpenAi,
        };
        assert_eq!(empty.retry_class(), RetryClass::Fatal);
    }

    #[test]
    fn test_message_overload_is_case_insensitive() {
        assert_eq!(backend("Service OVERLOADED").retry_class(), RetryClass::Overload);
        assert_eq!(backend("overload detected").retry_class(), RetryClass::Overload);
    }

    #[test]
    fn test_message_timeout() {
        assert_eq!(backend("Request Timeout").retry_class(), RetryClass::Timeout);
        assert_eq!(backend("operation timed out").retry_class(), RetryClass::Timeout);
    }

    #[test]
    fn test_overload_wins_over_timeout() {
        assert_eq!(
            backend("overloaded, timeout imminent").retry_class(),
            RetryClass::Overload
        );
    }

    #[test]
    fn test_other_messages_are_fatal() {
        assert_eq!(backend("invalid x-api-key").retry_class(), RetryClass::Fatal);

        let http = ProviderError::Http {
            provider: ProviderKind::OpenAi,
            status: 401,
            body: "Unauthorized".to_string(),
        };
        assert_eq!(http.retry_class(), RetryClass::Fatal);
    }

    #[test]
    fn test_from_status_maps_overload_and_timeout() {
        let err = ProviderError::from_status(ProviderKind::Anthropic, 529, "busy".to_string());
        assert!(matches!(err, ProviderError::Overloaded { .. }));

        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = ProviderError::from_status(ProviderKind::Anthropic, 500, body.to_string());
        assert_eq!(err.retry_class(), RetryClass::Overload);

        let err = ProviderError::from_status(ProviderKind::OpenAi, 504, String::new());
        assert_eq!(err.retry_class(), RetryClass::Timeout);

        let err = ProviderError::from_status(ProviderKind::Anthropic, 408, String::new());
        assert!(matches!(err, ProviderError::GatewayTimeout { status: 408, .. }));

        let err = ProviderError::from_status(ProviderKind::OpenAi, 400, "bad request".to_string());
        assert!(matches!(err, ProviderError::Http { status: 400, .. }));
    }

    #[test]
    fn test_gateway_timeout_keeps_status_and_body() {
        let err = ProviderError::from_status(
            ProviderKind::OpenAi,
            504,
            "upstream request timeout".to_string(),
        );
        assert_eq!(
            err.to_string(),
            "openai reported a timeout (HTTP 504): upstream request timeout"
        );
        assert!(!err.to_string().contains("0ms"));
        assert_eq!(err.provider(), ProviderKind::OpenAi);
    }

    #[test]
    fn test_display_names_provider() {
        let err = backend("boom");
        assert_eq!(err.to_string(), "anthropic error: boom");
        assert_eq!(err.provider(), ProviderKind::Anthropic);
    }
}
