//! Command-line interface for finrec
//!
//! Provides argument parsing and subcommand handling for the finrec binary.

use crate::error::{AppError, AppResult};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Financial product recommendations with hosted model failover
#[derive(Parser)]
#[command(name = "finrec")]
#[command(version)]
#[command(about = "Financial product recommendations with hosted model failover")]
#[command(
    long_about = "finrec classifies a question about financial products, composes a \
    recommendation from a product catalog, and fails over from the primary model \
    service to the secondary one (and finally to a canned answer) when a backend fails."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Answer a question and print the recommendation as JSON
    Ask {
        /// The question to answer
        query: String,

        /// JSON file holding an array of products
        #[arg(long)]
        catalog: Option<String>,

        /// JSON file holding the user profile
        #[arg(long)]
        profile: Option<String>,

        /// JSON file holding an array of conversation turns
        #[arg(long)]
        history: Option<String>,
    },
    /// Probe the configured model services
    Health,
    /// List the models each configured service offers
    Models,
    /// Run the full pipeline against a built-in demo product
    Selftest,
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Read and deserialize a JSON input file
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> AppResult<T> {
    let path_display = path.as_ref().display().to_string();
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| AppError::InputFile {
        path: path_display.clone(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| AppError::InputFile {
        path: path_display,
        reason: e.to_string(),
    })
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# finrec Configuration
# ====================
#
# Every section and key is optional; the values below are the defaults.

# ─────────────────────────────────────────────────────────────────────────────
# MODEL SERVICES
# ─────────────────────────────────────────────────────────────────────────────

[llm]
# Preferred backend: "anthropic" or "openai". The other one is the secondary.
primary = "anthropic"

# Fail over to the secondary backend when the primary fails
fallback_enabled = true

# Total attempts for the primary backend on overload/timeout errors (1-10).
# The secondary backend is tried exactly once.
max_attempts = 3

# Hard per-attempt timeout in seconds (1-300)
timeout_seconds = 30

# Backoff unit in milliseconds.
# Overload waits 2^n units after attempt n, timeout waits n units.
backoff_unit_ms = 1000

# ─────────────────────────────────────────────────────────────────────────────
# PROVIDERS
# ─────────────────────────────────────────────────────────────────────────────
#
# Credentials are read from the environment variable named by api_key_env
# (a .env file next to the binary is honoured). An inline api_key takes
# precedence. Placeholder values such as "your_openai_api_key_here" count as
# not configured.

[providers.anthropic]
api_key_env = "ANTHROPIC_API_KEY"
model = "claude-3-5-sonnet-20241022"
base_url = "https://api.anthropic.com"

[providers.openai]
api_key_env = "OPENAI_API_KEY"
model = "gpt-4"
base_url = "https://api.openai.com"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
# RUST_LOG overrides this when set.
log_level = "info"
"#
}
