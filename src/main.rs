//! finrec command-line entry point
//!
//! Loads configuration, initializes the orchestration manager and runs one
//! subcommand. Results are printed to stdout as JSON; logs go to stderr.

use clap::Parser;
use finrec::{
    cli::{self, Cli, Command},
    config::Config,
    domain::{ConversationTurn, FinancialProduct, UserProfile},
    metrics::Metrics,
    orchestrator::OrchestrationManager,
    providers::HttpProviderFactory,
    telemetry,
};
use serde::Serialize;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let command = match cli.command {
        Some(Command::Config { output }) => {
            return write_template(output.as_deref());
        }
        Some(command) => command,
        None => Command::Health,
    };

    // Credentials may live in a local .env file
    let _ = dotenvy::dotenv();

    let config = Config::load_or_default(&cli.config)?;
    telemetry::init(&config.observability.log_level);

    tracing::info!(
        config = %cli.config,
        primary = %config.llm.primary,
        fallback_enabled = config.llm.fallback_enabled,
        "Starting finrec"
    );

    let metrics = Metrics::new()?;
    let manager = OrchestrationManager::new(config, Arc::new(HttpProviderFactory), metrics);
    if !manager.initialize().await? {
        tracing::warn!("No healthy model service, answers will be canned responses");
    }

    match command {
        Command::Ask {
            query,
            catalog,
            profile,
            history,
        } => {
            let catalog: Vec<FinancialProduct> = match catalog {
                Some(path) => cli::load_json(path)?,
                None => Vec::new(),
            };
            let profile: Option<UserProfile> = profile.map(cli::load_json).transpose()?;
            let history: Vec<ConversationTurn> = match history {
                Some(path) => cli::load_json(path)?,
                None => Vec::new(),
            };

            let result = manager
                .process_query(&query, &catalog, profile.as_ref(), &history)
                .await?;
            print_json(&result)?;
        }
        Command::Health => print_json(&manager.health_check().await)?,
        Command::Models => print_json(&manager.list_available_models().await)?,
        Command::Selftest => print_json(&manager.self_test().await?)?,
        Command::Config { .. } => {}
    }

    if let Ok(text) = manager.metrics().gather_text() {
        tracing::debug!(metrics = %text, "Final metrics");
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_template(output: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let template = cli::generate_config_template();
    match output {
        Some(path) => {
            std::fs::write(path, template)?;
            eprintln!("Configuration template written to {}", path);
        }
        None => print!("{}", template),
    }
    Ok(())
}
