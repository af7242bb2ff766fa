use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledgerforge_client::HttpLedgerClient;
use ledgerforge_core::{GeneratorConfig, Volume};
use ledgerforge_generate::plugins::{
    CachePlugin, MetricsPlugin, PluginManager, ValidationPlugin,
};
use ledgerforge_generate::{GenerationEngine, GenerationError, StateRegistry};

#[derive(Debug, Error)]
enum CliError {
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "ledgerforge", version, about = "Demo-data generator for a remote ledger API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a full demo hierarchy against a running ledger stack.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Generation volume: small, medium, or large.
    #[arg(long, default_value = "small", value_parser = parse_volume)]
    volume: Volume,
    /// Base URL of the onboarding service.
    #[arg(long, default_value = "http://localhost:3000")]
    onboarding_url: String,
    /// Base URL of the transaction service.
    #[arg(long, default_value = "http://localhost:3001")]
    transaction_url: String,
    /// Upper bound on in-flight remote calls.
    #[arg(long, default_value_t = 10)]
    concurrency: usize,
    /// Verbose logging.
    #[arg(long, default_value_t = false)]
    debug: bool,
    /// Bearer token forwarded to the remote API.
    #[arg(long)]
    auth_token: Option<String>,
    /// Seed for deterministic randomized data.
    #[arg(long)]
    seed: Option<u64>,
    /// Print the final report as JSON instead of a table.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn parse_volume(value: &str) -> Result<Volume, String> {
    match value {
        "small" => Ok(Volume::Small),
        "medium" => Ok(Volume::Medium),
        "large" => Ok(Volume::Large),
        other => Err(format!("unknown volume '{other}' (small|medium|large)")),
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(args: RunArgs) -> Result<(), CliError> {
    let config = GeneratorConfig {
        volume: args.volume,
        onboarding_url: args.onboarding_url,
        transaction_url: args.transaction_url,
        max_concurrency: args.concurrency,
        debug: args.debug,
        auth_token: args.auth_token,
        seed: args.seed,
    };
    config
        .validate()
        .map_err(|err| CliError::InvalidConfig(err.to_string()))?;

    let api = Arc::new(HttpLedgerClient::new(
        config.onboarding_url.clone(),
        config.transaction_url.clone(),
        config.auth_token.clone(),
    ));
    let registry = Arc::new(StateRegistry::new());

    let mut plugins = PluginManager::new();
    plugins.register(Arc::new(ValidationPlugin::new()));
    plugins.register(Arc::new(MetricsPlugin::new()));
    plugins.register_cache(Arc::new(CachePlugin::default()));
    let plugins = Arc::new(plugins);

    let engine = GenerationEngine::new(api, registry, Arc::clone(&plugins), config)?;
    info!(run_id = engine.run_id(), "starting generation");
    let report = engine.run().await;
    plugins.shutdown().await;

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => return Err(CliError::InvalidConfig(err.to_string())),
        }
    } else {
        println!("{}", report.render_table());
    }

    if report.total_errors > 0 {
        info!(
            errors = report.total_errors,
            "run completed with partial failures"
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => {
            init_logging(args.debug);
            if let Err(err) = run(args).await {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_parses_known_presets() {
        assert_eq!(parse_volume("small").ok(), Some(Volume::Small));
        assert_eq!(parse_volume("large").ok(), Some(Volume::Large));
        assert!(parse_volume("huge").is_err());
    }

    #[test]
    fn run_args_defaults() {
        let cli = Cli::parse_from(["ledgerforge", "run"]);
        let Command::Run(args) = cli.command;
        assert_eq!(args.volume, Volume::Small);
        assert_eq!(args.concurrency, 10);
        assert!(args.auth_token.is_none());
    }
}
