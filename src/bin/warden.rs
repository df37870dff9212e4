//! Warden CLI
//!
//! Loads policy documents from a JSON file and decides a single request.
//! Exit status: 0 granted, 1 forbidden, 2 evaluation or load failure.

use anyhow::{bail, Context as _};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use warden::iam::{load_policies, ConditionRegistry, ContextValue, MemoryRepository};
use warden::{AuthzError, DecisionEngine, EngineConfig, Request};

#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(about = "Decide an access request against a set of policies")]
struct Args {
    /// JSON file with a policy document or an array of them
    #[arg(short = 'p', long)]
    policies: PathBuf,

    /// TOML engine configuration
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Requesting subject (several identities joined by the configured separator)
    #[arg(short = 's', long)]
    subject: String,

    /// Requested action
    #[arg(short = 'a', long)]
    action: String,

    /// Target resource
    #[arg(short = 'r', long)]
    resource: String,

    /// Context attribute as key=value (repeatable); numbers and booleans are typed
    #[arg(long = "context", value_name = "KEY=VALUE")]
    context: Vec<String>,
}

/// Parse `key=value`, typing the value as bool, number or string
fn parse_context(raw: &str) -> anyhow::Result<(String, ContextValue)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("Invalid context '{}': expected KEY=VALUE", raw);
    };
    if key.is_empty() {
        bail!("Invalid context '{}': empty key", raw);
    }

    let value = if let Ok(b) = value.parse::<bool>() {
        ContextValue::Bool(b)
    } else if let Some(n) = value.parse::<f64>().ok().filter(|n| n.is_finite()) {
        ContextValue::Number(n)
    } else {
        ContextValue::String(value.to_string())
    };

    Ok((key.to_string(), value))
}

fn build_engine(args: &Args) -> anyhow::Result<DecisionEngine<MemoryRepository>> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let json = std::fs::read_to_string(&args.policies)
        .with_context(|| format!("Failed to read policies {}", args.policies.display()))?;

    // Conditions are application-specific; none are registered here
    let registry = ConditionRegistry::new();
    let policies = load_policies(&json, &registry, config.delimiters)
        .with_context(|| format!("Invalid policies in {}", args.policies.display()))?;
    info!("Loaded {} policies from {}", policies.len(), args.policies.display());

    Ok(DecisionEngine::with_config(
        MemoryRepository::from_policies(policies),
        &config,
    ))
}

fn build_request(args: &Args) -> anyhow::Result<Request> {
    let mut request = Request::new(&args.subject, &args.action, &args.resource);
    for raw in &args.context {
        let (key, value) = parse_context(raw)?;
        request = request.with_context(key, value);
    }
    Ok(request)
}

/// `RUST_LOG` directives on top of an INFO baseline
fn env_filter() -> EnvFilter {
    EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    debug!("Arguments: {:?}", args);

    let outcome = build_request(&args).and_then(|request| {
        let engine = build_engine(&args)?;
        Ok(engine.is_allowed(&request))
    });

    match outcome {
        Ok(Ok(())) => {
            println!("granted");
            ExitCode::SUCCESS
        }
        Ok(Err(AuthzError::Forbidden)) => {
            println!("forbidden");
            ExitCode::from(1)
        }
        Ok(Err(AuthzError::Evaluation(err))) => {
            eprintln!("Error: {}", err);
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_context() {
        assert_eq!(
            parse_context("owner=users:alice").unwrap(),
            ("owner".to_string(), ContextValue::from("users:alice"))
        );
        assert_eq!(
            parse_context("level=3").unwrap(),
            ("level".to_string(), ContextValue::Number(3.0))
        );
        assert_eq!(
            parse_context("mfa=true").unwrap(),
            ("mfa".to_string(), ContextValue::Bool(true))
        );
        assert_eq!(
            parse_context("note=a=b").unwrap(),
            ("note".to_string(), ContextValue::from("a=b"))
        );
        // Non-finite spellings stay strings
        for raw in ["note=nan", "note=inf", "note=-infinity"] {
            let (_, value) = parse_context(raw).unwrap();
            assert_eq!(value, ContextValue::from(&raw[5..]), "{}", raw);
        }
        assert!(parse_context("novalue").is_err());
        assert!(parse_context("=x").is_err());
    }

    #[test]
    fn test_env_filter_defaults_to_info() {
        use tracing::level_filters::LevelFilter;

        let level = env_filter().max_level_hint();
        assert!(level.map_or(false, |level| level >= LevelFilter::INFO), "{:?}", level);
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from([
            "warden",
            "--policies",
            "policies.json",
            "-s",
            "users:alice",
            "-a",
            "read",
            "-r",
            "articles:1",
            "--context",
            "owner=users:alice",
        ])
        .unwrap();

        let request = build_request(&args).unwrap();
        assert_eq!(request.subject, "users:alice");
        assert_eq!(request.context.len(), 1);
    }
}
