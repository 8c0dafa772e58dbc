//! Reality Check CLI
//!
//! Usage:
//!   realitycheck analyze "<idea>" [--config realitycheck.yaml] [--json]
//!   realitycheck score --market 80 --execution 60 --behavioral 50 --timing 40 --history 70
//!   realitycheck prompts [--dimension market] [--synthesis]
//!   realitycheck config [--config realitycheck.yaml]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use realitycheck_core::{
    inputs_from_report, score, AggregatedReport, Dimension, RiskReport, ScoreOutcome,
};
use realitycheck_runtime::{
    prompts, AnalysisOutcome, Analyzer, RuntimeConfig, RuntimeError, Synthesizer,
};

mod render;

const MIN_IDEA_CHARS: usize = 10;
const MAX_IDEA_CHARS: usize = 1000;

/// Exit code when the analysis ran but no verdict could be produced.
const EXIT_NO_VERDICT: u8 = 3;

#[derive(Parser)]
#[command(name = "realitycheck")]
#[command(
    author,
    version,
    about = "Stress-test a business idea with five risk agents and a verdict"
)]
struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an idea end to end
    Analyze {
        /// The idea, 10 to 1000 characters
        idea: String,

        /// Path to a YAML runtime configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score risk values offline, without calling any backend
    Score {
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        market: Option<u8>,

        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        execution: Option<u8>,

        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        behavioral: Option<u8>,

        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        timing: Option<u8>,

        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        history: Option<u8>,

        /// Path to a YAML runtime configuration (weights, absent policy)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Print the composed system prompts (dry run)
    Prompts {
        /// Only this dimension
        #[arg(short, long)]
        dimension: Option<Dimension>,

        /// Only the synthesis agent
        #[arg(long, conflicts_with = "dimension")]
        synthesis: bool,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration as YAML
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze { idea, config, json } => analyze(&idea, config.as_deref(), json).await,
        Commands::Score {
            market,
            execution,
            behavioral,
            timing,
            history,
            config,
            json,
        } => {
            let scores = [
                (Dimension::Market, market),
                (Dimension::Execution, execution),
                (Dimension::Behavioral, behavioral),
                (Dimension::Timing, timing),
                (Dimension::Historical, history),
            ];
            score_offline(&scores, config.as_deref(), json)
        }
        Commands::Prompts {
            dimension,
            synthesis,
            config,
        } => print_prompts(dimension, synthesis, config.as_deref()),
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

/// Check the idea the way the web caller does: trimmed, 10 to 1000 characters.
fn validate_idea(idea: &str) -> Result<&str> {
    let idea = idea.trim();
    let chars = idea.chars().count();
    if chars < MIN_IDEA_CHARS {
        bail!("Idea must be at least {} characters long", MIN_IDEA_CHARS);
    }
    if chars > MAX_IDEA_CHARS {
        bail!("Idea too long: {} characters, maximum is {}", chars, MAX_IDEA_CHARS);
    }
    Ok(idea)
}

async fn analyze(idea: &str, config: Option<&Path>, json: bool) -> Result<ExitCode> {
    let idea = validate_idea(idea)?;
    let config = load_config(config)?;
    let analyzer = Analyzer::from_config(config).context("Failed to set up the analyzer")?;

    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    if !json {
        render::header(idea, analyzer.provider_name());
    }

    let start = Instant::now();
    let outcome: AnalysisOutcome = match analyzer.analyze_with_cancellation(idea, &token).await {
        Ok(outcome) => outcome,
        Err(RuntimeError::Cancelled) => {
            tracing::warn!("Analysis cancelled by interrupt");
            bail!("Analysis interrupted")
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        render::outcome(&outcome, start.elapsed());
    }

    if outcome.verdict.is_none() {
        tracing::info!(errors = outcome.analysis.errors.len(), "No verdict produced");
        return Ok(ExitCode::from(EXIT_NO_VERDICT));
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct OfflineScore<'a> {
    scores: Vec<(Dimension, Option<u8>)>,
    absent_dimension: realitycheck_core::AbsentDimensionPolicy,
    outcome: &'a ScoreOutcome,
}

fn score_offline(
    scores: &[(Dimension, Option<u8>)],
    config: Option<&Path>,
    json: bool,
) -> Result<ExitCode> {
    let config = load_config(config)?;

    // Build a report so absent values go through the same policy as a live run.
    let mut report = AggregatedReport::new();
    for (dimension, value) in scores {
        if let Some(risk_score) = value {
            report.set(
                *dimension,
                RiskReport {
                    risk_score: *risk_score,
                    key_findings: vec!["provided on the command line".to_string()],
                    hidden_risks: Vec::new(),
                    confidence: 100,
                },
            );
        }
    }

    let inputs = inputs_from_report(
        &report,
        &config.scoring.weights,
        config.scoring.absent_dimension,
    );
    let outcome = score(&inputs);

    if json {
        let payload = OfflineScore {
            scores: scores.to_vec(),
            absent_dimension: config.scoring.absent_dimension,
            outcome: &outcome,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        render::score(&inputs, &outcome);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_prompts(
    dimension: Option<Dimension>,
    synthesis_only: bool,
    config: Option<&Path>,
) -> Result<ExitCode> {
    let config = load_config(config)?;

    let dimensions: Vec<Dimension> = match (dimension, synthesis_only) {
        (_, true) => Vec::new(),
        (Some(d), false) => vec![d],
        (None, false) => Dimension::ALL.to_vec(),
    };

    for d in dimensions {
        render::prompt(d.label(), &prompts::system_prompt(&prompts::dimension_spec(d)));
    }

    if dimension.is_none() {
        let synthesizer = Synthesizer::new(&config.decision_policy);
        render::prompt("Synthesis", &prompts::system_prompt(synthesizer.spec()));
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_validate_idea_bounds() {
        assert!(validate_idea("too short").is_err());
        assert_eq!(validate_idea("  Uber for dogs  ").unwrap(), "Uber for dogs");
        assert!(validate_idea(&"x".repeat(1001)).is_err());
        assert!(validate_idea(&"x".repeat(1000)).is_ok());
    }

    #[test]
    fn test_parse_score_command() {
        let cli = Cli::try_parse_from([
            "realitycheck",
            "score",
            "--market",
            "80",
            "--timing",
            "40",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Score {
                market: Some(80),
                timing: Some(40),
                execution: None,
                ..
            }
        ));
    }

    #[test]
    fn test_score_rejects_out_of_range() {
        assert!(Cli::try_parse_from(["realitycheck", "score", "--market", "101"]).is_err());
    }

    #[test]
    fn test_parse_dimension_flag() {
        let cli =
            Cli::try_parse_from(["realitycheck", "prompts", "--dimension", "history"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Prompts {
                dimension: Some(Dimension::Historical),
                ..
            }
        ));
    }
}
