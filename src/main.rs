//! Evidentia - Verifiable evidence trails for autonomous research agents
//!
//! Command-line access to the sonar, triangulation, archive verification and
//! distillation components.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use evidentia::{
    archive::{read_archive, verify_archive},
    config::EvidentiaConfig,
    triangulate::{KeywordOverlapScorer, RelevanceScorer, TokenOverlapScorer},
    ContentDistiller, EvidenceAggregator, NoveltyGate, SourceDocument,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "evidentia")]
#[command(author = "A3S Lab Team")]
#[command(version)]
#[command(about = "Verifiable evidence trails for autonomous research agents")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "EVIDENTIA_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long = "json")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure the information gain of new text over existing context
    Sonar {
        /// File holding the accumulated context
        #[arg(long)]
        context: PathBuf,

        /// File holding the newly fetched text
        #[arg(long = "new")]
        new_text: PathBuf,

        /// Saturation threshold (defaults to the configured one)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Cross-check a claim against source files
    Triangulate {
        /// Claim to verify
        #[arg(long)]
        claim: String,

        /// Relevance scorer
        #[arg(long, value_enum, default_value_t = ScorerKind::Keyword)]
        scorer: ScorerKind,

        /// Source text files (each file is one source)
        sources: Vec<PathBuf>,
    },

    /// Re-read an archive and check an anchored payload hash
    Verify {
        /// Archive file path
        #[arg(long)]
        archive: PathBuf,

        /// Payload hash recorded at capture time
        #[arg(long)]
        payload_hash: Option<String>,
    },

    /// Distill an HTML file to plain text
    Distill {
        /// HTML file
        file: PathBuf,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ScorerKind {
    /// Claim words found anywhere in the source
    Keyword,
    /// Claim words found as whole source tokens
    Token,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("evidentia={}", log_level).into());
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // Load configuration
    let config = match &cli.config {
        Some(path) => EvidentiaConfig::from_file(path)?,
        None => EvidentiaConfig::default(),
    };

    match cli.command {
        Commands::Sonar {
            context,
            new_text,
            threshold,
        } => run_sonar(&config, &context, &new_text, threshold)?,
        Commands::Triangulate {
            claim,
            scorer,
            sources,
        } => {
            run_triangulate(&config, &claim, scorer, &sources).await?;
        }
        Commands::Verify {
            archive,
            payload_hash,
        } => run_verify(&archive, payload_hash.as_deref()).await?,
        Commands::Distill { file } => run_distill(&file)?,
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

fn run_sonar(config: &EvidentiaConfig, context: &Path, new_text: &Path, threshold: Option<f64>) -> Result<()> {
    let context = read_text(context)?;
    let new_text = read_text(new_text)?;

    let mut gate = NoveltyGate::new(&config.sonar);
    let result = match threshold {
        Some(t) => gate.analyze_with_threshold(&new_text, &context, t),
        None => gate.analyze(&new_text, &context),
    };
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_triangulate(
    config: &EvidentiaConfig,
    claim: &str,
    scorer: ScorerKind,
    sources: &[PathBuf],
) -> Result<()> {
    let mut documents = Vec::with_capacity(sources.len());
    for path in sources {
        documents.push(SourceDocument::new(read_text(path)?).with_origin(path.display().to_string()));
    }

    let scorer: Arc<dyn RelevanceScorer> = match scorer {
        ScorerKind::Keyword => Arc::new(KeywordOverlapScorer::new()),
        ScorerKind::Token => Arc::new(TokenOverlapScorer::new()),
    };
    let aggregator = EvidenceAggregator::new(scorer, config.triangulation.clone());
    let result = aggregator.verify(claim, &documents).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_verify(archive: &Path, payload_hash: Option<&str>) -> Result<()> {
    match payload_hash {
        Some(hash) => {
            let verification = verify_archive(archive, hash)
                .await
                .with_context(|| format!("Failed to verify {}", archive.display()))?;
            println!("{}", serde_json::to_string_pretty(&verification)?);
            if !verification.payload_matched {
                anyhow::bail!("Payload hash {} not found in {}", hash, archive.display());
            }
        }
        None => {
            let records = read_archive(archive)
                .await
                .with_context(|| format!("Failed to read {}", archive.display()))?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }
    Ok(())
}

fn run_distill(file: &Path) -> Result<()> {
    let html = read_text(file)?;
    let distiller = ContentDistiller::new()?;
    println!("{}", distiller.distill(&html));
    Ok(())
}

fn show_config(config: Option<&EvidentiaConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
