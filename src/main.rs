use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use policyflow_lib::config::{self, ExtractorConfig};
use policyflow_lib::pipeline::extract::PolicyExtractor;
use policyflow_lib::pipeline::preprocess::PolicyPreprocessor;
use policyflow_lib::pipeline::registry::PatternRegistry;

#[derive(Parser)]
#[command(name = "policyflow")]
#[command(about = "Deterministic policy preprocessing with a generative fallback", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run only the deterministic preprocessor and print its output
    Preprocess {
        /// Plain-text policy document
        file: PathBuf,

        /// Registry JSON file (defaults to the embedded registry)
        #[arg(long)]
        registry: Option<PathBuf>,
    },

    /// Run the full extraction with coverage gate and fallback
    Extract {
        /// Plain-text policy document
        file: PathBuf,

        /// Registry JSON file (defaults to POLICYFLOW_REGISTRY, then the embedded registry)
        #[arg(long)]
        registry: Option<PathBuf>,

        /// Source label recorded in the result (defaults to the file name)
        #[arg(long)]
        source: Option<String>,

        /// Upper bound on the generator call
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Matched patterns required to accept the deterministic output (at least 1)
        #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        min_coverage: Option<usize>,

        /// Exit with an error instead of emitting a degraded result
        #[arg(long)]
        strict: bool,
    },
}

fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy document {}", path.display()))
}

fn load_registry(path: Option<&Path>) -> Result<PatternRegistry> {
    let registry = match path {
        Some(path) => PatternRegistry::load(path)
            .with_context(|| format!("Failed to load registry {}", path.display()))?,
        None => PatternRegistry::embedded().context("Embedded registry is invalid")?,
    };
    Ok(registry)
}

fn run_preprocess(file: &Path, registry: Option<&Path>) -> Result<()> {
    let text = read_document(file)?;
    let preprocessor = PolicyPreprocessor::new(Arc::new(load_registry(registry)?))?;
    let output = preprocessor.preprocess(&text);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_extract(file: &Path, source: Option<String>, config: ExtractorConfig) -> Result<()> {
    let text = read_document(file)?;
    let source = source.unwrap_or_else(|| {
        file.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string())
    });

    if let Some(path) = &config.registry_path {
        // Fail loudly on a bad registry file here; the library would silently fall back.
        load_registry(Some(path))?;
    }

    let timeout = Duration::from_secs(config.timeout_secs);
    let extractor = PolicyExtractor::from_config(&config);
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(extractor.extract_with_timeout(&text, &source, timeout))?;

    tracing::info!(method = %result.method, source = %result.source_document, "Extraction finished");
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let cli = Cli::parse();
    match cli.command {
        Commands::Preprocess { file, registry } => run_preprocess(&file, registry.as_deref()),
        Commands::Extract {
            file,
            registry,
            source,
            timeout_secs,
            min_coverage,
            strict,
        } => {
            let mut config = ExtractorConfig::from_env();
            if registry.is_some() {
                config.registry_path = registry;
            }
            if let Some(secs) = timeout_secs {
                config.timeout_secs = secs;
            }
            if let Some(min) = min_coverage {
                config.min_coverage = min;
            }
            config.surface_fallback_errors = strict;
            run_extract(&file, source, config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_min_coverage_rejected() {
        assert!(Cli::try_parse_from(["policyflow", "extract", "p.txt", "--min-coverage", "0"]).is_err());
    }

    #[test]
    fn extract_flags_parse() {
        let cli = Cli::try_parse_from([
            "policyflow", "extract", "p.txt", "--min-coverage", "3", "--strict",
        ])
        .unwrap();
        match cli.command {
            Commands::Extract {
                min_coverage,
                strict,
                ..
            } => {
                assert_eq!(min_coverage, Some(3));
                assert!(strict);
            }
            Commands::Preprocess { .. } => panic!("expected extract"),
        }
    }
}
