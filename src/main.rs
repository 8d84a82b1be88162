//! ncdknn command-line classifier

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ncdknn::config::{AppConfig, LogFormat};
use ncdknn::dataset::load_samples;
use ncdknn::types::Corpus;
use ncdknn::NcdClassifier;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Number of neighbors that vote
    #[arg(short, long, global = true)]
    k: Option<usize>,

    /// Worker threads; defaults to the available parallelism
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a single text
    Classify {
        #[arg(long)]
        train: Option<PathBuf>,
        #[arg(long)]
        text: String,
        /// Print the prediction with its neighbors as JSON
        #[arg(long)]
        json: bool,
    },
    /// Measure accuracy on a labeled test file
    Evaluate {
        #[arg(long)]
        train: Option<PathBuf>,
        #[arg(long)]
        test: Option<PathBuf>,
        /// Only evaluate the first N test samples
        #[arg(long)]
        limit: Option<usize>,
        /// Print the evaluation report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load().context("failed to load configuration")?;

    if let Some(k) = cli.k {
        config.classifier.k = k;
    }
    if let Some(workers) = cli.workers {
        config.classifier.workers = Some(workers);
    }
    config.validate().context("invalid configuration")?;

    init_tracing(&config)?;

    match cli.command {
        Command::Classify { train, text, json } => {
            let mut classifier = build_classifier(&config, train)?;
            let prediction = classifier
                .predict_detailed(text.as_bytes(), config.classifier.k)
                .context("classification failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            } else {
                println!(
                    "{}",
                    prediction
                        .label
                        .unwrap_or_else(|| prediction.class_index.to_string())
                );
            }
        }
        Command::Evaluate {
            train,
            test,
            limit,
            json,
        } => {
            let test_path = test
                .or_else(|| config.data.test_path.clone())
                .ok_or_else(|| anyhow!("no test file given (--test or data.test_path)"))?;
            let mut test_samples = load_samples(&test_path, &config.data.labels)
                .with_context(|| format!("failed to load test samples from {}", test_path.display()))?;
            if let Some(limit) = limit {
                test_samples.truncate(limit);
            }

            let mut classifier = build_classifier(&config, train)?;
            let evaluation = classifier
                .evaluate(&test_samples, config.classifier.k)
                .context("evaluation failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&evaluation)?);
            } else {
                println!(
                    "accuracy: {:.4} ({}/{})",
                    evaluation.accuracy(),
                    evaluation.correct,
                    evaluation.total
                );
            }
        }
    }

    Ok(())
}

fn build_classifier(config: &AppConfig, train: Option<PathBuf>) -> anyhow::Result<NcdClassifier> {
    let train_path = train
        .or_else(|| config.data.train_path.clone())
        .ok_or_else(|| anyhow!("no training file given (--train or data.train_path)"))?;

    let samples = load_samples(&train_path, &config.data.labels)
        .with_context(|| format!("failed to load training samples from {}", train_path.display()))?;
    let corpus: Corpus = Arc::from(samples);

    NcdClassifier::new(
        corpus,
        config.data.labels.clone(),
        config.classifier_options(),
    )
    .context("failed to start classifier")
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.logging.level.clone()))
        .unwrap_or_else(|_| EnvFilter::new("ncdknn=info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Logs go to stderr so stdout stays machine-readable
    match config.logging.format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
