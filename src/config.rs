use std::env;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::classifier::ClassifierOptions;
use crate::types::LabelSet;

const DEFAULT_K: usize = 3;
const DEFAULT_PROGRESS_INTERVAL: usize = 100;
/// Class labels are encoded as one digit, 1-based
const MAX_LABELS: usize = 9;

/// Top-level application configuration loaded from file + environment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub classifier: ClassifierSection,
    pub data: DataSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from disk and environment.
    pub fn load() -> Result<Self> {
        let config_path = env::var("NCDKNN_CONFIG").unwrap_or_else(|_| "ncdknn.toml".to_string());

        let mut builder = config::Config::builder();

        if Path::new(&config_path).exists() {
            builder = builder.add_source(config::File::from(PathBuf::from(&config_path)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("NCDKNN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build()?;
        let mut config: Self = settings.try_deserialize()?;

        if config.logging.level.trim().is_empty() {
            config.logging.level = "info".to_string();
        }

        Ok(config)
    }

    /// Reject values the classifier cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.classifier.k == 0 {
            bail!("classifier.k must be at least 1");
        }
        if self.classifier.workers == Some(0) {
            bail!("classifier.workers must be at least 1 when set");
        }
        if self.data.labels.is_empty() {
            bail!("data.labels must contain at least one label");
        }
        if self.data.labels.len() > MAX_LABELS {
            bail!(
                "data.labels has {} entries; single-digit class encoding allows at most {}",
                self.data.labels.len(),
                MAX_LABELS
            );
        }
        Ok(())
    }

    pub fn classifier_options(&self) -> ClassifierOptions {
        ClassifierOptions {
            workers: self.classifier.workers.and_then(NonZeroUsize::new),
            progress_interval: self.classifier.progress_interval,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    pub k: usize,
    pub workers: Option<usize>,
    pub progress_interval: usize,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            workers: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DataSection {
    pub train_path: Option<PathBuf>,
    pub test_path: Option<PathBuf>,
    pub labels: LabelSet,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Text,
}
