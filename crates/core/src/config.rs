//! # Memory Configuration
//!
//! Settings for the stores, the embedder and the aggregator. Loaded from an
//! optional JSON file, then overridden by `PETMIND_*` environment variables.
//!
//! | Variable | Field |
//! |---|---|
//! | `PETMIND_DB_PATH` | `db_path` |
//! | `PETMIND_STRATEGY` | `strategy` |
//! | `PETMIND_FACTS_K` | `facts_k` |
//! | `PETMIND_COLLECTION` | `collection` |
//! | `PETMIND_REQUEST_TIMEOUT_MS` | `request_timeout_ms` |
//! | `PETMIND_EMBEDDING_PROVIDER` | `embedding.provider` |
//! | `PETMIND_EMBEDDING_URL` | `embedding.base_url` |
//! | `PETMIND_EMBEDDING_MODEL` | `embedding.model` |
//! | `PETMIND_EMBEDDING_API_KEY` | `embedding.api_key` |
//! | `PETMIND_EMBEDDING_DIMENSIONS` | `embedding.dimensions` |

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::aggregation::{AggregationStrategy, DEFAULT_FACTS_K};
use crate::memory::{Embedder, HashingEmbedder, HttpEmbedder, MemoryError, DEFAULT_COLLECTION};
use crate::state::DEFAULT_DB_PATH;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which embedder backs the facts source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Offline token hashing
    #[default]
    Hashing,
    /// OpenAI-compatible HTTP API
    Http,
}

/// Embedding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    /// API root, e.g. `http://localhost:11434/v1`
    pub base_url: String,
    pub model: String,
    /// Never written back to disk
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Vector size for the hashing embedder
    pub dimensions: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Hashing,
            base_url: "http://localhost:11434/v1".to_string(),
            model: "nomic-embed-text".to_string(),
            api_key: None,
            dimensions: 256,
            timeout_secs: 10,
        }
    }
}

impl EmbeddingConfig {
    /// Construct the configured embedder
    pub fn build(&self) -> Result<Arc<dyn Embedder>, MemoryError> {
        match self.provider {
            EmbeddingProvider::Hashing => Ok(Arc::new(HashingEmbedder::new(self.dimensions))),
            EmbeddingProvider::Http => {
                let embedder = HttpEmbedder::new(
                    &self.base_url,
                    self.model.clone(),
                    self.api_key.clone(),
                    Duration::from_secs(self.timeout_secs),
                )?;
                tracing::info!("Embedding via {} ({})", embedder.endpoint(), self.model);
                Ok(Arc::new(embedder))
            }
        }
    }
}

/// Top-level memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// SQLite database path
    pub db_path: String,
    /// Aggregation strategy
    pub strategy: AggregationStrategy,
    /// Fact documents per query
    pub facts_k: i64,
    /// Vector collection holding the facts
    pub collection: String,
    /// Abandon an aggregation after this long
    pub request_timeout_ms: Option<u64>,
    pub embedding: EmbeddingConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            strategy: AggregationStrategy::Parallel,
            facts_k: DEFAULT_FACTS_K,
            collection: DEFAULT_COLLECTION.to_string(),
            request_timeout_ms: None,
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl MemoryConfig {
    /// Read a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load `path` if given and present, otherwise defaults; then apply env overrides
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::load(path)?,
            _ => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `PETMIND_*` environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override fields from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("PETMIND_DB_PATH") {
            self.db_path = path;
        }
        if let Some(strategy) = lookup("PETMIND_STRATEGY") {
            self.strategy = strategy.parse().map_err(ConfigError::Invalid)?;
        }
        if let Some(k) = lookup("PETMIND_FACTS_K") {
            self.facts_k = parse_number("PETMIND_FACTS_K", &k)?;
        }
        if let Some(collection) = lookup("PETMIND_COLLECTION") {
            self.collection = collection;
        }
        if let Some(ms) = lookup("PETMIND_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = Some(parse_number("PETMIND_REQUEST_TIMEOUT_MS", &ms)?);
        }
        if let Some(provider) = lookup("PETMIND_EMBEDDING_PROVIDER") {
            self.embedding.provider = match provider.trim().to_ascii_lowercase().as_str() {
                "hashing" => EmbeddingProvider::Hashing,
                "http" => EmbeddingProvider::Http,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "unknown embedding provider '{}'",
                        other
                    )))
                }
            };
        }
        if let Some(url) = lookup("PETMIND_EMBEDDING_URL") {
            self.embedding.base_url = url;
        }
        if let Some(model) = lookup("PETMIND_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(key) = lookup("PETMIND_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(dimensions) = lookup("PETMIND_EMBEDDING_DIMENSIONS") {
            self.embedding.dimensions = parse_number("PETMIND_EMBEDDING_DIMENSIONS", &dimensions)?;
        }
        Ok(())
    }

    /// Reject settings the aggregator cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.facts_k <= 0 {
            return Err(ConfigError::Invalid(format!(
                "facts_k must be positive, got {}",
                self.facts_k
            )));
        }
        if self.collection.trim().is_empty() {
            return Err(ConfigError::Invalid("collection must not be empty".into()));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be positive".into(),
            ));
        }
        if self.embedding.provider == EmbeddingProvider::Hashing && self.embedding.dimensions == 0
        {
            return Err(ConfigError::Invalid(
                "embedding.dimensions must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} is not a number: '{}'", key, raw)))
}
