//! Store configuration types.

use std::str::FromStr;

use serde::Deserialize;

use crate::loader::{QueryLoader, DEFAULT_CHUNK_SIZE};

/// Errors raised while parsing configuration or wiring the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown persistence strategy: {0}")]
    UnknownStrategy(String),

    #[error("unknown query loader: {0}")]
    UnknownLoader(String),

    #[error("stream layout single_indexed is only available on mysql")]
    IndexedRequiresMysql,
}

/// Which physical layout streams use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceStrategy {
    #[default]
    Single,
    PerAggregate,
    SingleIndexed,
}

impl FromStr for PersistenceStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "single" => Ok(Self::Single),
            "per_aggregate" => Ok(Self::PerAggregate),
            "single_indexed" => Ok(Self::SingleIndexed),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Query loader selection. String forms: `cursor`, `lazy`,
/// `lazy:<chunk size>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum QueryLoaderConfig {
    #[default]
    Cursor,
    Lazy,
    LazyChunk(u64),
}

impl QueryLoaderConfig {
    pub fn to_loader(self) -> QueryLoader {
        match self {
            QueryLoaderConfig::Cursor => QueryLoader::Cursor,
            QueryLoaderConfig::Lazy => QueryLoader::chunked(DEFAULT_CHUNK_SIZE),
            QueryLoaderConfig::LazyChunk(chunk_size) => QueryLoader::chunked(chunk_size),
        }
    }
}

impl FromStr for QueryLoaderConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        if s == "cursor" {
            return Ok(Self::Cursor);
        }
        if s == "lazy" {
            return Ok(Self::Lazy);
        }
        if let Some(chunk) = s.strip_prefix("lazy:") {
            let chunk_size = chunk
                .parse::<u64>()
                .map_err(|_| ConfigError::UnknownLoader(s.to_string()))?;
            if chunk_size == 0 {
                return Err(ConfigError::UnknownLoader(s.to_string()));
            }
            return Ok(Self::LazyChunk(chunk_size));
        }

        Err(ConfigError::UnknownLoader(s.to_string()))
    }
}

impl TryFrom<String> for QueryLoaderConfig {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, ConfigError> {
        s.parse()
    }
}

/// Store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Physical layout strategy.
    pub persistence_strategy: PersistenceStrategy,
    /// Read-path loader strategy.
    pub query_loader: QueryLoaderConfig,
    /// True wires the driver's default lock; false disables locking.
    pub write_lock: bool,
    /// Whether the store participates in caller-managed transactions.
    pub is_transactional: bool,
    /// Separator for category derivation from stream names.
    pub category_separator: char,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            persistence_strategy: PersistenceStrategy::default(),
            query_loader: QueryLoaderConfig::default(),
            write_lock: true,
            is_transactional: false,
            category_separator: '-',
        }
    }
}
