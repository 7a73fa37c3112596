use std::path::Path;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::common::constants::{
    DEFAULT_MAX_SKIP_LEVELS, DEFAULT_RAM_BUDGET_BYTES, DEFAULT_SKIP_INTERVAL,
    DEFAULT_TERM_INDEX_INTERVAL,
};
use crate::common::errors::TextIndexError;
use crate::common::file_operations::{atomic_save_json, read_json};
use crate::core::codec::PostingsFormat;

/// 并发写入索引的线程数上限（不建议超过 8）
pub const MAX_NUM_THREADS: usize = 8;

/// Smallest RAM budget accepted for buffered postings.
pub const MIN_RAM_BUDGET_BYTES: usize = 1 << 20;

/// Largest RAM budget (2 GiB). Pool addresses of a shard are 32 bits.
pub const MAX_RAM_BUDGET_BYTES: usize = 2048 << 20;

fn default_num_threads() -> usize {
    num_cpus::get().clamp(1, MAX_NUM_THREADS)
}

/// Settings of an [`IndexWriter`](crate::indexer::IndexWriter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct IndexWriterConfig {
    /// Documents between two level-0 skip entries.
    #[builder(default = DEFAULT_SKIP_INTERVAL)]
    pub skip_interval: u32,

    #[builder(default = DEFAULT_MAX_SKIP_LEVELS)]
    pub max_skip_levels: u32,

    /// Terms between two term dictionary index entries.
    #[builder(default = DEFAULT_TERM_INDEX_INTERVAL)]
    pub term_index_interval: u32,

    /// Indexing worker threads, each one owning its own shard.
    #[builder(default = default_num_threads())]
    pub num_threads: usize,

    /// Pool bytes in use after which buffered documents are flushed.
    #[builder(default = DEFAULT_RAM_BUDGET_BYTES)]
    pub ram_budget_bytes: usize,
}

impl Default for IndexWriterConfig {
    fn default() -> Self {
        IndexWriterConfig::builder().build()
    }
}

impl IndexWriterConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.skip_interval < 2 {
            return Err(TextIndexError::InvalidArgument(format!(
                "skip_interval must be at least 2, got {}",
                self.skip_interval
            )));
        }
        if self.max_skip_levels == 0 || self.max_skip_levels > 32 {
            return Err(TextIndexError::InvalidArgument(format!(
                "max_skip_levels must be in [1, 32], got {}",
                self.max_skip_levels
            )));
        }
        if self.term_index_interval == 0 {
            return Err(TextIndexError::InvalidArgument(
                "term_index_interval must be positive".to_string(),
            ));
        }
        if self.num_threads == 0 || self.num_threads > MAX_NUM_THREADS {
            return Err(TextIndexError::InvalidArgument(format!(
                "num_threads must be in [1, {}], got {}",
                MAX_NUM_THREADS, self.num_threads
            )));
        }
        if !(MIN_RAM_BUDGET_BYTES..=MAX_RAM_BUDGET_BYTES).contains(&self.ram_budget_bytes) {
            return Err(TextIndexError::InvalidArgument(format!(
                "ram_budget_bytes must be in [{}, {}], got {}",
                MIN_RAM_BUDGET_BYTES, MAX_RAM_BUDGET_BYTES, self.ram_budget_bytes
            )));
        }
        Ok(())
    }

    pub fn postings_format(&self) -> PostingsFormat {
        PostingsFormat {
            skip_interval: self.skip_interval,
            max_skip_levels: self.max_skip_levels,
            term_index_interval: self.term_index_interval,
        }
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        self.validate()?;
        Ok(atomic_save_json(path, self)?)
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let config: IndexWriterConfig = read_json(path)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = IndexWriterConfig::default();
        assert_eq!(config.skip_interval, 16);
        assert_eq!(config.max_skip_levels, 10);
        assert_eq!(config.term_index_interval, 128);
        assert!(config.num_threads >= 1 && config.num_threads <= MAX_NUM_THREADS);
        assert_eq!(config.ram_budget_bytes, 16 * 1024 * 1024);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        for config in [
            IndexWriterConfig::builder().skip_interval(1).build(),
            IndexWriterConfig::builder().max_skip_levels(0).build(),
            IndexWriterConfig::builder().term_index_interval(0).build(),
            IndexWriterConfig::builder().num_threads(0).build(),
            IndexWriterConfig::builder().num_threads(MAX_NUM_THREADS + 1).build(),
            IndexWriterConfig::builder().ram_budget_bytes(1024).build(),
            IndexWriterConfig::builder().ram_budget_bytes(MAX_RAM_BUDGET_BYTES + 1).build(),
        ] {
            assert!(matches!(config.validate(), Err(TextIndexError::InvalidArgument(_))));
        }
        IndexWriterConfig::builder().ram_budget_bytes(MAX_RAM_BUDGET_BYTES).build().validate().unwrap();
    }

    #[test]
    fn test_save_load_and_partial_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("writer_config.json");
        let config = IndexWriterConfig::builder().skip_interval(4).num_threads(2).build();
        config.save(&path).unwrap();
        assert_eq!(IndexWriterConfig::load(&path).unwrap(), config);

        // missing keys fall back to defaults
        std::fs::write(&path, r#"{"term_index_interval": 32}"#).unwrap();
        let loaded = IndexWriterConfig::load(&path).unwrap();
        assert_eq!(loaded.term_index_interval, 32);
        assert_eq!(loaded.skip_interval, DEFAULT_SKIP_INTERVAL);

        std::fs::write(&path, r#"{"skip_interval": 0}"#).unwrap();
        assert!(IndexWriterConfig::load(&path).is_err());
    }
}
