//! Configuration for tablekv
//!
//! Centralized configuration with sensible defaults.

use crate::error::{Result, TableError};

/// Hard limit on the number of operations in one store transaction
pub const MAX_BATCH_SIZE: usize = 100;

/// Configuration for a [`Table`](crate::Table) handle
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Table Configuration
    // -------------------------------------------------------------------------
    /// Name of the table, used for logging
    pub table_name: String,

    // -------------------------------------------------------------------------
    // Mutation Configuration
    // -------------------------------------------------------------------------
    /// Max rows per batch transaction (1..=MAX_BATCH_SIZE)
    pub max_batch_size: usize,

    // -------------------------------------------------------------------------
    // Query Configuration
    // -------------------------------------------------------------------------
    /// Rows requested per query segment; `None` leaves it to the store
    pub query_page_size: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table_name: "rows".to_string(),
            max_batch_size: MAX_BATCH_SIZE,
            query_page_size: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the configuration against the store's limits
    pub fn validate(&self) -> Result<()> {
        if self.table_name.is_empty() {
            return Err(TableError::Config("table name must not be empty".to_string()));
        }
        if self.max_batch_size == 0 || self.max_batch_size > MAX_BATCH_SIZE {
            return Err(TableError::Config(format!(
                "max_batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.max_batch_size
            )));
        }
        if self.query_page_size == Some(0) {
            return Err(TableError::Config("query_page_size must be positive".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the table name
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.config.table_name = name.into();
        self
    }

    /// Set the maximum number of rows per batch transaction
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.config.max_batch_size = size;
        self
    }

    /// Set the number of rows requested per query segment
    pub fn query_page_size(mut self, size: u32) -> Self {
        self.config.query_page_size = Some(size);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
