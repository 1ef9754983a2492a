//! # Store Configuration
//!
//! Tunables for the tag store. Defaults match the canonical on-disk
//! geometry; tests shrink `first_table_records` to force table growth
//! without thousands of inserts.

use crate::domain::layout::FIRST_TABLE_RECORDS;

/// Hard ceiling on the store file size (default: 128 MiB, 13 tables).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 128 * 1024 * 1024;

/// Configuration for the tag store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Record count of the first hash table (default: 1023).
    ///
    /// Later tables derive from it: the second holds
    /// `(first_table_records + 1) * 2` records, each one after that doubles
    /// the one before.
    pub first_table_records: u64,

    /// Maximum total file size in bytes (default: 128 MiB).
    ///
    /// Growing past it fails the store attempt with
    /// [`StoreError::Overflow`](crate::domain::errors::StoreError::Overflow);
    /// nothing is written once the ceiling is hit.
    pub max_file_size: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            first_table_records: FIRST_TABLE_RECORDS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first table's record count. A table needs at least one record.
    pub fn with_first_table_records(mut self, nrecords: u64) -> Self {
        self.first_table_records = nrecords.max(1);
        self
    }

    /// Set the maximum total file size in bytes.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();

        assert_eq!(config.first_table_records, 1023);
        assert_eq!(config.max_file_size, 128 * 1024 * 1024);
    }

    #[test]
    fn test_builders() {
        let config = StoreConfig::new()
            .with_first_table_records(4)
            .with_max_file_size(1024);

        assert_eq!(config.first_table_records, 4);
        assert_eq!(config.max_file_size, 1024);
    }

    #[test]
    fn test_first_table_records_floor() {
        let config = StoreConfig::new().with_first_table_records(0);

        assert_eq!(config.first_table_records, 1);
    }
}
