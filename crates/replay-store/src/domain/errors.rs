//! Error taxonomy for store operations.
//!
//! `Replay` is an expected outcome, not a failure; callers must be able to
//! tell it apart from I/O trouble without string matching. Nothing here is
//! recovered inside the engine; every variant unwinds to the caller with
//! the file lock already scheduled for release.

use thiserror::Error;

/// Outcomes of a store attempt other than plain success.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The tag is already recorded and has not yet expired.
    ///
    /// The caller should reject the incoming request as a replay.
    #[error("tag already seen within the skew window")]
    Replay,

    /// Adding another table would exceed the configured maximum file size.
    #[error("store file would grow to {needed} bytes, limit {max}")]
    Overflow { needed: u64, max: u64 },

    /// Read/write/seek/lock failure at the OS boundary.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The random source could not produce seed bytes.
    #[error("seed generation failed: {0}")]
    SeedGeneration(#[from] rand::Error),
}

impl StoreError {
    /// Whether this outcome is the replay signal rather than a failure.
    pub fn is_replay(&self) -> bool {
        matches!(self, StoreError::Replay)
    }
}
