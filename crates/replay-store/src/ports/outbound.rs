//! # Outbound Ports (Driven Ports)
//!
//! Host-environment facilities the engine requires: whole-file locking,
//! seed randomness, and (for callers that want one) a clock. Default
//! adapters live next to the traits; the flock adapter is in
//! `adapters/lock.rs`.

use std::fs::File;
use std::io;

use rand::RngCore;

use crate::domain::hashing::Seed;

/// Whole-file exclusive locking.
///
/// `lock_exclusive` blocks until the lock is granted; no timeout is imposed
/// here. A caller that needs an upper bound layers it externally and can
/// rely on the engine releasing the lock on every exit path.
pub trait FileLocking: Send + Sync {
    fn lock_exclusive(&self, file: &File) -> io::Result<()>;
    fn unlock(&self, file: &File) -> io::Result<()>;
}

/// Source of the 16-byte hash seed persisted at the head of a new file.
pub trait SeedSource: Send + Sync {
    fn fill_seed(&self, seed: &mut Seed) -> Result<(), rand::Error>;
}

/// Seed source backed by the OS CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSeedSource;

impl SeedSource for OsSeedSource {
    fn fill_seed(&self, seed: &mut Seed) -> Result<(), rand::Error> {
        rand::rngs::OsRng.try_fill_bytes(seed)
    }
}

/// Fixed seed source for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedSeedSource(pub Seed);

impl SeedSource for FixedSeedSource {
    fn fill_seed(&self, seed: &mut Seed) -> Result<(), rand::Error> {
        *seed = self.0;
        Ok(())
    }
}

/// Clock abstraction for callers that take timestamps from the host.
pub trait TimeSource: Send + Sync {
    /// Seconds since the epoch, truncated to the on-disk u32 stamp space.
    fn now(&self) -> u32;
}

/// Default time source using system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u32 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_seed_source_fills_bytes() {
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        OsSeedSource.fill_seed(&mut a).unwrap();
        OsSeedSource.fill_seed(&mut b).unwrap();

        // 128 random bits colliding (or coming back all-zero twice) would
        // point at a broken source.
        assert_ne!(a, b);
    }

    #[test]
    fn test_fixed_seed_source_is_deterministic() {
        let source = FixedSeedSource([9u8; 16]);
        let mut seed = [0u8; 16];
        source.fill_seed(&mut seed).unwrap();

        assert_eq!(seed, [9u8; 16]);
    }

    #[test]
    fn test_system_time_source_is_recent() {
        // Any plausible run of this suite happens after 2024-01-01.
        assert!(SystemTimeSource.now() > 1_704_000_000);
    }
}
