//! # Replay Store
//!
//! A file-backed, multi-process-safe replay cache. It records
//! recently-seen authenticator tags (12-byte fingerprints) so a protocol
//! server can reject replayed requests within a bounded clock-skew window.
//!
//! ## On-Disk Format
//!
//! ```text
//! offset 0            : 16-byte hash seed (random, written once)
//! offset 16           : table 0 — 1023 × 16-byte records
//! offset 16 + 16368   : table 1 — 2048 × 16-byte records
//! offset ...          : table k — 2 × table k-1 records
//! ```
//!
//! Each record holds a 12-byte tag followed by a big-endian u32 timestamp;
//! a zero stamp marks an empty slot. Lookup is open addressing with a
//! 2-slot bucket per hash index, keyed by the per-file seed (SipHash-2-4).
//! When a bucket fills, the store grows a new, larger table after the last
//! one instead of rehashing.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | At-Most-Once | Of overlapping stores for one tag, one succeeds, the rest report a replay |
//! | 2 | Linearized Stores | A whole-file exclusive lock serializes every store across processes |
//! | 3 | Seed Immutability | The persisted seed is never rewritten once present |
//! | 4 | Bounded Growth | Expired slots are reused before any table is added |
//! | 5 | Overflow Before Write | The size ceiling is checked before anything is written |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` — record framing, file geometry, keyed hashing, config, errors
//! - `ports/` — the store API (inbound) and locking/randomness/clock traits (outbound)
//! - `adapters/` — default flock adapter over `fs2`
//! - `service/` — the `store` operation
//!
//! ## Usage
//!
//! ```ignore
//! use replay_store::{StoreError, Tag, TagStore, TagStoreApi};
//!
//! let store = TagStore::new();
//! let file = std::fs::OpenOptions::new()
//!     .read(true)
//!     .write(true)
//!     .create(true)
//!     .open("service.rcache")?;
//!
//! match store.store(&file, &Tag::from_fingerprint(checksum), now, skew) {
//!     Ok(()) => { /* first sighting, accept the request */ }
//!     Err(StoreError::Replay) => { /* reject as a replay */ }
//!     Err(err) => return Err(err.into()),
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export key types for convenience
pub use adapters::lock::{FlockAdapter, LockGuard};
pub use domain::config::{StoreConfig, DEFAULT_MAX_FILE_SIZE};
pub use domain::errors::StoreError;
pub use domain::hashing::Seed;
pub use domain::layout::{Table, TableWalk, BUCKET_WIDTH, FIRST_TABLE_RECORDS, SEED_LEN};
pub use domain::record::{Tag, TagRecord, RECORD_LEN, TAG_LEN};
pub use ports::inbound::TagStoreApi;
pub use ports::outbound::{
    FileLocking, FixedSeedSource, OsSeedSource, SeedSource, SystemTimeSource, TimeSource,
};
pub use service::TagStore;
