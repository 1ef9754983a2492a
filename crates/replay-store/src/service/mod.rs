//! # Tag Store Service
//!
//! Orchestrates one `store` call: take the whole-file lock, read or
//! initialize the hash seed, probe tables front to back, and either report
//! a replay or write the tag into the first usable slot.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::adapters::lock::{FlockAdapter, LockGuard};
use crate::domain::config::StoreConfig;
use crate::domain::errors::StoreError;
use crate::domain::hashing::{advance_seed, slot_index, Seed};
use crate::domain::layout::{TableWalk, BUCKET_WIDTH, SEED_LEN};
use crate::domain::record::{Tag, TagRecord, RECORD_LEN};
use crate::ports::inbound::TagStoreApi;
use crate::ports::outbound::{FileLocking, OsSeedSource, SeedSource};


/// File-backed replay-tag store.
///
/// An instance is stateless apart from its configuration and port
/// adapters; the file passed to each call carries all shared state, so one
/// instance may serve any number of files and any number of processes may
/// serve one file.
pub struct TagStore<L = FlockAdapter, S = OsSeedSource> {
    config: StoreConfig,
    locking: L,
    seed_source: S,
}

impl TagStore {
    /// Store with default geometry, flock locking, and OS randomness.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            locking: FlockAdapter,
            seed_source: OsSeedSource,
        }
    }
}

impl Default for TagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<L, S> TagStore<L, S>
where
    L: FileLocking,
    S: SeedSource,
{
    /// Store with custom port adapters.
    pub fn with_ports(config: StoreConfig, locking: L, seed_source: S) -> Self {
        Self {
            config,
            locking,
            seed_source,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The probe loop, run under the exclusive lock.
    ///
    /// Walks tables front to back. The duplicate scan continues until the
    /// frontier (a short bucket read or a never-used slot), while the write
    /// target is fixed at the first free or expired slot seen anywhere
    /// along the way and never reconsidered.
    fn store_locked(
        &self,
        file: &File,
        tag: &Tag,
        now: u32,
        skew: u32,
    ) -> Result<(), StoreError> {
        let mut seed = self.read_or_init_seed(file)?;
        let mut walk = TableWalk::new(&self.config);
        let mut avail: Option<u64> = None;

        loop {
            let table = walk.advance()?;
            if table.index > 0 {
                advance_seed(&mut seed);
                tracing::trace!(table = table.index, "probing grown table");
            }

            let index = slot_index(tag, &seed, table.nrecords);
            let bucket_offset = table.record_offset(index);
            let (records, nread) = read_bucket(file, bucket_offset)?;

            // Slots past EOF have never been used, so a short read already
            // proves we are at the frontier.
            let mut frontier = nread < BUCKET_WIDTH;
            let mut bucket_avail = None;

            for (i, raw) in records.iter().enumerate().take(nread) {
                let record = TagRecord::decode(raw);
                if record.is_empty() {
                    frontier = true;
                } else if record.tag == *tag && !record.is_expired(now, skew) {
                    return Err(StoreError::Replay);
                }
                if bucket_avail.is_none()
                    && (record.is_empty() || record.is_expired(now, skew))
                {
                    bucket_avail = Some(bucket_offset + (i * RECORD_LEN) as u64);
                }
            }
            if bucket_avail.is_none() && nread < BUCKET_WIDTH {
                bucket_avail = Some(bucket_offset + (nread * RECORD_LEN) as u64);
            }

            // Keep the first usable slot ever seen; later tables only
            // matter for the duplicate scan.
            if avail.is_none() {
                avail = bucket_avail;
            }

            if frontier {
                // A frontier bucket always exposes a usable slot, so the
                // probe above recorded one.
                if let Some(offset) = avail {
                    write_record(file, offset, &TagRecord::new(*tag, now))?;
                    return Ok(());
                }
            }
        }
    }

    /// Read the seed at offset 0, writing a fresh one first if the file is
    /// new or shorter than the seed.
    ///
    /// An existing seed is never regenerated; rewriting it would strand
    /// every live entry at an unreachable position.
    fn read_or_init_seed(&self, file: &File) -> Result<Seed, StoreError> {
        let mut f = file;
        f.seek(SeekFrom::Start(0))?;
        let mut seed: Seed = [0u8; SEED_LEN];
        if read_full(file, &mut seed)? == SEED_LEN {
            return Ok(seed);
        }

        self.seed_source.fill_seed(&mut seed)?;
        let mut f = file;
        f.seek(SeekFrom::Start(0))?;
        f.write_all(&seed)?;
        tracing::debug!("initialized hash seed for new store file");
        Ok(seed)
    }
}

impl<L, S> TagStoreApi for TagStore<L, S>
where
    L: FileLocking,
    S: SeedSource,
{
    /// Record `tag` as seen at `now`, unless it was already recorded and
    /// has not yet expired.
    ///
    /// The whole-file exclusive lock is held for the full call, so stores
    /// from any number of processes are linearized: of any set of
    /// overlapping calls for one tag, exactly one succeeds and the rest
    /// observe [`StoreError::Replay`].
    fn store(&self, file: &File, tag: &Tag, now: u32, skew: u32) -> Result<(), StoreError> {
        let _guard = LockGuard::acquire(&self.locking, file)?;
        self.store_locked(file, tag, now, skew)
    }
}

/// Read until `buf` is full or EOF; returns the byte count actually read.
fn read_full(mut f: &File, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match f.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Read up to one bucket's worth of records starting at `offset`.
///
/// Returns the raw frames and how many complete records were present; a
/// trailing fragment counts as unread.
fn read_bucket(
    file: &File,
    offset: u64,
) -> Result<([[u8; RECORD_LEN]; BUCKET_WIDTH], usize), StoreError> {
    let mut f = file;
    f.seek(SeekFrom::Start(offset))?;
    let mut buf = [0u8; RECORD_LEN * BUCKET_WIDTH];
    let nread = read_full(file, &mut buf)? / RECORD_LEN;

    let mut records = [[0u8; RECORD_LEN]; BUCKET_WIDTH];
    for (i, record) in records.iter_mut().enumerate().take(nread) {
        record.copy_from_slice(&buf[i * RECORD_LEN..(i + 1) * RECORD_LEN]);
    }
    Ok((records, nread))
}

/// Write one record frame at `offset`, extending the file if the slot does
/// not exist yet (holes read back as empty slots).
fn write_record(file: &File, offset: u64, record: &TagRecord) -> Result<(), StoreError> {
    let mut f = file;
    f.seek(SeekFrom::Start(offset))?;
    f.write_all(&record.encode())?;
    Ok(())
}
