//! # Keyed Slot Hashing
//!
//! SipHash-2-4 keyed by the per-file seed spreads tags across each table.
//! The seed makes slot positions unpredictable across independently created
//! stores, so an unkeyed hash is not a valid substitute here.
//!
//! Advancing to the next table perturbs the in-memory seed copy, giving
//! every table an independent probe position for the same tag. The
//! persisted seed at the head of the file never changes.

use std::hash::Hasher;

use siphasher::sip::SipHasher24;

use crate::domain::layout::SEED_LEN;
use crate::domain::record::Tag;

/// Hash seed persisted at the head of the store file.
pub type Seed = [u8; SEED_LEN];

/// Slot index for `tag` within a table of `nrecords` records.
///
/// Deterministic for a fixed (tag, seed) pair.
pub fn slot_index(tag: &Tag, seed: &Seed, nrecords: u64) -> u64 {
    let mut hasher = SipHasher24::new_with_key(seed);
    hasher.write(tag.as_bytes());
    hasher.finish() % nrecords
}

/// Derive the next table's salt from the current one.
pub fn advance_seed(seed: &mut Seed) {
    seed[0] = seed[0].wrapping_add(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::TAG_LEN;

    #[test]
    fn test_slot_index_deterministic() {
        let tag = Tag::new([0x42; TAG_LEN]);
        let seed = [7u8; SEED_LEN];

        assert_eq!(slot_index(&tag, &seed, 1023), slot_index(&tag, &seed, 1023));
    }

    #[test]
    fn test_slot_index_within_bounds() {
        let seed = [3u8; SEED_LEN];
        for i in 0..200u8 {
            let tag = Tag::new([i; TAG_LEN]);
            assert!(slot_index(&tag, &seed, 1023) < 1023);
            assert!(slot_index(&tag, &seed, 4) < 4);
        }
    }

    #[test]
    fn test_different_seeds_change_positions() {
        let seed_a = [0u8; SEED_LEN];
        let seed_b = [1u8; SEED_LEN];

        let mut moved = 0;
        for i in 0..100u8 {
            let tag = Tag::new([i; TAG_LEN]);
            if slot_index(&tag, &seed_a, 1023) != slot_index(&tag, &seed_b, 1023) {
                moved += 1;
            }
        }
        // A keyed hash must relocate nearly every tag under a new key.
        assert!(moved > 90, "only {} of 100 tags moved", moved);
    }

    #[test]
    fn test_advance_seed_changes_positions() {
        let mut seed = [0xA5u8; SEED_LEN];
        let before = seed;
        advance_seed(&mut seed);

        assert_ne!(seed, before);
        assert_eq!(seed[0], 0xA6);
        assert_eq!(&seed[1..], &before[1..]);

        let mut moved = 0;
        for i in 0..100u8 {
            let tag = Tag::new([i; TAG_LEN]);
            if slot_index(&tag, &before, 1023) != slot_index(&tag, &seed, 1023) {
                moved += 1;
            }
        }
        assert!(moved > 90, "only {} of 100 tags moved", moved);
    }

    #[test]
    fn test_advance_seed_wraps() {
        let mut seed = [0u8; SEED_LEN];
        seed[0] = 0xFF;
        advance_seed(&mut seed);

        assert_eq!(seed[0], 0);
    }

    #[test]
    fn test_index_uniformity() {
        // Hash positions should be roughly uniform across the table.
        let seed = [0x5Au8; SEED_LEN];
        let nrecords = 1000u64;
        let mut counts = vec![0usize; 10];

        for i in 0..1000u16 {
            let mut bytes = [0u8; TAG_LEN];
            bytes[..2].copy_from_slice(&i.to_be_bytes());
            let index = slot_index(&Tag::new(bytes), &seed, nrecords);
            counts[(index / 100) as usize] += 1;
        }

        // Each decile should land near 100; allow 50% variance.
        for (bucket, count) in counts.iter().enumerate() {
            assert!(
                (50..=150).contains(count),
                "bucket {} has {} entries, expected ~100",
                bucket,
                count
            );
        }
    }
}
