//! # Record Framing
//!
//! Fixed-width slot encoding for the store file. Each slot is `RECORD_LEN`
//! bytes: the raw tag followed by a big-endian seconds-since-epoch stamp.
//! A zero stamp marks a slot nothing currently occupies.

use std::fmt;

/// Length of a tag fingerprint in bytes.
pub const TAG_LEN: usize = 12;

/// Length of an on-disk record: tag plus 4-byte big-endian timestamp.
pub const RECORD_LEN: usize = TAG_LEN + 4;

/// A 12-byte authenticator fingerprint used as the replay-detection key.
///
/// Tags are value types: stores copy them into records, nothing aliases.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag([u8; TAG_LEN]);

impl Tag {
    /// Wrap an exact-length fingerprint.
    pub const fn new(bytes: [u8; TAG_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a tag from a caller fingerprint of arbitrary length.
    ///
    /// Shorter fingerprints are zero-padded; longer ones are truncated to
    /// the leading `TAG_LEN` bytes.
    pub fn from_fingerprint(fingerprint: &[u8]) -> Self {
        let mut bytes = [0u8; TAG_LEN];
        let n = fingerprint.len().min(TAG_LEN);
        bytes[..n].copy_from_slice(&fingerprint[..n]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// One decoded slot: a tag and the timestamp it was accepted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRecord {
    pub tag: Tag,
    pub timestamp: u32,
}

impl TagRecord {
    pub fn new(tag: Tag, timestamp: u32) -> Self {
        Self { tag, timestamp }
    }

    /// Serialize to the on-disk frame: tag bytes, then big-endian stamp.
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];
        buf[..TAG_LEN].copy_from_slice(self.tag.as_bytes());
        buf[TAG_LEN..].copy_from_slice(&self.timestamp.to_be_bytes());
        buf
    }

    /// Deserialize an on-disk frame.
    pub fn decode(buf: &[u8; RECORD_LEN]) -> Self {
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&buf[..TAG_LEN]);
        let timestamp = u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]);
        Self {
            tag: Tag(tag),
            timestamp,
        }
    }

    /// A zero stamp marks an empty slot.
    pub fn is_empty(&self) -> bool {
        self.timestamp == 0
    }

    /// Whether this record's entry has aged out of the trust window.
    ///
    /// Evaluates `now >= timestamp + skew` on the u32 ring via signed
    /// difference, so stamps straddling the 32-bit rollover compare
    /// correctly.
    pub fn is_expired(&self, now: u32, skew: u32) -> bool {
        now.wrapping_sub(self.timestamp.wrapping_add(skew)) as i32 >= 0
    }
}
