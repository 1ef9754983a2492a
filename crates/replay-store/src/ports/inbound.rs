//! # Inbound Ports (Driving Ports)
//!
//! The replay-detection surface exposed to protocol servers.

use std::fs::File;

use crate::domain::errors::StoreError;
use crate::domain::record::Tag;

/// Records authenticator tags and reports replays.
///
/// `now` and `skew` come from the caller's clock policy; the store never
/// consults a clock of its own. The file handle is owned by the caller —
/// implementations seek to absolute offsets and never rely on the handle's
/// position between calls.
pub trait TagStoreApi {
    /// Record `tag` as seen at `now`, unless it is already recorded and
    /// still inside the skew window.
    ///
    /// # Errors
    ///
    /// [`StoreError::Replay`] when the tag was already accepted and has not
    /// expired; [`StoreError::Overflow`] when the file cannot grow another
    /// table; I/O and randomness failures propagate verbatim.
    fn store(&self, file: &File, tag: &Tag, now: u32, skew: u32) -> Result<(), StoreError>;
}
