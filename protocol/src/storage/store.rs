//! # World-State Store Interface
//!
//! [`StateStore`] is the only thing the ledger knows about persistence: a flat
//! string-keyed map of byte values with point reads, blind writes, removal,
//! and ordered range scans. Everything above this trait is oblivious to
//! whether the bytes live in memory, in sled, or behind a network hop.
//!
//! ## Range Semantics
//!
//! `range_scan(start, end)` walks keys in ascending byte order, `start`
//! inclusive and `end` exclusive. An empty string on either side removes that
//! bound, so `range_scan("", "")` is a full scan. How the iterator behaves
//! when the keyspace is mutated mid-scan is up to the backend.
//!
//! ## Guarded Writes
//!
//! Backends that can atomically "write only if the key is currently present"
//! expose that through [`StateStore::guarded`]. Callers use it to close the
//! window between an existence check and the write that depends on it.

use std::ops::Bound;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors surfaced by a [`StateStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// The backend could not complete the request for a reason of its own
    /// (connectivity, rejected write, poisoned state).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The range bounds are inverted.
    #[error("invalid range: start key {start:?} sorts after end key {end:?}")]
    InvalidRange {
        /// Inclusive start key.
        start: String,
        /// Exclusive end key.
        end: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A single key-value pair produced by a range scan.
pub type KeyValue = (String, Vec<u8>);

/// Lazy, forward-only iterator returned by [`StateStore::range_scan`].
///
/// Yields `None` once the range is exhausted. Items are fallible because a
/// persistent backend may fail halfway through a scan.
pub type StateIter<'a> = Box<dyn Iterator<Item = StoreResult<KeyValue>> + 'a>;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// String-keyed world-state storage.
///
/// Implementations must be safe to share across threads; every method takes
/// `&self`.
pub trait StateStore: Send + Sync {
    /// Fetch the current value at `key`. `None` when the key is absent.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Unconditionally write `value` at `key`.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Unconditionally remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Open a forward iterator over `[start, end)`. Empty bounds are open.
    fn range_scan(&self, start: &str, end: &str) -> StoreResult<StateIter<'_>>;

    /// Atomic conditional writes, if the backend has them.
    ///
    /// The default is `None`: the backend only does blind writes and callers
    /// have to live with check-then-act races.
    fn guarded(&self) -> Option<&dyn GuardedWrites> {
        None
    }
}

/// Writes that only take effect when the key currently holds a non-empty value.
///
/// The presence test and the write happen as a single step at the storage
/// layer. An empty stored value counts as absent, matching how the ledger
/// defines existence.
pub trait GuardedWrites: Send + Sync {
    /// Replace the value at `key` if it is present. Returns `false` (and writes
    /// nothing) if the key is absent or empty.
    fn put_if_present(&self, key: &str, value: &[u8]) -> StoreResult<bool>;

    /// Remove `key` if it is present. Returns `false` if there was nothing to
    /// remove.
    fn delete_if_present(&self, key: &str) -> StoreResult<bool>;
}

// ---------------------------------------------------------------------------
// Range Helpers
// ---------------------------------------------------------------------------

/// Translate string scan bounds into [`Bound`]s, treating empty strings as
/// unbounded.
///
/// Returns [`StoreError::InvalidRange`] when both bounds are set and `start`
/// sorts after `end`; an inverted range would otherwise panic inside
/// `BTreeMap::range`.
pub fn key_bounds(start: &str, end: &str) -> StoreResult<(Bound<String>, Bound<String>)> {
    if !start.is_empty() && !end.is_empty() && start > end {
        return Err(StoreError::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    let lower = if start.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Included(start.to_string())
    };
    let upper = if end.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Excluded(end.to_string())
    };
    Ok((lower, upper))
}
