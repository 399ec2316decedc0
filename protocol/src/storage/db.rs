//! # SledStore: Persistent World State
//!
//! The persistence layer for bikechain, built on sled's embedded key-value
//! store. All on-disk ledger data flows through this module.
//!
//! ## Tree Layout
//!
//! | Tree          | Key              | Value                      |
//! |---------------|------------------|----------------------------|
//! | `world_state` | asset ID (UTF-8) | record bytes (JSON, as written) |
//!
//! The store never interprets values. It hands back exactly the bytes it was
//! given, which is what lets the ledger surface malformed records instead of
//! losing them.
//!
//! ## Atomicity
//!
//! Guarded writes go through sled's `fetch_and_update`, which retries its
//! closure under compare-and-swap until it lands. The presence check and the
//! write are one step from the point of view of any other writer.

use sled::{Db, Tree};
use std::path::Path;

use super::store::{key_bounds, GuardedWrites, KeyValue, StateIter, StateStore, StoreResult};
use crate::config::WORLD_STATE_TREE;

// ---------------------------------------------------------------------------
// SledStore
// ---------------------------------------------------------------------------

/// Persistent [`StateStore`] over a sled tree.
///
/// # Thread Safety
///
/// sled trees support lock-free concurrent reads and serialized writes.
/// `SledStore` is cheap to clone and can be shared via `Arc` without
/// external synchronization.
#[derive(Debug, Clone)]
pub struct SledStore {
    /// The underlying sled database handle.
    db: Db,
    /// Asset records keyed by ID.
    state: Tree,
}

impl SledStore {
    /// Open or create a store at the given filesystem path.
    ///
    /// If the directory doesn't exist, sled creates it. Existing data is
    /// available immediately.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary store that is removed when the last handle drops.
    ///
    /// No filesystem cleanup needed, which makes it the default for tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let state = db.open_tree(WORLD_STATE_TREE)?;
        tracing::debug!(
            tree = WORLD_STATE_TREE,
            keys = state.len(),
            "world state opened"
        );
        Ok(Self { db, state })
    }

    /// Number of keys in the world state.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Whether the world state holds no keys.
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Force a flush of all pending writes to disk.
    ///
    /// sled buffers writes in memory. This call blocks until they are durable.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl StateStore for SledStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.state.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.state.insert(key.as_bytes(), value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.state.remove(key.as_bytes())?;
        Ok(())
    }

    fn range_scan(&self, start: &str, end: &str) -> StoreResult<StateIter<'_>> {
        let bounds = key_bounds(start, end)?;
        let iter = self.state.range(bounds).map(|item| -> StoreResult<KeyValue> {
            let (key, value) = item?;
            // Keys only ever enter through `&str`, so this is lossless for
            // anything written by this crate.
            Ok((String::from_utf8_lossy(&key).into_owned(), value.to_vec()))
        });
        Ok(Box::new(iter))
    }

    fn guarded(&self) -> Option<&dyn GuardedWrites> {
        Some(self)
    }
}

impl GuardedWrites for SledStore {
    fn put_if_present(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        let previous = self
            .state
            .fetch_and_update(key.as_bytes(), |current| match current {
                Some(bytes) if !bytes.is_empty() => Some(value.to_vec()),
                other => other.map(<[u8]>::to_vec),
            })?;
        Ok(previous.map_or(false, |v| !v.is_empty()))
    }

    fn delete_if_present(&self, key: &str) -> StoreResult<bool> {
        let previous = self
            .state
            .fetch_and_update(key.as_bytes(), |current| match current {
                Some(bytes) if !bytes.is_empty() => None,
                other => other.map(<[u8]>::to_vec),
            })?;
        Ok(previous.map_or(false, |v| !v.is_empty()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_keys(store: &SledStore, start: &str, end: &str) -> Vec<String> {
        store
            .range_scan(start, end)
            .unwrap()
            .map(|r| r.unwrap().0)
            .collect()
    }

    #[test]
    fn open_temporary_store() {
        let store = SledStore::open_temporary().expect("should create temp store");
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn open_persistent_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SledStore::open(dir.path()).expect("should open store");
        store.put("0001", br#"{"ID":"0001"}"#).unwrap();
        store.flush().unwrap();
        drop(store);

        let reopened = SledStore::open(dir.path()).expect("should reopen store");
        assert_eq!(
            reopened.get("0001").unwrap().unwrap(),
            br#"{"ID":"0001"}"#.to_vec()
        );
    }

    #[test]
    fn get_returns_none_for_missing_key() {
        let store = SledStore::open_temporary().unwrap();
        assert!(store.get("0042").unwrap().is_none());
    }

    #[test]
    fn put_overwrites_and_delete_removes() {
        let store = SledStore::open_temporary().unwrap();
        store.put("0001", b"first").unwrap();
        store.put("0001", b"second").unwrap();
        assert_eq!(store.get("0001").unwrap().unwrap(), b"second".to_vec());
        assert_eq!(store.len(), 1);

        store.delete("0001").unwrap();
        assert!(store.get("0001").unwrap().is_none());
        // Removing again is a no-op.
        store.delete("0001").unwrap();
    }

    #[test]
    fn values_are_returned_verbatim() {
        let store = SledStore::open_temporary().unwrap();
        let garbage = [0xff, 0x00, b'{', 0x7f];
        store.put("raw", &garbage).unwrap();
        assert_eq!(store.get("raw").unwrap().unwrap(), garbage.to_vec());
    }

    #[test]
    fn full_range_scan_in_key_order() {
        let store = SledStore::open_temporary().unwrap();
        for key in ["0005", "0001", "0004", "0002", "0003"] {
            store.put(key, key.as_bytes()).unwrap();
        }

        let pairs: Vec<_> = store
            .range_scan("", "")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(pairs.len(), 5);
        for (i, (key, value)) in pairs.iter().enumerate() {
            let expected = format!("{:04}", i + 1);
            assert_eq!(key, &expected);
            assert_eq!(value, expected.as_bytes());
        }
    }

    #[test]
    fn bounded_range_scan() {
        let store = SledStore::open_temporary().unwrap();
        for key in ["0001", "0002", "0003", "0004"] {
            store.put(key, b"v").unwrap();
        }
        assert_eq!(scan_keys(&store, "0002", "0004"), vec!["0002", "0003"]);
        assert_eq!(scan_keys(&store, "0003", ""), vec!["0003", "0004"]);
        assert_eq!(scan_keys(&store, "", "0002"), vec!["0001"]);
    }

    #[test]
    fn inverted_range_is_an_error() {
        let store = SledStore::open_temporary().unwrap();
        assert!(store.range_scan("0009", "0001").is_err());
    }

    #[test]
    fn guarded_put_on_missing_key_writes_nothing() {
        let store = SledStore::open_temporary().unwrap();
        let guarded = store.guarded().expect("sled supports guarded writes");
        assert!(!guarded.put_if_present("0001", b"v").unwrap());
        assert!(store.get("0001").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn guarded_put_replaces_present_value() {
        let store = SledStore::open_temporary().unwrap();
        store.put("0001", b"old").unwrap();
        let guarded = store.guarded().unwrap();
        assert!(guarded.put_if_present("0001", b"new").unwrap());
        assert_eq!(store.get("0001").unwrap().unwrap(), b"new".to_vec());
    }

    #[test]
    fn guarded_delete() {
        let store = SledStore::open_temporary().unwrap();
        let guarded = store.guarded().unwrap();
        assert!(!guarded.delete_if_present("0001").unwrap());

        store.put("0001", b"v").unwrap();
        assert!(guarded.delete_if_present("0001").unwrap());
        assert!(store.get("0001").unwrap().is_none());
    }

    #[test]
    fn guarded_writes_treat_empty_values_as_absent() {
        let store = SledStore::open_temporary().unwrap();
        store.put("0001", b"").unwrap();
        let guarded = store.guarded().unwrap();

        assert!(!guarded.put_if_present("0001", b"v").unwrap());
        assert!(!guarded.delete_if_present("0001").unwrap());
        assert_eq!(store.get("0001").unwrap().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn concurrent_reads_do_not_block() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(SledStore::open_temporary().unwrap());
        for i in 0..10u64 {
            store.put(&format!("{i:04}"), &i.to_be_bytes()).unwrap();
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..10u64 {
                        let value = store.get(&format!("{i:04}")).unwrap().unwrap();
                        assert_eq!(value, i.to_be_bytes().to_vec());
                    }
                    store.range_scan("", "").unwrap().count()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().expect("reader thread should not panic"), 10);
        }
    }
}
