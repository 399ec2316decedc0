//! # MemoryStore: In-Process World State
//!
//! An ordered map behind a `parking_lot::RwLock`. No durability, no
//! filesystem side effects. This is the backend for unit tests, benches, and
//! anything else that wants ledger semantics without a database.
//!
//! Range scans copy the requested range out under the read lock when the
//! scan is opened. The iterator therefore reflects the keyspace as it was at
//! open time and never holds the lock while the caller consumes it.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::store::{key_bounds, GuardedWrites, StateIter, StateStore, StoreError, StoreResult};

/// In-memory [`StateStore`]. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn range_scan(&self, start: &str, end: &str) -> StoreResult<StateIter<'_>> {
        let bounds = key_bounds(start, end)?;
        let snapshot: Vec<_> = self
            .entries
            .read()
            .range::<String, _>(bounds)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Box::new(snapshot.into_iter().map(Ok::<_, StoreError>)))
    }

    fn guarded(&self) -> Option<&dyn GuardedWrites> {
        Some(self)
    }
}

impl GuardedWrites for MemoryStore {
    fn put_if_present(&self, key: &str, value: &[u8]) -> StoreResult<bool> {
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(current) if !current.is_empty() => {
                *current = value.to_vec();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delete_if_present(&self, key: &str) -> StoreResult<bool> {
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(current) if !current.is_empty() => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
