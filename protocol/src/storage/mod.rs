//! # Storage Module
//!
//! The world state: a single string-keyed keyspace holding serialized
//! records. The ledger talks to it only through the [`StateStore`] trait.
//!
//! ## Architecture
//!
//! ```text
//! store.rs   StateStore / GuardedWrites traits, StoreError, range helpers
//! memory.rs  MemoryStore, a BTreeMap behind a RwLock, for tests and tooling
//! db.rs      SledStore, a persistent sled tree, used by the node
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Values are opaque bytes.** The store never parses what it holds.
//!    Decoding and the policy for undecodable records belong to the ledger.
//!
//! 2. **Empty bounds mean unbounded.** `range_scan("", "")` walks the entire
//!    keyspace in ascending key order, regardless of record kind.
//!
//! 3. **Conditional writes are optional.** Backends that can do an atomic
//!    "write if present" advertise it; the rest are blind-write only.

pub mod db;
pub mod memory;
pub mod store;

pub use db::SledStore;
pub use memory::MemoryStore;
pub use store::{GuardedWrites, KeyValue, StateIter, StateStore, StoreError, StoreResult};
