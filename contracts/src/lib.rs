//! # bikechain Contracts
//!
//! The asset ledger: business rules for bikes recorded in the world state.
//!
//! - **Asset**: the record type, its stored JSON shape, and input validation.
//! - **Asset Ledger**: create, read, update, delete, and transfer with
//!   existence checks, plus a full-keyspace listing that tolerates malformed
//!   records.
//! - **Seed**: the sample inventory written on first deployment.
//!
//! ## Design Principles
//!
//! 1. The store is the only state. No caches, no indexes, no in-process locks.
//! 2. Bad input is rejected before the store is touched.
//! 3. Mutations of existing records are gated on existence; creation is not.
//! 4. Bulk reads degrade gracefully; read-modify-write fails loudly.

pub mod asset;
pub mod asset_ledger;
pub mod seed;

pub use asset::{Asset, ValidationError};
pub use asset_ledger::{AssetLedger, Entry, LedgerError, LedgerResult, Record};
