//! # Asset Ledger Contract
//!
//! Create, read, update, delete, transfer, and enumerate bikes in the world
//! state. The ledger holds no state of its own: every call goes straight to
//! the [`StateStore`], and every existence check is a fresh read.
//!
//! ## Existence Rules
//!
//! A key *exists* when the store holds a non-empty value for it. Read,
//! update, delete, and transfer all fail with [`LedgerError::NotFound`] on a
//! key that does not exist. Create does not check: it overwrites whatever is
//! at the key, exactly like a first-time write.
//!
//! ## Check-then-Act
//!
//! Update and delete check existence and then write. On a store that offers
//! [`GuardedWrites`](bikechain_protocol::storage::GuardedWrites), the write
//! itself is conditional on the key still being present, so a delete that
//! lands in between turns into `NotFound` rather than a resurrected record.
//! On a blind-write store the two steps are separate round trips and a
//! concurrent writer can slip between them; the last write wins.
//!
//! ## Decode Policy
//!
//! [`transfer`](AssetLedger::transfer) has to parse the stored record to
//! change its owner, so an unparseable record is a hard
//! [`LedgerError::Decode`]. [`list_all`](AssetLedger::list_all) only reports.
//! A record that is JSON but not a full asset (another doc type, an older
//! layout) comes back as its JSON value. A record that is not JSON at all is
//! returned as raw text with a warning and the scan keeps going. One bad
//! record must never hide the rest of the keyspace.

use bikechain_protocol::config::OPEN_BOUND;
use bikechain_protocol::storage::{StateStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::asset::{validate_id, validate_owner, Asset, ValidationError, OWNER_FIELD};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No non-empty value is stored under this ID.
    #[error("the asset {0} does not exist")]
    NotFound(String),

    /// The stored value could not be parsed as a JSON object.
    #[error("asset {id} is not valid structured data: {source}")]
    Decode {
        /// Key of the undecodable record.
        id: String,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be serialized for writing.
    #[error("failed to serialize asset {id}: {source}")]
    Serialization {
        /// Key of the record being written.
        id: String,
        /// Underlying serializer failure.
        #[source]
        source: serde_json::Error,
    },

    /// Caller input was rejected before touching the store.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The store itself failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One record as surfaced by [`AssetLedger::list_all`].
///
/// Serializes untagged: a decoded asset becomes its JSON object, any other
/// JSON value is emitted as stored, and a raw record becomes a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    /// The value decoded as an asset.
    Asset(Asset),
    /// The value was not JSON; this is its text, lossily converted from the
    /// stored bytes.
    Raw(String),
    /// Well-formed JSON that is not an asset.
    Json(Value),
}

impl Record {
    /// Whether this record fell back to raw text.
    pub fn is_raw(&self) -> bool {
        matches!(self, Record::Raw(_))
    }

    /// The decoded asset, if there is one.
    pub fn as_asset(&self) -> Option<&Asset> {
        match self {
            Record::Asset(asset) => Some(asset),
            Record::Raw(_) | Record::Json(_) => None,
        }
    }
}

/// A key and its record, in range-scan order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The store key.
    #[serde(rename = "Key")]
    pub key: String,
    /// The decoded (or raw) value.
    #[serde(rename = "Record")]
    pub record: Record,
}

// ---------------------------------------------------------------------------
// AssetLedger
// ---------------------------------------------------------------------------

/// The asset ledger over a world-state store.
///
/// Stateless apart from the store. Safe to share across threads whenever the
/// store is.
#[derive(Debug, Clone)]
pub struct AssetLedger<S> {
    store: S,
}

impl<S: StateStore> AssetLedger<S> {
    /// Wraps a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns `true` when a non-empty value is stored at `id`.
    pub fn exists(&self, id: &str) -> LedgerResult<bool> {
        validate_id(id)?;
        Ok(self.fetch(id)?.is_some())
    }

    /// Writes a new asset and returns its serialized form.
    ///
    /// The write is unconditional. If `id` is already taken, the previous
    /// record is replaced without warning.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] for bad input (nothing is written), or
    /// [`LedgerError::Store`] if the write fails.
    pub fn create(
        &self,
        id: &str,
        name: &str,
        category: &str,
        owner: &str,
        price: u64,
    ) -> LedgerResult<String> {
        let asset = Asset::new(id, name, category, owner, price)?;
        let json = encode(&asset)?;
        self.store.put(id, json.as_bytes())?;

        tracing::info!(id, owner, price, "asset created");
        Ok(json)
    }

    /// Returns the stored record at `id` as text, without re-validating it.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if nothing (or an empty value) is stored.
    pub fn read(&self, id: &str) -> LedgerResult<String> {
        validate_id(id)?;
        let bytes = self.fetch_existing(id)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Replaces every field of an existing asset.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if `id` does not exist. Nothing is written in
    /// that case.
    pub fn update(
        &self,
        id: &str,
        name: &str,
        category: &str,
        owner: &str,
        price: u64,
    ) -> LedgerResult<()> {
        let asset = Asset::new(id, name, category, owner, price)?;
        if !self.exists(id)? {
            return Err(LedgerError::NotFound(id.to_string()));
        }

        let json = encode(&asset)?;
        self.overwrite_existing(id, json.as_bytes())?;

        tracing::info!(id, owner, price, "asset updated");
        Ok(())
    }

    /// Removes an existing asset. The key is gone afterwards, not tombstoned.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if `id` does not exist.
    pub fn delete(&self, id: &str) -> LedgerResult<()> {
        if !self.exists(id)? {
            return Err(LedgerError::NotFound(id.to_string()));
        }

        match self.store.guarded() {
            Some(guarded) => {
                if !guarded.delete_if_present(id)? {
                    return Err(LedgerError::NotFound(id.to_string()));
                }
            }
            None => self.store.delete(id)?,
        }

        tracing::info!(id, "asset deleted");
        Ok(())
    }

    /// Changes the owner of an existing asset.
    ///
    /// The stored record is parsed as a JSON object, its `Owner` field is
    /// replaced, and the whole object is written back. Every other field,
    /// including ones this crate does not know about, is kept as decoded.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if `id` does not exist, or
    /// [`LedgerError::Decode`] if the stored value is not a JSON object.
    pub fn transfer(&self, id: &str, new_owner: &str) -> LedgerResult<()> {
        validate_id(id)?;
        validate_owner(new_owner)?;

        let bytes = self.fetch_existing(id)?;
        let mut record: Map<String, Value> =
            serde_json::from_slice(&bytes).map_err(|source| LedgerError::Decode {
                id: id.to_string(),
                source,
            })?;
        let previous = record.insert(
            OWNER_FIELD.to_string(),
            Value::String(new_owner.to_string()),
        );

        let updated =
            serde_json::to_vec(&record).map_err(|source| LedgerError::Serialization {
                id: id.to_string(),
                source,
            })?;
        self.overwrite_existing(id, &updated)?;

        tracing::info!(
            id,
            from = ?previous.as_ref().and_then(serde_json::Value::as_str),
            to = new_owner,
            "asset transferred"
        );
        Ok(())
    }

    /// Returns every record in the keyspace, in key order.
    ///
    /// This is a full scan with no doc-type filter, so records of other kinds
    /// that share the keyspace come back too, as [`Record::Json`]. Values that
    /// are not JSON are returned as [`Record::Raw`] and logged at WARN; they
    /// never abort the scan. Failures of the store iterator itself are
    /// propagated.
    ///
    /// The result is collected in full before returning.
    pub fn list_all(&self) -> LedgerResult<Vec<Entry>> {
        let mut entries = Vec::new();
        for item in self.store.range_scan(OPEN_BOUND, OPEN_BOUND)? {
            let (key, value) = item?;
            let record = decode_record(&key, &value);
            entries.push(Entry { key, record });
        }

        tracing::debug!(count = entries.len(), "range scan complete");
        Ok(entries)
    }

    // -- Internals ----------------------------------------------------------

    /// Reads `id`, treating an empty value as absent.
    fn fetch(&self, id: &str) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.store.get(id)?.filter(|bytes| !bytes.is_empty()))
    }

    fn fetch_existing(&self, id: &str) -> LedgerResult<Vec<u8>> {
        self.fetch(id)?
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    /// Writes `value` at a key the caller has just seen present.
    ///
    /// Uses a guarded write when the store has one, so the key cannot be
    /// resurrected if it was deleted since the check.
    fn overwrite_existing(&self, id: &str, value: &[u8]) -> LedgerResult<()> {
        match self.store.guarded() {
            Some(guarded) => {
                if !guarded.put_if_present(id, value)? {
                    return Err(LedgerError::NotFound(id.to_string()));
                }
            }
            None => self.store.put(id, value)?,
        }
        Ok(())
    }
}

fn encode(asset: &Asset) -> LedgerResult<String> {
    asset.to_json().map_err(|source| LedgerError::Serialization {
        id: asset.id.clone(),
        source,
    })
}

/// Decodes a scanned value, falling back to its raw text.
fn decode_record(key: &str, value: &[u8]) -> Record {
    let json = match serde_json::from_slice::<Value>(value) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(key, error = %e, "record is not valid JSON, returning raw value");
            return Record::Raw(String::from_utf8_lossy(value).into_owned());
        }
    };

    match serde_json::from_value::<Asset>(json.clone()) {
        Ok(asset) => Record::Asset(asset),
        Err(e) => {
            tracing::debug!(key, error = %e, "record is not an asset, returning JSON value");
            Record::Json(json)
        }
    }
}
