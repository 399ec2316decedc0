//! # Asset Record
//!
//! The one record kind this ledger manages: a bike with a name, a
//! displacement class, an owner, and a price. Records are stored as JSON
//! objects keyed by their ID:
//!
//! ```json
//! {"ID":"0001","Name":"Yamaha RX100","Category":"95cc","Owner":"null","Price":300000,"docType":"bike"}
//! ```
//!
//! Field names are part of the stored format and must not change. Records
//! written with the older `Bike` and `CC` keys decode as `Name` and
//! `Category`.
//!
//! ## Validation
//!
//! Every value that reaches the store through [`Asset::new`] has been
//! checked: IDs are non-empty, bounded, and free of control characters;
//! name and owner are non-empty; no field exceeds
//! [`MAX_FIELD_LENGTH`](bikechain_protocol::config::MAX_FIELD_LENGTH). Prices
//! are `u64`, so they cannot go negative. Callers that receive prices as text
//! go through [`parse_price`].

use bikechain_protocol::config::{DOC_TYPE, MAX_FIELD_LENGTH, MAX_ID_LENGTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stored field name of the owner, the one field a transfer rewrites.
pub(crate) const OWNER_FIELD: &str = "Owner";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Caller input rejected before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A field exceeded its length limit.
    #[error("{field} is {len} bytes long, the limit is {max}")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Actual length in bytes.
        len: usize,
        /// Maximum allowed length in bytes.
        max: usize,
    },

    /// The asset ID contains a control character.
    #[error("asset id {0:?} contains control characters")]
    ControlCharacter(String),

    /// A textual price was not a non-negative integer.
    #[error("invalid price {0:?}: expected a non-negative integer")]
    InvalidPrice(String),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A bike registered on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique key in the world state. Never changes after creation.
    #[serde(rename = "ID")]
    pub id: String,
    /// Model name, e.g. "Yamaha RX100".
    #[serde(rename = "Name", alias = "Bike")]
    pub name: String,
    /// Free-form classifier, in practice the engine displacement ("95cc").
    #[serde(rename = "Category", alias = "CC")]
    pub category: String,
    /// Current owner. [`UNASSIGNED_OWNER`](bikechain_protocol::config::UNASSIGNED_OWNER)
    /// when nobody owns it.
    #[serde(rename = "Owner")]
    pub owner: String,
    /// Price in whole currency units.
    #[serde(rename = "Price")]
    pub price: u64,
    /// Record kind tag. Always [`DOC_TYPE`] for records built here.
    #[serde(rename = "docType")]
    pub doc_type: String,
}

impl Asset {
    /// Builds a validated asset with the doc type tag set.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the ID, name, or owner is empty, if the
    /// ID contains control characters, or if any field is over its length
    /// limit.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        owner: impl Into<String>,
        price: u64,
    ) -> Result<Self, ValidationError> {
        let asset = Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            owner: owner.into(),
            price,
            doc_type: DOC_TYPE.to_string(),
        };

        validate_id(&asset.id)?;
        validate_required("name", &asset.name)?;
        validate_length("category", &asset.category)?;
        validate_owner(&asset.owner)?;

        Ok(asset)
    }

    /// Serializes the asset to its stored JSON form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Checks that `id` is usable as a store key.
pub fn validate_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::Empty { field: "id" });
    }
    if id.len() > MAX_ID_LENGTH {
        return Err(ValidationError::TooLong {
            field: "id",
            len: id.len(),
            max: MAX_ID_LENGTH,
        });
    }
    if id.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacter(id.to_string()));
    }
    Ok(())
}

/// Checks an owner value, including new owners passed to a transfer.
pub fn validate_owner(owner: &str) -> Result<(), ValidationError> {
    validate_required("owner", owner)
}

/// Parses a price given as text.
///
/// Leading and trailing whitespace is ignored. Anything else that is not a
/// plain non-negative integer (signs, decimals, exponents) is rejected.
pub fn parse_price(raw: &str) -> Result<u64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidPrice(raw.to_string()));
    }
    trimmed
        .parse()
        .map_err(|_| ValidationError::InvalidPrice(raw.to_string()))
}

fn validate_required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    validate_length(field, value)
}

fn validate_length(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.len() > MAX_FIELD_LENGTH {
        return Err(ValidationError::TooLong {
            field,
            len: value.len(),
            max: MAX_FIELD_LENGTH,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bikechain_protocol::config::UNASSIGNED_OWNER;

    fn yamaha() -> Asset {
        Asset::new("0001", "Yamaha RX100", "95cc", UNASSIGNED_OWNER, 300_000).unwrap()
    }

    #[test]
    fn new_sets_doc_type() {
        let asset = yamaha();
        assert_eq!(asset.doc_type, DOC_TYPE);
        assert_eq!(asset.owner, "null");
        assert_eq!(asset.price, 300_000);
    }

    #[test]
    fn serialized_field_names() {
        let json: serde_json::Value = serde_json::from_str(&yamaha().to_json().unwrap()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 6);
        assert_eq!(obj["ID"], "0001");
        assert_eq!(obj["Name"], "Yamaha RX100");
        assert_eq!(obj["Category"], "95cc");
        assert_eq!(obj["Owner"], "null");
        assert_eq!(obj["Price"], 300_000);
        assert_eq!(obj["docType"], "bike");
    }

    #[test]
    fn decoding_ignores_field_order() {
        let json = r#"{"docType":"bike","Price":150000,"Owner":"null","Category":"300cc","Name":"KTM","ID":"0002"}"#;
        let asset: Asset = serde_json::from_str(json).unwrap();
        assert_eq!(
            asset,
            Asset::new("0002", "KTM", "300cc", "null", 150_000).unwrap()
        );
    }

    #[test]
    fn decoding_accepts_bike_and_cc_keys() {
        let json = r#"{"ID":"0003","Bike":"Ather","CC":"110cc","Owner":"null","Price":90000,"docType":"bike"}"#;
        let asset: Asset = serde_json::from_str(json).unwrap();
        assert_eq!(asset.name, "Ather");
        assert_eq!(asset.category, "110cc");

        // Re-encoding uses the current keys.
        let out: serde_json::Value = serde_json::from_str(&asset.to_json().unwrap()).unwrap();
        assert_eq!(out["Name"], "Ather");
        assert!(out.get("Bike").is_none());
    }

    #[test]
    fn decoding_requires_every_field() {
        let json = r#"{"ID":"0002","Name":"KTM","Category":"300cc","Owner":"null","Price":150000}"#;
        assert!(serde_json::from_str::<Asset>(json).is_err());
    }

    #[test]
    fn empty_id_rejected() {
        let err = Asset::new("", "KTM", "300cc", "null", 1).unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "id" });
    }

    #[test]
    fn long_id_rejected() {
        let id = "x".repeat(MAX_ID_LENGTH + 1);
        let err = Asset::new(id, "KTM", "300cc", "null", 1).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { field: "id", .. }));
    }

    #[test]
    fn control_characters_in_id_rejected() {
        let err = Asset::new("00\n01", "KTM", "300cc", "null", 1).unwrap_err();
        assert!(matches!(err, ValidationError::ControlCharacter(_)));
    }

    #[test]
    fn blank_name_and_owner_rejected() {
        assert_eq!(
            Asset::new("0001", "  ", "95cc", "null", 1).unwrap_err(),
            ValidationError::Empty { field: "name" }
        );
        assert_eq!(
            Asset::new("0001", "Yamaha", "95cc", "", 1).unwrap_err(),
            ValidationError::Empty { field: "owner" }
        );
    }

    #[test]
    fn empty_category_allowed_but_bounded() {
        assert!(Asset::new("0001", "Yamaha", "", "null", 1).is_ok());
        let long = "c".repeat(MAX_FIELD_LENGTH + 1);
        assert!(matches!(
            Asset::new("0001", "Yamaha", long, "null", 1).unwrap_err(),
            ValidationError::TooLong {
                field: "category",
                ..
            }
        ));
    }

    #[test]
    fn zero_price_is_valid() {
        assert_eq!(Asset::new("0001", "Gift", "50cc", "null", 0).unwrap().price, 0);
    }

    #[test]
    fn parse_price_accepts_integers() {
        assert_eq!(parse_price("300000").unwrap(), 300_000);
        assert_eq!(parse_price(" 42 ").unwrap(), 42);
        assert_eq!(parse_price("0").unwrap(), 0);
    }

    #[test]
    fn parse_price_rejects_negative_and_fractional() {
        for raw in ["-1", "+5", "1.5", "1e3", "", "abc", "99999999999999999999999"] {
            assert_eq!(
                parse_price(raw).unwrap_err(),
                ValidationError::InvalidPrice(raw.to_string()),
                "{raw:?} should be rejected"
            );
        }
    }
}
