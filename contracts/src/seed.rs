//! # Ledger Bootstrap
//!
//! Sample inventory written on first deployment. Seeding goes through
//! [`AssetLedger::create`], so the records get the same validation and the
//! same `docType` tag as anything a caller creates later.

use bikechain_protocol::config::{DOC_TYPE, UNASSIGNED_OWNER};
use bikechain_protocol::storage::StateStore;

use crate::asset::Asset;
use crate::asset_ledger::{AssetLedger, LedgerResult};

/// The five bikes every fresh ledger starts with, in write order.
///
/// All of them are unassigned. The write order is not key order (`0005`
/// comes third); a range scan still returns them sorted by ID.
pub fn sample_assets() -> Vec<Asset> {
    [
        ("0001", "Yamaha RX100", "95cc", 300_000),
        ("0002", "KTM", "300cc", 150_000),
        ("0005", "Kawasaki Ninja", "250cc", 300_000),
        ("0003", "Chetak EV", "180cc", 120_000),
        ("0004", "OLA EV", "170cc", 80_000),
    ]
    .into_iter()
    .map(|(id, name, category, price)| Asset {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        owner: UNASSIGNED_OWNER.to_string(),
        price,
        doc_type: DOC_TYPE.to_string(),
    })
    .collect()
}

/// Writes the sample inventory and returns how many records were written.
///
/// Like `create`, this overwrites: running it against a populated ledger
/// resets the five sample IDs to their initial state and leaves every other
/// key alone.
pub fn init_ledger<S: StateStore>(ledger: &AssetLedger<S>) -> LedgerResult<usize> {
    let assets = sample_assets();
    for asset in &assets {
        ledger.create(
            &asset.id,
            &asset.name,
            &asset.category,
            &asset.owner,
            asset.price,
        )?;
        tracing::info!(id = %asset.id, "asset initialized");
    }
    Ok(assets.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bikechain_protocol::storage::MemoryStore;

    #[test]
    fn sample_assets_are_valid() {
        for asset in sample_assets() {
            let rebuilt = Asset::new(
                asset.id.clone(),
                asset.name.clone(),
                asset.category.clone(),
                asset.owner.clone(),
                asset.price,
            )
            .expect("sample asset should pass validation");
            assert_eq!(rebuilt, asset);
        }
    }

    #[test]
    fn init_ledger_writes_five_tagged_records() {
        let ledger = AssetLedger::new(MemoryStore::new());
        assert_eq!(init_ledger(&ledger).unwrap(), 5);

        let entries = ledger.list_all().unwrap();
        let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["0001", "0002", "0003", "0004", "0005"]);

        for entry in &entries {
            let asset = entry.record.as_asset().expect("seeded record decodes");
            assert_eq!(asset.doc_type, DOC_TYPE);
            assert_eq!(asset.owner, UNASSIGNED_OWNER);
        }
    }

    #[test]
    fn init_ledger_resets_sample_ids_only() {
        let ledger = AssetLedger::new(MemoryStore::new());
        init_ledger(&ledger).unwrap();
        ledger.transfer("0004", "Alice").unwrap();
        ledger
            .create("0100", "Royal Enfield", "350cc", "Bob", 200_000)
            .unwrap();

        init_ledger(&ledger).unwrap();

        let ola: Asset = serde_json::from_str(&ledger.read("0004").unwrap()).unwrap();
        assert_eq!(ola.owner, UNASSIGNED_OWNER);
        assert!(ledger.exists("0100").unwrap());
        assert_eq!(ledger.list_all().unwrap().len(), 6);
    }
}
