//! Conformance tests for the world-state backends.
//!
//! Every backend has to behave the same way from the ledger's point of view:
//! point reads and writes, range-scan ordering and bounds, and guarded writes.
//! Each check below runs against both `MemoryStore` and a temporary
//! `SledStore`.

use std::sync::Arc;
use std::thread;

use bikechain_protocol::config::OPEN_BOUND;
use bikechain_protocol::storage::{MemoryStore, SledStore, StateStore, StoreError};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Runs `check` once per backend, labelling failures with the backend name.
fn for_each_backend(check: impl Fn(&str, Arc<dyn StateStore>)) {
    check("memory", Arc::new(MemoryStore::new()));
    check(
        "sled",
        Arc::new(SledStore::open_temporary().expect("temp sled store")),
    );
}

fn keys(store: &dyn StateStore, start: &str, end: &str) -> Vec<String> {
    store
        .range_scan(start, end)
        .expect("scan should open")
        .map(|item| item.expect("scan item").0)
        .collect()
}

// ---------------------------------------------------------------------------
// Point Operations
// ---------------------------------------------------------------------------

#[test]
fn put_get_delete() {
    for_each_backend(|name, store| {
        assert!(store.get("0001").unwrap().is_none(), "{name}");

        store.put("0001", b"{\"ID\":\"0001\"}").unwrap();
        assert_eq!(
            store.get("0001").unwrap().as_deref(),
            Some(&b"{\"ID\":\"0001\"}"[..]),
            "{name}"
        );

        store.delete("0001").unwrap();
        assert!(store.get("0001").unwrap().is_none(), "{name}");
        store.delete("0001").unwrap();
    });
}

#[test]
fn empty_values_are_stored_as_written() {
    for_each_backend(|name, store| {
        store.put("0001", b"").unwrap();
        assert_eq!(store.get("0001").unwrap(), Some(Vec::new()), "{name}");
    });
}

// ---------------------------------------------------------------------------
// Range Scans
// ---------------------------------------------------------------------------

#[test]
fn full_scan_is_sorted_and_includes_every_kind() {
    for_each_backend(|name, store| {
        for key in ["0003", "owner:alice", "0001", "0010", "0002"] {
            store.put(key, b"x").unwrap();
        }
        assert_eq!(
            keys(store.as_ref(), OPEN_BOUND, OPEN_BOUND),
            vec!["0001", "0002", "0003", "0010", "owner:alice"],
            "{name}"
        );
    });
}

#[test]
fn scan_bounds_are_half_open() {
    for_each_backend(|name, store| {
        for key in ["0001", "0002", "0003", "0004", "0005"] {
            store.put(key, b"x").unwrap();
        }
        assert_eq!(keys(store.as_ref(), "0002", "0004"), vec!["0002", "0003"], "{name}");
        assert_eq!(keys(store.as_ref(), "0004", ""), vec!["0004", "0005"], "{name}");
        assert_eq!(keys(store.as_ref(), "", "0002"), vec!["0001"], "{name}");
        assert!(keys(store.as_ref(), "0003", "0003").is_empty(), "{name}");
    });
}

#[test]
fn scan_of_empty_store_is_empty() {
    for_each_backend(|name, store| {
        assert!(store.range_scan("", "").unwrap().next().is_none(), "{name}");
    });
}

#[test]
fn inverted_scan_is_rejected() {
    for_each_backend(|name, store| {
        let err = match store.range_scan("0005", "0001") {
            Ok(_) => panic!("{name}: inverted range accepted"),
            Err(e) => e,
        };
        assert!(matches!(err, StoreError::InvalidRange { .. }), "{name}");
    });
}

// ---------------------------------------------------------------------------
// Guarded Writes
// ---------------------------------------------------------------------------

#[test]
fn every_backend_offers_guarded_writes() {
    for_each_backend(|name, store| {
        assert!(store.guarded().is_some(), "{name}");
    });
}

#[test]
fn guarded_writes_only_touch_present_keys() {
    for_each_backend(|name, store| {
        let guarded = store.guarded().unwrap();

        assert!(!guarded.put_if_present("0001", b"v1").unwrap(), "{name}");
        assert!(store.get("0001").unwrap().is_none(), "{name}");

        store.put("0001", b"v1").unwrap();
        assert!(guarded.put_if_present("0001", b"v2").unwrap(), "{name}");
        assert_eq!(store.get("0001").unwrap(), Some(b"v2".to_vec()), "{name}");

        assert!(guarded.delete_if_present("0001").unwrap(), "{name}");
        assert!(!guarded.delete_if_present("0001").unwrap(), "{name}");
        assert!(store.get("0001").unwrap().is_none(), "{name}");
    });
}

#[test]
fn guarded_puts_never_resurrect_a_deleted_key() {
    for_each_backend(|name, store| {
        store.put("0001", b"v0").unwrap();

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for n in 0..50 {
                        let value = format!("w{i}-{n}");
                        let guarded = store.guarded().unwrap();
                        guarded.put_if_present("0001", value.as_bytes()).unwrap();
                    }
                })
            })
            .collect();

        let removed = store.guarded().unwrap().delete_if_present("0001").unwrap();
        for writer in writers {
            writer.join().expect("writer thread should not panic");
        }

        assert!(removed, "{name}");
        // Once the delete has landed, nothing can bring the key back.
        assert!(store.get("0001").unwrap().is_none(), "{name}");
    });
}
