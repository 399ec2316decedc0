// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # bikechain Protocol: Core Library
//!
//! The shared foundation under the bikechain ledger: the constants that
//! define the stored record format, and the world-state store the ledger
//! reads from and writes to.
//!
//! ## Architecture
//!
//! - **config**: Record tag, owner sentinel, field limits, default ports.
//! - **storage**: The `StateStore` trait plus in-memory and sled backends.
//!
//! Business rules (what an asset is, when a write is allowed) live one layer
//! up in `bikechain-contracts`. Nothing in this crate knows what a bike is
//! beyond the tag string.

pub mod config;
pub mod storage;
