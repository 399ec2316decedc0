//! # Protocol Configuration & Constants
//!
//! Every fixed value the ledger relies on lives here. The record tag and the
//! owner sentinel are part of the stored format: records written by older
//! deployments carry them, so changing either one orphans existing data.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The version string reported by nodes and the CLI.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Record Format
// ---------------------------------------------------------------------------

/// Discriminator stored with every asset record (`docType` on the wire).
///
/// The keyspace is shared with any other record kinds a deployment chooses to
/// write, so the tag is how a reader tells a bike apart from everything else.
pub const DOC_TYPE: &str = "bike";

/// Owner value meaning "nobody owns this yet". A literal string, not JSON null.
pub const UNASSIGNED_OWNER: &str = "null";

/// Maximum length of an asset ID in bytes.
///
/// IDs are store keys, so they show up in every range scan and log line.
pub const MAX_ID_LENGTH: usize = 64;

/// Maximum length in bytes of any free-form text field (name, category, owner).
pub const MAX_FIELD_LENGTH: usize = 256;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Name of the sled tree holding the world state.
pub const WORLD_STATE_TREE: &str = "world_state";

/// Range-scan bound meaning "no bound". Passing it as both start and end key
/// scans the whole keyspace.
pub const OPEN_BOUND: &str = "";

// ---------------------------------------------------------------------------
// Network Parameters
// ---------------------------------------------------------------------------

/// Default HTTP API port.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9842;
