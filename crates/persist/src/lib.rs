//! Persistence for recorded runs.
//!
//! - [`RecordingFile`]: one character's input trace, tagged with its level.
//! - [`RecordingStore`]: directory of CBOR+zstd recordings behind a sha256
//!   hash-chain manifest.
//! - [`Trace`]: per-tick world trajectory used to compare runs.
//!
//! # Invariants
//! - Recordings are append-only; indices are stable once assigned.
//! - Every read is checked against the manifest and fails closed.

pub mod recording;
pub mod store;
pub mod trace;

pub use recording::RecordingFile;
pub use store::{IntegrityManifest, ManifestEntry, RecordingStore, StoreError, StoreMeta};
pub use trace::{Divergence, Trace, TraceFrame};
