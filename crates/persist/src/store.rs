//! File-backed recording store.
//!
//! Layout inside the store directory:
//! ```text
//! store.meta.json          - metadata and schema versions
//! recordings/
//!   000001.rec.cbor.zst    - CBOR+zstd compressed recording files
//! integrity/
//!   manifest.json          - hash chain manifest
//! ```
//!
//! Reads fail closed: a file missing from the manifest, a broken chain link
//! or a hash mismatch is an error, never a silent fallback.

use crate::recording::RecordingFile;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Current schema versions.
const STORE_SCHEMA_VERSION: u32 = 1;
const RECORDING_SCHEMA_VERSION: u32 = 1;

const META_FILE: &str = "store.meta.json";
const RECORDINGS_DIR: &str = "recordings";

/// Errors from file-backed persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed for {filename}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        filename: String,
        expected: String,
        actual: String,
    },
    #[error("{0} is not listed in the integrity manifest")]
    Untracked(String),
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("no recording with index {0}")]
    NotFound(u32),
}

/// Metadata stored in store.meta.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub store_schema_version: u32,
    pub recording_schema_version: u32,
    pub recording_count: u32,
}

/// A single entry in the integrity manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub sha256: String,
    pub prev_hash: Option<String>,
}

/// Integrity manifest tracking all file hashes in a chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub entries: Vec<ManifestEntry>,
}

impl IntegrityManifest {
    fn entry(&self, filename: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.filename == filename)
    }
}

/// Wrapper written inside every record so a file carries its own schema.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecording {
    schema_version: u32,
    recording: RecordingFile,
}

/// Directory of recordings with schema versioning and integrity checking.
#[derive(Debug)]
pub struct RecordingStore {
    root: PathBuf,
    meta: StoreMeta,
    manifest: IntegrityManifest,
}

impl RecordingStore {
    /// Open or create a recording store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join(RECORDINGS_DIR))?;
        std::fs::create_dir_all(root.join("integrity"))?;

        let meta_path = root.join(META_FILE);
        let manifest_path = root.join("integrity").join("manifest.json");

        let (meta, manifest) = if meta_path.exists() {
            let meta: StoreMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
            if meta.store_schema_version != STORE_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    file_version: meta.store_schema_version,
                    expected_version: STORE_SCHEMA_VERSION,
                });
            }
            if meta.recording_schema_version != RECORDING_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    file_version: meta.recording_schema_version,
                    expected_version: RECORDING_SCHEMA_VERSION,
                });
            }
            let manifest: IntegrityManifest = if manifest_path.exists() {
                serde_json::from_reader(std::fs::File::open(&manifest_path)?)?
            } else {
                IntegrityManifest::default()
            };
            (meta, manifest)
        } else {
            let meta = StoreMeta {
                store_schema_version: STORE_SCHEMA_VERSION,
                recording_schema_version: RECORDING_SCHEMA_VERSION,
                recording_count: 0,
            };
            let manifest = IntegrityManifest::default();
            serde_json::to_writer_pretty(std::fs::File::create(&meta_path)?, &meta)?;
            serde_json::to_writer_pretty(std::fs::File::create(&manifest_path)?, &manifest)?;
            (meta, manifest)
        };

        tracing::debug!(root = %root.display(), recordings = meta.recording_count, "recording store opened");
        Ok(Self { root, meta, manifest })
    }

    /// Append a recording and return its 1-based index.
    pub fn save(&mut self, recording: &RecordingFile) -> Result<u32, StoreError> {
        let index = self.meta.recording_count + 1;
        let filename = file_name(index);
        let path = self.root.join(RECORDINGS_DIR).join(&filename);

        let stored = StoredRecording {
            schema_version: RECORDING_SCHEMA_VERSION,
            recording: recording.clone(),
        };
        let compressed = zstd_compress(&cbor_serialize(&stored)?)?;

        let hash = sha256_hex(&compressed);
        let prev_hash = self.manifest.entries.last().map(|e| e.sha256.clone());

        std::fs::write(&path, &compressed)?;

        self.manifest.entries.push(ManifestEntry {
            filename,
            sha256: hash,
            prev_hash,
        });
        self.meta.recording_count = index;

        self.save_meta()?;
        self.save_manifest()?;
        tracing::info!(
            index,
            level = %recording.level_id,
            player_type = recording.player_type,
            ticks = recording.len(),
            "recording saved"
        );
        Ok(index)
    }

    /// Load one recording after checking it against the manifest.
    pub fn load(&self, index: u32) -> Result<RecordingFile, StoreError> {
        if index == 0 || index > self.meta.recording_count {
            return Err(StoreError::NotFound(index));
        }
        let filename = file_name(index);
        let compressed = std::fs::read(self.root.join(RECORDINGS_DIR).join(&filename))?;
        self.verify_file_hash(&filename, &compressed)?;

        let stored: StoredRecording = cbor_deserialize(&zstd_decompress(&compressed)?)?;
        if stored.schema_version != RECORDING_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                file_version: stored.schema_version,
                expected_version: RECORDING_SCHEMA_VERSION,
            });
        }
        Ok(stored.recording)
    }

    /// Every recording in save order.
    pub fn load_all(&self) -> Result<Vec<RecordingFile>, StoreError> {
        (1..=self.meta.recording_count).map(|i| self.load(i)).collect()
    }

    /// Most recent recording of `player_type` on `level_id`.
    pub fn latest_for(&self, level_id: &str, player_type: u32) -> Result<Option<RecordingFile>, StoreError> {
        for index in (1..=self.meta.recording_count).rev() {
            let file = self.load(index)?;
            if file.level_id == level_id && file.player_type == player_type {
                return Ok(Some(file));
            }
        }
        Ok(None)
    }

    /// Verify all integrity hashes in the manifest.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        let mut prev_hash: Option<String> = None;
        for entry in &self.manifest.entries {
            if entry.prev_hash != prev_hash {
                return Err(StoreError::IntegrityMismatch {
                    filename: entry.filename.clone(),
                    expected: prev_hash.unwrap_or_else(|| "None".into()),
                    actual: entry.prev_hash.clone().unwrap_or_else(|| "None".into()),
                });
            }

            let data = std::fs::read(self.root.join(RECORDINGS_DIR).join(&entry.filename))?;
            let actual = sha256_hex(&data);
            if actual != entry.sha256 {
                return Err(StoreError::IntegrityMismatch {
                    filename: entry.filename.clone(),
                    expected: entry.sha256.clone(),
                    actual,
                });
            }

            prev_hash = Some(entry.sha256.clone());
        }
        if self.manifest.entries.len() != self.meta.recording_count as usize {
            return Err(StoreError::Untracked(file_name(self.meta.recording_count)));
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.meta.recording_count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.meta.recording_count == 0
    }

    fn verify_file_hash(&self, filename: &str, data: &[u8]) -> Result<(), StoreError> {
        let entry = self
            .manifest
            .entry(filename)
            .ok_or_else(|| StoreError::Untracked(filename.to_string()))?;
        let actual = sha256_hex(data);
        if entry.sha256 != actual {
            tracing::warn!(filename, "recording hash mismatch");
            return Err(StoreError::IntegrityMismatch {
                filename: filename.to_string(),
                expected: entry.sha256.clone(),
                actual,
            });
        }
        Ok(())
    }

    fn save_meta(&self) -> Result<(), StoreError> {
        let path = self.root.join(META_FILE);
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.meta)?;
        Ok(())
    }

    fn save_manifest(&self) -> Result<(), StoreError> {
        let path = self.root.join("integrity").join("manifest.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.manifest)?;
        Ok(())
    }
}

fn file_name(index: u32) -> String {
    format!("{index:06}.rec.cbor.zst")
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(data).map_err(|e| StoreError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
