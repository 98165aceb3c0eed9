//! Hash-chain construction and persistence.
//!
//! Each accepted filesystem event becomes one immutable block. A block's
//! hash is SHA-256 over the concatenation of its index, timestamp, the
//! JSON form of its event record, and the previous block's hash, so any
//! retroactive edit to a persisted block is detectable. The whole chain
//! is rewritten to disk after every append.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::events::EventRecord;

/// `previous_hash` of the first block.
pub const GENESIS_HASH: &str = "0";

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("failed to read chain file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chain file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("chain file {path} fails verification at block {index}")]
    Tampered { path: PathBuf, index: u64 },

    #[error("failed to persist chain to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One immutable entry in the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64,
    pub data: EventRecord,
    pub previous_hash: String,
    pub hash: String,
}

/// Owns the in-memory chain and its on-disk JSON file. Nothing else
/// mutates either; one process instance per chain file is assumed.
#[derive(Debug)]
pub struct ChainStore {
    path: PathBuf,
    blocks: Vec<Block>,
}

impl ChainStore {
    /// Loads the chain at `path`, verifying hash linkage over its whole
    /// length. A missing file is an empty chain; a file that exists but
    /// does not parse, or does not verify, is fatal.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ChainError> {
        let path = path.as_ref().to_path_buf();

        let blocks = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| ChainError::Read {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|source| ChainError::Corrupt {
                path: path.clone(),
                source,
            })?
        } else {
            Vec::new()
        };

        let store = Self { path, blocks };
        store.verify()?;
        Ok(store)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a block for `data` stamped with the current wall clock
    /// and rewrites the chain file.
    pub fn append(&mut self, data: EventRecord) -> Result<&Block, ChainError> {
        self.append_at(data, unix_now())
    }

    /// Appends a block with an explicit timestamp. On persist failure
    /// the in-memory chain keeps the new block while the on-disk copy is
    /// stale; callers must treat the error as fatal to the session.
    pub fn append_at(&mut self, data: EventRecord, timestamp: f64) -> Result<&Block, ChainError> {
        let index = self.blocks.len() as u64;
        let previous_hash = self
            .blocks
            .last()
            .map(|b| b.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let hash = block_digest(index, timestamp, &data, &previous_hash);

        self.blocks.push(Block {
            index,
            timestamp,
            data,
            previous_hash,
            hash,
        });
        self.persist()?;

        Ok(&self.blocks[index as usize])
    }

    /// Recomputes every block's digest and checks linkage back to the
    /// genesis sentinel. Returns the first offending block on failure.
    pub fn verify(&self) -> Result<(), ChainError> {
        for (i, block) in self.blocks.iter().enumerate() {
            let expected_prev = if i == 0 {
                GENESIS_HASH
            } else {
                self.blocks[i - 1].hash.as_str()
            };

            let intact = block.index == i as u64
                && block.previous_hash == expected_prev
                && block.hash
                    == block_digest(block.index, block.timestamp, &block.data, &block.previous_hash);
            if !intact {
                return Err(ChainError::Tampered {
                    path: self.path.clone(),
                    index: i as u64,
                });
            }
        }
        Ok(())
    }

    // Full rewrite, not an incremental append. Pretty-printed to match
    // the existing chain file format. Serialization can only fail on a
    // non-finite timestamp, which serde_json refuses to emit.
    fn persist(&self) -> Result<(), ChainError> {
        let json = serde_json::to_string_pretty(&self.blocks).map_err(|source| {
            ChainError::Persist {
                path: self.path.clone(),
                source: source.into(),
            }
        })?;
        fs::write(&self.path, json).map_err(|source| ChainError::Persist {
            path: self.path.clone(),
            source,
        })
    }
}

/// Digest over `(index, timestamp, data, previous_hash)`. The textual
/// concatenation below is a compatibility contract: any change to field
/// order or formatting changes all downstream hashes.
pub fn block_digest(index: u64, timestamp: f64, data: &EventRecord, previous_hash: &str) -> String {
    let record = serde_json::to_string(data).expect("event record serialization cannot fail");
    let value = format!("{index}{timestamp}{record}{previous_hash}");
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Wall-clock seconds since the Unix epoch.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeKind;
    use tempfile::TempDir;

    fn record(event: ChangeKind, file: &str) -> EventRecord {
        EventRecord {
            event,
            file: file.to_string(),
            src: None,
        }
    }

    fn chain_path(dir: &TempDir) -> PathBuf {
        dir.path().join("blockchain.json")
    }

    #[test]
    fn test_missing_file_is_empty_chain() {
        let dir = TempDir::new().unwrap();
        let store = ChainStore::open(chain_path(&dir)).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_genesis_block() {
        let dir = TempDir::new().unwrap();
        let mut store = ChainStore::open(chain_path(&dir)).unwrap();

        let block = store
            .append_at(record(ChangeKind::Created, "note.txt"), 1000.0)
            .unwrap();

        assert_eq!(block.index, 0);
        assert_eq!(block.previous_hash, GENESIS_HASH);
        assert_eq!(block.timestamp, 1000.0);
        assert_eq!(block.data.file, "note.txt");
    }

    #[test]
    fn test_linkage_and_digest() {
        let dir = TempDir::new().unwrap();
        let mut store = ChainStore::open(chain_path(&dir)).unwrap();

        store
            .append_at(record(ChangeKind::Created, "a.txt"), 1000.0)
            .unwrap();
        store
            .append_at(record(ChangeKind::Modified, "a.txt"), 1006.0)
            .unwrap();
        store
            .append_at(record(ChangeKind::Deleted, "a.txt"), 1012.0)
            .unwrap();

        let blocks = store.blocks();
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.index, i as u64);
            assert_eq!(
                block.hash,
                block_digest(block.index, block.timestamp, &block.data, &block.previous_hash)
            );
            if i > 0 {
                assert_eq!(block.previous_hash, blocks[i - 1].hash);
            }
        }
        assert!(store.verify().is_ok());
    }

    #[test]
    fn test_append_does_not_touch_existing_blocks() {
        let dir = TempDir::new().unwrap();
        let mut store = ChainStore::open(chain_path(&dir)).unwrap();

        store
            .append_at(record(ChangeKind::Created, "a.txt"), 1000.0)
            .unwrap();
        let first = store.blocks()[0].clone();

        store
            .append_at(record(ChangeKind::Modified, "a.txt"), 1006.0)
            .unwrap();
        assert_eq!(store.blocks()[0], first);
    }

    #[test]
    fn test_round_trip_persistence() {
        let dir = TempDir::new().unwrap();
        let path = chain_path(&dir);

        let mut store = ChainStore::open(&path).unwrap();
        store
            .append_at(record(ChangeKind::Created, "a.txt"), 1000.0)
            .unwrap();
        store
            .append_at(record(ChangeKind::Modified, "a.txt"), 1006.5)
            .unwrap();
        let written = store.blocks().to_vec();

        let reopened = ChainStore::open(&path).unwrap();
        assert_eq!(reopened.blocks(), written.as_slice());
    }

    #[test]
    fn test_corrupt_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = chain_path(&dir);
        fs::write(&path, "not json at all").unwrap();

        match ChainStore::open(&path) {
            Err(ChainError::Corrupt { .. }) => {}
            other => panic!("expected Corrupt error, got {other:?}"),
        }
    }

    #[test]
    fn test_tampered_data_detected_on_open() {
        let dir = TempDir::new().unwrap();
        let path = chain_path(&dir);

        let mut store = ChainStore::open(&path).unwrap();
        store
            .append_at(record(ChangeKind::Created, "a.txt"), 1000.0)
            .unwrap();
        store
            .append_at(record(ChangeKind::Modified, "a.txt"), 1006.0)
            .unwrap();

        // Rewrite history in block 0 without fixing its hash.
        let raw = fs::read_to_string(&path).unwrap();
        let mut blocks: Vec<Block> = serde_json::from_str(&raw).unwrap();
        blocks[0].data.file = "b.txt".to_string();
        fs::write(&path, serde_json::to_string_pretty(&blocks).unwrap()).unwrap();

        match ChainStore::open(&path) {
            Err(ChainError::Tampered { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected Tampered error, got {other:?}"),
        }
    }

    #[test]
    fn test_broken_linkage_detected() {
        let dir = TempDir::new().unwrap();
        let path = chain_path(&dir);

        let mut store = ChainStore::open(&path).unwrap();
        store
            .append_at(record(ChangeKind::Created, "a.txt"), 1000.0)
            .unwrap();
        store
            .append_at(record(ChangeKind::Modified, "a.txt"), 1006.0)
            .unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let mut blocks: Vec<Block> = serde_json::from_str(&raw).unwrap();
        // Re-hash block 1 against a forged previous_hash; linkage to
        // block 0 is now broken even though the digest is self-consistent.
        blocks[1].previous_hash = "deadbeef".to_string();
        blocks[1].hash = block_digest(1, blocks[1].timestamp, &blocks[1].data, "deadbeef");
        fs::write(&path, serde_json::to_string_pretty(&blocks).unwrap()).unwrap();

        match ChainStore::open(&path) {
            Err(ChainError::Tampered { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected Tampered error, got {other:?}"),
        }
    }

    #[test]
    fn test_digest_recomputes_after_reload() {
        let dir = TempDir::new().unwrap();
        let path = chain_path(&dir);

        let mut store = ChainStore::open(&path).unwrap();
        store
            .append_at(record(ChangeKind::Created, "a.txt"), 1000.125)
            .unwrap();
        store
            .append_at(record(ChangeKind::Modified, "a.txt"), 1006.75)
            .unwrap();

        // Every digest must reproduce from the fields as parsed back
        // from JSON, not just from the in-memory values.
        let reopened = ChainStore::open(&path).unwrap();
        for block in reopened.blocks() {
            assert_eq!(
                block.hash,
                block_digest(block.index, block.timestamp, &block.data, &block.previous_hash)
            );
        }
    }

    #[test]
    fn test_non_finite_timestamp_fails_persist() {
        let dir = TempDir::new().unwrap();
        let mut store = ChainStore::open(chain_path(&dir)).unwrap();

        // serde_json cannot emit NaN; this must surface as an error,
        // not a panic.
        match store.append_at(record(ChangeKind::Created, "a.txt"), f64::NAN) {
            Err(ChainError::Persist { .. }) => {}
            other => panic!("expected Persist error, got {other:?}"),
        }
    }

    #[test]
    fn test_persist_failure_reported() {
        let dir = TempDir::new().unwrap();
        // Target a path whose parent does not exist.
        let path = dir.path().join("missing").join("blockchain.json");

        let mut store = ChainStore {
            path,
            blocks: Vec::new(),
        };
        match store.append_at(record(ChangeKind::Created, "a.txt"), 1000.0) {
            Err(ChainError::Persist { .. }) => {}
            other => panic!("expected Persist error, got {other:?}"),
        }
    }
}
