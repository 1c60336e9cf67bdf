//! Durable per-(subject, mode) aggregate store.
//!
//! The whole mapping is read on every access and written back as one snapshot
//! on every mutation. The pet flag merge is a logical OR with what is already
//! stored, so a record's `pet_acquired` can only go from `false` to `true`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{KillRecord, Mode, RecordKey, normalize_subject};

/// Full persisted mapping, ordered by key.
pub type RecordMap = BTreeMap<RecordKey, KillRecord>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ─── Backend seam ───────────────────────────────────────────────────

/// Opaque whole-blob durability. Enables in-memory injection for testing.
pub trait StoreBackend: Send {
    /// `Ok(None)` when nothing has been persisted yet.
    fn read(&self) -> Result<Option<String>, StoreError>;
    /// Replace the persisted blob atomically.
    fn write(&mut self, blob: &str) -> Result<(), StoreError>;
    fn remove(&mut self) -> Result<(), StoreError>;
}

/// JSON file on disk, replaced through a sibling temp file + rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "killtrack".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StoreBackend for JsonFileStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, blob: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        std::fs::write(&tmp, blob)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn remove(&mut self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory backend. Useful for testing.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blob: Option<String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with a raw blob (e.g. a corrupt one).
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Some(blob.into()),
            writes: 0,
        }
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl StoreBackend for MemoryStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.blob.clone())
    }

    fn write(&mut self, blob: &str) -> Result<(), StoreError> {
        self.blob = Some(blob.to_string());
        self.writes += 1;
        Ok(())
    }

    fn remove(&mut self) -> Result<(), StoreError> {
        self.blob = None;
        Ok(())
    }
}

// ─── AggregateStore ─────────────────────────────────────────────────

/// Candidate values for one merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub subject_raw: &'a str,
    pub mode: Mode,
    pub kill_count: u64,
    pub pet_acquired: bool,
}

pub struct AggregateStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> AggregateStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Load the full mapping. Missing or corrupt content reads as empty; a
    /// backend read failure is returned so callers never write over data
    /// they could not see.
    pub fn load(&self) -> Result<RecordMap, StoreError> {
        let Some(blob) = self.backend.read()? else {
            return Ok(RecordMap::new());
        };
        if blob.trim().is_empty() {
            return Ok(RecordMap::new());
        }
        match serde_json::from_str(&blob) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!("store content corrupt, using empty mapping: {e}");
                Ok(RecordMap::new())
            }
        }
    }

    /// Lenient view for readers: a failed read shows as an empty mapping.
    fn snapshot(&self) -> RecordMap {
        self.load().unwrap_or_else(|e| {
            tracing::warn!("store read failed: {e}");
            RecordMap::new()
        })
    }

    pub fn get(&self, key: &RecordKey) -> Option<KillRecord> {
        self.snapshot().remove(key)
    }

    /// Whether the stored record for `key` already has its pet.
    pub fn has_pet(&self, key: &RecordKey) -> bool {
        self.get(key).is_some_and(|r| r.pet_acquired)
    }

    /// All records sorted by key.
    pub fn records(&self) -> Vec<KillRecord> {
        self.snapshot().into_values().collect()
    }

    /// Merge a candidate into the stored mapping and persist the whole snapshot.
    ///
    /// The stored pet flag is `existing || candidate`. Returns the record as
    /// written. Nothing is written when the current mapping cannot be read.
    pub fn upsert(
        &mut self,
        candidate: &Candidate<'_>,
        now: DateTime<Utc>,
    ) -> Result<KillRecord, StoreError> {
        let subject = normalize_subject(candidate.subject_raw);
        let key = RecordKey::from_normalized(&subject, candidate.mode);

        let mut map = self.load()?;
        let existing_pet = map.get(&key).is_some_and(|r| r.pet_acquired);
        let record = KillRecord {
            subject,
            mode: candidate.mode,
            kill_count: candidate.kill_count,
            pet_acquired: existing_pet || candidate.pet_acquired,
            updated_at: now,
        };
        map.insert(key, record.clone());
        self.persist(&map)?;
        Ok(record)
    }

    /// Remove all stored records.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.backend.remove()
    }

    fn persist(&mut self, map: &RecordMap) -> Result<(), StoreError> {
        let blob = serde_json::to_string_pretty(map)?;
        self.backend.write(&format!("{blob}\n"))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
