//! Timestamp manifest: freshness pointer bound to the current snapshot

use super::{SignedBase, Snapshot};
use crate::canonical;
use crate::error::Result;
use crate::registry::{ManifestKind, Registry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHash {
    /// Algorithm name → hex digest
    pub hashes: BTreeMap<String, String>,
    pub length: u64,
}

impl FileHash {
    /// Digest of a payload's canonical encoding
    pub fn of<T: Serialize + ?Sized>(payload: &T) -> Result<Self> {
        let (bytes, digest) = canonical::digest(payload)?;
        let mut hashes = BTreeMap::new();
        hashes.insert(canonical::SHA256.to_string(), hex::encode(digest));
        Ok(Self {
            hashes,
            length: bytes.len() as u64,
        })
    }

    pub fn sha256(&self) -> Option<&str> {
        self.hashes.get(canonical::SHA256).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamp {
    #[serde(flatten)]
    pub base: SignedBase,
    /// Keyed by the snapshot filename
    #[serde(default)]
    pub meta: BTreeMap<String, FileHash>,
}

impl Timestamp {
    pub fn new(registry: &Registry, created: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            base: SignedBase::new(registry, ManifestKind::Timestamp, created, 1)?,
            meta: BTreeMap::new(),
        })
    }

    /// Bind to `snapshot` by digest and length of its canonical encoding
    ///
    /// `meta` is only touched once the digest has been computed.
    pub fn set_snapshot(&mut self, registry: &Registry, snapshot: &Snapshot) -> Result<&mut Self> {
        let filename = registry.filename(ManifestKind::Snapshot)?.to_string();
        let hash = FileHash::of(snapshot)?;
        self.meta.insert(filename, hash);
        Ok(self)
    }

    /// Recorded binding for the snapshot
    pub fn snapshot_hash(&self, registry: &Registry) -> Result<Option<&FileHash>> {
        Ok(self.meta.get(registry.filename(ManifestKind::Snapshot)?))
    }
}
