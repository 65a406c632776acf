//! Snapshot manifest: version ledger of every manifest in the repository
//!
//! The snapshot itself is unversioned and stays at version 0.

use super::{Manifest, SignedBase};
use crate::error::Result;
use crate::registry::{ManifestKind, Registry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileVersion {
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(flatten)]
    pub base: SignedBase,
    /// Keyed by filename
    #[serde(default)]
    pub meta: BTreeMap<String, FileVersion>,
}

impl Snapshot {
    pub fn new(registry: &Registry, created: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            base: SignedBase::new(registry, ManifestKind::Snapshot, created, 0)?,
            meta: BTreeMap::new(),
        })
    }

    /// Rebuild the ledger from scratch over `manifests`
    ///
    /// Entries for manifests not in `manifests` are dropped. On error the
    /// ledger is left as it was.
    pub fn set_versions<'a, I>(&mut self, registry: &Registry, manifests: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = &'a Manifest>,
    {
        let mut meta = BTreeMap::new();
        for manifest in manifests {
            meta.insert(
                manifest.filename(registry)?.to_string(),
                FileVersion {
                    version: manifest.version(),
                },
            );
        }
        self.meta = meta;
        Ok(self)
    }

    /// Recorded version for a filename
    pub fn version_of(&self, filename: &str) -> Option<u64> {
        self.meta.get(filename).map(|v| v.version)
    }
}
