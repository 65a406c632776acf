//! Republishing a bootstrapped repository
//!
//! Published manifests are never edited in place. An update clones the
//! published set into a draft, edits one Root or Index payload, bumps its
//! version, rebuilds the Snapshot ledger from scratch and reissues the
//! Timestamp against the new Snapshot. Only the changed files are written.
//!
//! The ledger never records Timestamp: Timestamp is reissued after the
//! Snapshot it points at, so an entry for it would always be one behind.

use crate::bootstrap::encode_manifests;
use crate::error::{Error, Result};
use crate::keys::KeyStore;
use crate::manifest::{Manifest, ManifestSet};
use crate::registry::{ManifestKind, Registry};
use crate::store::ManifestStore;
use crate::verify::{check_version, verify_set};
use chrono::{DateTime, Utc};
use tracing::info;

/// Draft set produced by [`Updater::stage`]
#[derive(Debug, Clone, PartialEq)]
pub struct StagedUpdate {
    pub set: ManifestSet,
    /// Kinds whose files must be rewritten
    pub changed: Vec<ManifestKind>,
}

pub struct Updater<'a> {
    registry: &'a Registry,
    keys: &'a KeyStore,
}

impl<'a> Updater<'a> {
    pub fn new(registry: &'a Registry, keys: &'a KeyStore) -> Self {
        Self { registry, keys }
    }

    /// Apply `edit` to the `kind` payload of a draft copy of `published`
    pub fn stage<F>(
        &self,
        published: &ManifestSet,
        kind: ManifestKind,
        now: DateTime<Utc>,
        edit: F,
    ) -> Result<StagedUpdate>
    where
        F: FnOnce(&mut Manifest) -> Result<()>,
    {
        let registry = self.registry;
        if !matches!(kind, ManifestKind::Root | ManifestKind::Index) {
            return Err(Error::validation(format!(
                "Manifest '{}' is reissued automatically and cannot be edited",
                kind
            )));
        }

        let mut set = published.clone();
        let mut target = set.get(kind).ok_or(Error::RegistryGap { kind })?.clone();
        let next_version = bump(kind, target.version())?;

        edit(&mut target)?;
        if target.kind() != kind {
            return Err(Error::validation(format!(
                "Edit turned the {} draft into a {} manifest",
                kind,
                target.kind()
            )));
        }
        target.check_kind()?;
        target.base_mut().version = next_version;
        target.base_mut().renew(registry, now)?;
        set.insert(target)?;

        let mut snapshot = set.snapshot()?.clone();
        snapshot.base.renew(registry, now)?;
        snapshot.set_versions(
            registry,
            set.iter().filter(|m| m.kind() != ManifestKind::Timestamp),
        )?;
        set.insert(snapshot.into())?;

        let mut timestamp = set.timestamp()?.clone();
        timestamp.base.version = bump(ManifestKind::Timestamp, timestamp.base.version)?;
        timestamp.base.renew(registry, now)?;
        timestamp.set_snapshot(registry, set.snapshot()?)?;
        set.insert(timestamp.into())?;

        Ok(StagedUpdate {
            set,
            changed: vec![kind, ManifestKind::Snapshot, ManifestKind::Timestamp],
        })
    }

    /// Sign and write the changed manifests of a staged update
    ///
    /// Every changed versioned manifest must be strictly newer than its
    /// trusted counterpart. Signers and thresholds are those of the staged
    /// Root, which is the Root readers will verify against.
    pub fn publish<S: ManifestStore + ?Sized>(
        &self,
        store: &mut S,
        trusted: &ManifestSet,
        staged: &StagedUpdate,
    ) -> Result<()> {
        let mut changed = Vec::with_capacity(staged.changed.len());
        for &kind in &staged.changed {
            let candidate = staged.set.get(kind).ok_or(Error::RegistryGap { kind })?;
            check_version(kind, trusted.get(kind).map(Manifest::version), candidate.version())?;
            changed.push(candidate);
        }
        verify_set(&staged.set, self.registry)?;

        let files = encode_manifests(changed, staged.set.root()?, self.keys, self.registry)?;
        store.write_batch(&files)?;
        info!(files = files.len(), "repository updated");
        Ok(())
    }
}

fn bump(kind: ManifestKind, version: u64) -> Result<u64> {
    version
        .checked_add(1)
        .ok_or_else(|| Error::validation(format!("Version of '{}' overflows", kind)))
}
