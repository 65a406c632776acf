//! Repository bootstrap
//!
//! Creates Root, Index, Snapshot and Timestamp at a single `init_time`, wires
//! their cross-references, declares a Root role for every file-backed kind,
//! signs everything and persists it as one batch. All steps before the final
//! write are in memory, so a failure anywhere leaves the destination as it was.
//!
//! Root declares a role for itself and the Snapshot ledger records itself at
//! version 0. Both are bootstrap artifacts of building the set in place.

use crate::envelope;
use crate::error::{Error, Result};
use crate::keys::KeyStore;
use crate::manifest::{Index, Manifest, ManifestSet, Root, Snapshot, Timestamp};
use crate::registry::Registry;
use crate::store::ManifestStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Drives initialization of an empty repository
pub struct Bootstrap<'a> {
    registry: &'a Registry,
    keys: &'a KeyStore,
}

impl<'a> Bootstrap<'a> {
    pub fn new(registry: &'a Registry, keys: &'a KeyStore) -> Self {
        Self { registry, keys }
    }

    /// Build the initial manifest set without signing or writing it
    pub fn build(&self, init_time: DateTime<Utc>) -> Result<ManifestSet> {
        let registry = self.registry;
        let mut set = ManifestSet::new();

        set.insert(Root::new(registry, init_time)?.into())?;
        set.insert(Index::new(registry, init_time)?.into())?;

        // snapshot and timestamp go last; the snapshot ledger includes itself
        set.insert(Snapshot::new(registry, init_time)?.into())?;
        let mut snapshot = set.snapshot()?.clone();
        snapshot.set_versions(registry, set.iter())?;
        set.insert(snapshot.into())?;

        let mut timestamp = Timestamp::new(registry, init_time)?;
        timestamp.set_snapshot(registry, set.snapshot()?)?;
        set.insert(timestamp.into())?;

        let mut root = set.root()?.clone();
        for (kind, info) in registry.iter() {
            if !info.has_file() {
                debug!(kind = %kind, "skipping kind without a file");
                continue;
            }
            match set.get(kind) {
                Some(manifest) => {
                    root.set_role(registry, manifest)?;
                }
                None => return Err(Error::RegistryGap { kind }),
            }
        }
        self.authorize(&mut root)?;
        set.insert(root.into())?;

        debug!(manifests = set.len(), "bootstrap manifests built");
        Ok(set)
    }

    /// Build, sign and persist the initial repository
    pub fn run<S: ManifestStore + ?Sized>(
        &self,
        store: &mut S,
        init_time: DateTime<Utc>,
    ) -> Result<ManifestSet> {
        let set = self.build(init_time)?;
        let files = encode_set(&set, self.keys, self.registry)?;
        store.write_batch(&files)?;
        info!(files = files.len(), init_time = %init_time, "repository initialized");
        Ok(set)
    }

    /// Publish the public half of every available key under its role
    fn authorize(&self, root: &mut Root) -> Result<()> {
        for kind in self.registry.file_kinds() {
            for key in self.keys.keys_for(kind) {
                root.add_key(kind, key.public_info().clone())?;
            }
        }
        Ok(())
    }
}

/// Sign every manifest and pair it with its filename
///
/// Signing keys and thresholds come from the set's own Root.
pub fn encode_set(
    set: &ManifestSet,
    keys: &KeyStore,
    registry: &Registry,
) -> Result<Vec<(String, Vec<u8>)>> {
    encode_manifests(set.iter(), set.root()?, keys, registry)
}

pub(crate) fn encode_manifests<'m, I>(
    manifests: I,
    root: &Root,
    keys: &KeyStore,
    registry: &Registry,
) -> Result<Vec<(String, Vec<u8>)>>
where
    I: IntoIterator<Item = &'m Manifest>,
{
    manifests
        .into_iter()
        .map(|manifest| {
            let filename = manifest.filename(registry)?.to_string();
            let bytes = envelope::sign_to_vec(manifest, keys, root)?;
            Ok((filename, bytes))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{KindInfo, ManifestKind};
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_build_versions() {
        let registry = Registry::standard();
        let keys = KeyStore::generate(registry).unwrap();
        let set = Bootstrap::new(registry, &keys).build(t0()).unwrap();

        assert_eq!(set.root().unwrap().base.version, 1);
        assert_eq!(set.index().unwrap().base.version, 1);
        assert_eq!(set.timestamp().unwrap().base.version, 1);
        assert_eq!(set.snapshot().unwrap().base.version, 0);
    }

    #[test]
    fn test_snapshot_ledger_has_self_entry() {
        let registry = Registry::standard();
        let keys = KeyStore::new();
        let set = Bootstrap::new(registry, &keys).build(t0()).unwrap();

        let snapshot = set.snapshot().unwrap();
        assert_eq!(snapshot.meta.len(), 3);
        assert_eq!(snapshot.version_of("snapshot.json"), Some(0));
        assert_eq!(snapshot.version_of("timestamp.json"), None);
    }

    #[test]
    fn test_roles_carry_keys() {
        let registry = Registry::standard();
        let keys = KeyStore::generate(registry).unwrap();
        let set = Bootstrap::new(registry, &keys).build(t0()).unwrap();

        let root = set.root().unwrap();
        assert_eq!(root.roles.len(), 4);
        for kind in registry.file_kinds() {
            let role = root.role(kind).unwrap();
            let key = &keys.keys_for(kind)[0];
            assert!(role.keys.contains_key(key.key_id()));
        }
    }

    #[test]
    fn test_run_without_keys_writes_nothing() {
        let registry = Registry::standard();
        let keys = KeyStore::new();
        let mut store = MemoryStore::new();

        let err = Bootstrap::new(registry, &keys)
            .run(&mut store, t0())
            .unwrap_err();
        assert!(matches!(err, Error::MissingKey { .. }));
        assert!(store.files().is_empty());
    }

    #[test]
    fn test_gap_is_reported_before_signing() {
        let registry = Registry::standard()
            .clone()
            .with(
                ManifestKind::Component,
                KindInfo::new("component.json", Duration::days(30), 1),
            )
            .unwrap();
        let keys = KeyStore::generate(&registry).unwrap();
        let err = Bootstrap::new(&registry, &keys).build(t0()).unwrap_err();
        assert!(matches!(
            err,
            Error::RegistryGap {
                kind: ManifestKind::Component
            }
        ));
    }
}
