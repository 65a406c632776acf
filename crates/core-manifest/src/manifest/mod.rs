//! Manifest payloads
//!
//! Every payload carries a [`SignedBase`] flattened into its JSON object.
//! [`Manifest`] is the closed set of payloads that have a file of their own;
//! [`ManifestSet`] holds at most one payload per kind.

pub mod index;
pub mod root;
pub mod snapshot;
pub mod timestamp;

use crate::error::{Error, Result};
use crate::registry::{parse_time, ManifestKind, Registry};
use crate::CURRENT_SPEC_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub use index::{ComponentItem, Index, Owner};
pub use root::{Role, Root};
pub use snapshot::{FileVersion, Snapshot};
pub use timestamp::{FileHash, Timestamp};

/// Fields shared by every payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBase {
    #[serde(rename = "_type")]
    pub kind: ManifestKind,
    pub spec_version: String,
    /// RFC 3339, UTC
    pub expires: String,
    pub version: u64,
}

impl SignedBase {
    /// Base for a payload created at `created`
    pub fn new(
        registry: &Registry,
        kind: ManifestKind,
        created: DateTime<Utc>,
        version: u64,
    ) -> Result<Self> {
        Ok(Self {
            kind,
            spec_version: CURRENT_SPEC_VERSION.to_string(),
            expires: registry.expires_at(kind, created)?,
            version,
        })
    }

    pub fn expires_at(&self) -> Result<DateTime<Utc>> {
        parse_time(&self.expires)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.expires_at()? <= now)
    }

    /// Recompute `expires` from a new issue time
    pub fn renew(&mut self, registry: &Registry, issued: DateTime<Utc>) -> Result<()> {
        self.expires = registry.expires_at(self.kind, issued)?;
        Ok(())
    }
}

/// A payload of one of the file-backed kinds
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Manifest {
    Root(Root),
    Index(Index),
    Snapshot(Snapshot),
    Timestamp(Timestamp),
}

impl Manifest {
    pub fn base(&self) -> &SignedBase {
        match self {
            Manifest::Root(m) => &m.base,
            Manifest::Index(m) => &m.base,
            Manifest::Snapshot(m) => &m.base,
            Manifest::Timestamp(m) => &m.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut SignedBase {
        match self {
            Manifest::Root(m) => &mut m.base,
            Manifest::Index(m) => &mut m.base,
            Manifest::Snapshot(m) => &mut m.base,
            Manifest::Timestamp(m) => &mut m.base,
        }
    }

    /// Kind implied by the variant
    pub fn kind(&self) -> ManifestKind {
        match self {
            Manifest::Root(_) => ManifestKind::Root,
            Manifest::Index(_) => ManifestKind::Index,
            Manifest::Snapshot(_) => ManifestKind::Snapshot,
            Manifest::Timestamp(_) => ManifestKind::Timestamp,
        }
    }

    pub fn version(&self) -> u64 {
        self.base().version
    }

    pub fn filename<'r>(&self, registry: &'r Registry) -> Result<&'r str> {
        registry.filename(self.kind())
    }

    /// `_type` must agree with the variant
    pub fn check_kind(&self) -> Result<()> {
        if self.base().kind != self.kind() {
            return Err(Error::validation(format!(
                "Payload declares _type '{}' but is a {} manifest",
                self.base().kind,
                self.kind()
            )));
        }
        Ok(())
    }

    /// Decode a payload, dispatching on `_type`
    pub fn from_value(value: Value) -> Result<Self> {
        let ty = value
            .get("_type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::validation("Payload is missing _type"))?;
        let manifest = match ty.parse::<ManifestKind>()? {
            ManifestKind::Root => Manifest::Root(serde_json::from_value(value)?),
            ManifestKind::Index => Manifest::Index(serde_json::from_value(value)?),
            ManifestKind::Snapshot => Manifest::Snapshot(serde_json::from_value(value)?),
            ManifestKind::Timestamp => Manifest::Timestamp(serde_json::from_value(value)?),
            ManifestKind::Component => {
                return Err(Error::UnsupportedKind(ManifestKind::Component.to_string()))
            }
        };
        Ok(manifest)
    }
}

impl<'de> Deserialize<'de> for Manifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Manifest::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl From<Root> for Manifest {
    fn from(m: Root) -> Self {
        Manifest::Root(m)
    }
}

impl From<Index> for Manifest {
    fn from(m: Index) -> Self {
        Manifest::Index(m)
    }
}

impl From<Snapshot> for Manifest {
    fn from(m: Snapshot) -> Self {
        Manifest::Snapshot(m)
    }
}

impl From<Timestamp> for Manifest {
    fn from(m: Timestamp) -> Self {
        Manifest::Timestamp(m)
    }
}

/// At most one payload per kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestSet {
    manifests: BTreeMap<ManifestKind, Manifest>,
}

impl ManifestSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the payload for its kind
    pub fn insert(&mut self, manifest: Manifest) -> Result<Option<Manifest>> {
        manifest.check_kind()?;
        Ok(self.manifests.insert(manifest.kind(), manifest))
    }

    pub fn get(&self, kind: ManifestKind) -> Option<&Manifest> {
        self.manifests.get(&kind)
    }

    pub fn contains(&self, kind: ManifestKind) -> bool {
        self.manifests.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// Payloads in kind order
    pub fn iter(&self) -> impl Iterator<Item = &Manifest> {
        self.manifests.values()
    }

    pub fn root(&self) -> Result<&Root> {
        match self.get(ManifestKind::Root) {
            Some(Manifest::Root(m)) => Ok(m),
            _ => Err(Error::RegistryGap {
                kind: ManifestKind::Root,
            }),
        }
    }

    pub fn index(&self) -> Result<&Index> {
        match self.get(ManifestKind::Index) {
            Some(Manifest::Index(m)) => Ok(m),
            _ => Err(Error::RegistryGap {
                kind: ManifestKind::Index,
            }),
        }
    }

    pub fn snapshot(&self) -> Result<&Snapshot> {
        match self.get(ManifestKind::Snapshot) {
            Some(Manifest::Snapshot(m)) => Ok(m),
            _ => Err(Error::RegistryGap {
                kind: ManifestKind::Snapshot,
            }),
        }
    }

    pub fn timestamp(&self) -> Result<&Timestamp> {
        match self.get(ManifestKind::Timestamp) {
            Some(Manifest::Timestamp(m)) => Ok(m),
            _ => Err(Error::RegistryGap {
                kind: ManifestKind::Timestamp,
            }),
        }
    }
}

impl FromIterator<Manifest> for ManifestSet {
    fn from_iter<I: IntoIterator<Item = Manifest>>(iter: I) -> Self {
        Self {
            manifests: iter.into_iter().map(|m| (m.kind(), m)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_signed_base_fields() {
        let base = SignedBase::new(Registry::standard(), ManifestKind::Index, t0(), 1).unwrap();
        assert_eq!(base.spec_version, CURRENT_SPEC_VERSION);
        assert_eq!(base.expires, "2020-12-31T00:00:00Z");
        assert!(!base.is_expired(t0()).unwrap());
        assert!(base
            .is_expired(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap())
            .unwrap());
    }

    #[test]
    fn test_type_field_on_wire() {
        let root = Root::new(Registry::standard(), t0()).unwrap();
        let value = serde_json::to_value(Manifest::from(root)).unwrap();
        assert_eq!(value["_type"], "root");
        assert_eq!(value["version"], 1);
    }

    #[test]
    fn test_from_value_dispatches_on_type() {
        let snapshot = Snapshot::new(Registry::standard(), t0()).unwrap();
        let value = serde_json::to_value(&snapshot).unwrap();
        let decoded = Manifest::from_value(value).unwrap();
        assert_eq!(decoded, Manifest::Snapshot(snapshot));
    }

    #[test]
    fn test_from_value_rejects_component() {
        let value = serde_json::json!({"_type": "component"});
        assert!(matches!(
            Manifest::from_value(value),
            Err(Error::UnsupportedKind(_))
        ));
    }

    #[test]
    fn test_insert_rejects_mismatched_type() {
        let mut root = Root::new(Registry::standard(), t0()).unwrap();
        root.base.kind = ManifestKind::Index;
        let mut set = ManifestSet::new();
        assert!(set.insert(root.into()).is_err());
        assert!(set.is_empty());
    }

    #[test]
    fn test_typed_accessor_reports_gap() {
        let set = ManifestSet::new();
        assert!(matches!(
            set.timestamp(),
            Err(Error::RegistryGap {
                kind: ManifestKind::Timestamp
            })
        ));
    }
}
