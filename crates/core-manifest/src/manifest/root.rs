//! Root manifest: the trust anchor

use super::{Manifest, SignedBase};
use crate::error::{Error, Result};
use crate::keys::KeyInfo;
use crate::registry::{ManifestKind, Registry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Authority over one manifest kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub url: String,
    pub threshold: u32,
    #[serde(default)]
    pub keys: BTreeMap<String, KeyInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Root {
    #[serde(flatten)]
    pub base: SignedBase,
    /// Keyed by kind name
    #[serde(default)]
    pub roles: BTreeMap<String, Role>,
}

impl Root {
    /// Fresh Root at version 1 with no roles
    pub fn new(registry: &Registry, created: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            base: SignedBase::new(registry, ManifestKind::Root, created, 1)?,
            roles: BTreeMap::new(),
        })
    }

    /// Declare (or redeclare) the role for `target`'s kind with an empty key set
    pub fn set_role(&mut self, registry: &Registry, target: &Manifest) -> Result<&mut Self> {
        let kind = target.kind();
        let role = Role {
            url: format!("/{}", registry.filename(kind)?),
            threshold: registry.threshold(kind)?,
            keys: BTreeMap::new(),
        };
        self.roles.insert(kind.as_str().to_string(), role);
        Ok(self)
    }

    pub fn role(&self, kind: ManifestKind) -> Option<&Role> {
        self.roles.get(kind.as_str())
    }

    /// Authorize a public key for an already declared role
    pub fn add_key(&mut self, kind: ManifestKind, key: KeyInfo) -> Result<&mut Self> {
        let id = key.key_id()?;
        let role = self
            .roles
            .get_mut(kind.as_str())
            .ok_or(Error::MissingKey { kind })?;
        role.keys.insert(id, key);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SigningKey;
    use crate::manifest::Index;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_new_root() {
        let root = Root::new(Registry::standard(), t0()).unwrap();
        assert_eq!(root.base.version, 1);
        assert_eq!(root.base.kind, ManifestKind::Root);
        assert!(root.roles.is_empty());
    }

    #[test]
    fn test_set_role_uses_registry() {
        let registry = Registry::standard();
        let mut root = Root::new(registry, t0()).unwrap();
        let index: Manifest = Index::new(registry, t0()).unwrap().into();
        root.set_role(registry, &index).unwrap();

        let role = root.role(ManifestKind::Index).unwrap();
        assert_eq!(role.url, "/index.json");
        assert_eq!(role.threshold, 1);
        assert!(role.keys.is_empty());
    }

    #[test]
    fn test_set_role_overwrites() {
        let registry = Registry::standard();
        let mut root = Root::new(registry, t0()).unwrap();
        let index: Manifest = Index::new(registry, t0()).unwrap().into();
        let key = SigningKey::generate().unwrap();

        root.set_role(registry, &index).unwrap();
        root.add_key(ManifestKind::Index, key.public_info().clone())
            .unwrap();
        root.set_role(registry, &index).unwrap();

        assert_eq!(root.roles.len(), 1);
        assert!(root.role(ManifestKind::Index).unwrap().keys.is_empty());
    }

    #[test]
    fn test_add_key_requires_role() {
        let mut root = Root::new(Registry::standard(), t0()).unwrap();
        let key = SigningKey::generate().unwrap();
        let err = root
            .add_key(ManifestKind::Timestamp, key.public_info().clone())
            .unwrap_err();
        assert!(matches!(err, Error::MissingKey { .. }));
    }

    #[test]
    fn test_roles_default_when_absent() {
        let json = r#"{"_type":"root","spec_version":"0.1.0","expires":"2021-01-01T00:00:00Z","version":3}"#;
        let root: Root = serde_json::from_str(json).unwrap();
        assert!(root.roles.is_empty());
        assert_eq!(root.base.version, 3);
    }
}
