//! Index manifest: component catalog
//!
//! Created empty at bootstrap; populated by the publishing workflow.

use super::SignedBase;
use crate::error::Result;
use crate::keys::KeyInfo;
use crate::registry::{ManifestKind, Registry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
    #[serde(default)]
    pub keys: BTreeMap<String, KeyInfo>,
    pub threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentItem {
    #[serde(default)]
    pub yanked: bool,
    pub owner: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    #[serde(flatten)]
    pub base: SignedBase,
    #[serde(default)]
    pub owners: BTreeMap<String, Owner>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentItem>,
    #[serde(default)]
    pub default_components: Vec<String>,
}

impl Index {
    pub fn new(registry: &Registry, created: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            base: SignedBase::new(registry, ManifestKind::Index, created, 1)?,
            owners: BTreeMap::new(),
            components: BTreeMap::new(),
            default_components: Vec::new(),
        })
    }
}
