//! Ed25519 keys and the per-kind key store
//!
//! Public keys are published in Root as [`KeyInfo`]; a key id is the hex
//! SHA-256 of the canonical encoding of that `KeyInfo`. Private keys live in
//! the [`KeyStore`] as PKCS#8 documents and never enter a manifest.

use crate::canonical;
use crate::error::{Error, Result};
use crate::registry::{ManifestKind, Registry};
use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair, UnparsedPublicKey, ED25519};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const KEY_TYPE_ED25519: &str = "ed25519";

/// Public key as declared in Root roles and Index owners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub keytype: String,
    pub scheme: String,
    pub keyval: BTreeMap<String, String>,
}

impl KeyInfo {
    /// Wrap raw Ed25519 public key bytes
    pub fn ed25519(public: &[u8]) -> Self {
        let mut keyval = BTreeMap::new();
        keyval.insert("public".to_string(), hex::encode(public));
        Self {
            keytype: KEY_TYPE_ED25519.to_string(),
            scheme: KEY_TYPE_ED25519.to_string(),
            keyval,
        }
    }

    /// Content-derived key id
    pub fn key_id(&self) -> Result<String> {
        Ok(canonical::sha256_hex(&canonical::encode(self)?))
    }

    /// Check an Ed25519 signature over `message`
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool> {
        if self.keytype != KEY_TYPE_ED25519 || self.scheme != KEY_TYPE_ED25519 {
            return Err(Error::InvalidKey(format!(
                "unsupported key type '{}'",
                self.keytype
            )));
        }
        let public = self
            .keyval
            .get("public")
            .ok_or_else(|| Error::InvalidKey("missing public key value".to_string()))?;
        let public = hex::decode(public).map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok(UnparsedPublicKey::new(&ED25519, public)
            .verify(message, signature)
            .is_ok())
    }
}

/// Private Ed25519 key with its published form
#[derive(Debug)]
pub struct SigningKey {
    pair: Ed25519KeyPair,
    pkcs8: Vec<u8>,
    info: KeyInfo,
    id: String,
}

impl SigningKey {
    /// Generate a fresh key from the system RNG
    pub fn generate() -> Result<Self> {
        let rng = SystemRandom::new();
        let document = Ed25519KeyPair::generate_pkcs8(&rng)
            .map_err(|_| Error::InvalidKey("key generation failed".to_string()))?;
        Self::from_pkcs8(document.as_ref())
    }

    /// Load a key from its PKCS#8 v2 document
    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<Self> {
        let pair =
            Ed25519KeyPair::from_pkcs8(pkcs8).map_err(|e| Error::InvalidKey(e.to_string()))?;
        let info = KeyInfo::ed25519(pair.public_key().as_ref());
        let id = info.key_id()?;
        Ok(Self {
            pair,
            pkcs8: pkcs8.to_vec(),
            info,
            id,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.id
    }

    pub fn public_info(&self) -> &KeyInfo {
        &self.info
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.pair.sign(message).as_ref().to_vec()
    }
}

/// On-disk form of a private key
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    #[serde(rename = "_type")]
    kind: ManifestKind,
    key_id: String,
    pkcs8: String,
}

/// Signing keys grouped by the manifest kind they sign
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: BTreeMap<ManifestKind, Vec<SigningKey>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate threshold-many keys for every file-backed kind
    pub fn generate(registry: &Registry) -> Result<Self> {
        let mut store = Self::new();
        for (kind, info) in registry.iter() {
            if !info.has_file() {
                continue;
            }
            for _ in 0..info.threshold {
                store.insert(kind, SigningKey::generate()?);
            }
        }
        Ok(store)
    }

    /// Add a key for a kind; a key already present is not added twice
    pub fn insert(&mut self, kind: ManifestKind, key: SigningKey) {
        let keys = self.keys.entry(kind).or_default();
        if keys.iter().all(|k| k.key_id() != key.key_id()) {
            keys.push(key);
        }
    }

    /// Keys available for a kind, in insertion order
    pub fn keys_for(&self, kind: ManifestKind) -> &[SigningKey] {
        self.keys.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.keys.values().all(Vec::is_empty)
    }

    /// Write every key as `<kind>-<key id prefix>.json` under `dir`
    pub fn save_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        for (kind, keys) in &self.keys {
            for key in keys {
                let file = KeyFile {
                    kind: *kind,
                    key_id: key.key_id().to_string(),
                    pkcs8: hex::encode(&key.pkcs8),
                };
                let path = dir.join(format!("{}-{}.json", kind, &key.key_id()[..16]));
                fs::write(&path, serde_json::to_string_pretty(&file)?)?;
                restrict_permissions(&path)?;
                debug!(kind = %kind, key_id = key.key_id(), path = %path.display(), "saved key");
            }
        }
        Ok(())
    }

    /// Load every `*.json` key file under `dir`
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut store = Self::new();
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        for path in paths {
            let file: KeyFile = serde_json::from_slice(&fs::read(&path)?)?;
            let pkcs8 = hex::decode(&file.pkcs8)
                .map_err(|e| Error::InvalidKey(format!("{}: {}", path.display(), e)))?;
            let key = SigningKey::from_pkcs8(&pkcs8)?;
            if key.key_id() != file.key_id {
                return Err(Error::InvalidKey(format!(
                    "{}: key id does not match key material",
                    path.display()
                )));
            }
            store.insert(file.kind, key);
        }
        Ok(store)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
