//! Signed envelopes and their wire format
//!
//! ```text
//! { "signatures": [{"key_id": ..., "sig": ...}], "signed": { "_type": ..., ... } }
//! ```
//!
//! Each signature is Ed25519 over the SHA-256 digest of the canonical
//! encoding of `signed`. Signatures are hex-encoded.

use crate::canonical;
use crate::error::{Error, Result};
use crate::keys::KeyStore;
use crate::manifest::{Manifest, Root};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub key_id: String,
    pub sig: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Manifest> {
    pub signatures: Vec<Signature>,
    pub signed: T,
    /// `signed` exactly as read from storage
    #[serde(skip)]
    received: Option<Value>,
}

impl<T> Envelope<T> {
    pub fn new(signatures: Vec<Signature>, signed: T) -> Self {
        Self {
            signatures,
            signed,
            received: None,
        }
    }
}

impl Envelope {
    /// Digest the signatures must cover
    ///
    /// A decoded envelope is checked against the payload as it was stored,
    /// so fields the typed payload drops or defaults still count.
    pub fn signed_digest(&self) -> Result<[u8; 32]> {
        let (_, digest) = match &self.received {
            Some(value) => canonical::digest(value)?,
            None => canonical::digest(&self.signed)?,
        };
        Ok(digest)
    }
}

/// Decode an envelope written by [`sign_and_write`]
pub fn decode(bytes: &[u8]) -> Result<Envelope> {
    let raw: Envelope<Value> = serde_json::from_slice(bytes)?;
    let signed = Manifest::from_value(raw.signed.clone())?;
    signed.check_kind()?;
    Ok(Envelope {
        signatures: raw.signatures,
        signed,
        received: Some(raw.signed),
    })
}

/// Sign `manifest` with the keys `root` authorizes for its kind, up to the
/// role's threshold
///
/// Keys in the store that the role does not list are never used.
pub fn sign(manifest: &Manifest, keys: &KeyStore, root: &Root) -> Result<Vec<Signature>> {
    let kind = manifest.kind();
    let role = root.role(kind).ok_or(Error::MissingKey { kind })?;
    let (_, digest) = canonical::digest(manifest)?;

    let authorized: Vec<_> = keys
        .keys_for(kind)
        .iter()
        .filter(|key| role.keys.contains_key(key.key_id()))
        .collect();
    if authorized.is_empty() {
        return Err(Error::MissingKey { kind });
    }
    if authorized.len() < role.threshold as usize {
        return Err(Error::ThresholdNotMet {
            kind,
            required: role.threshold,
            found: authorized.len() as u32,
        });
    }

    let signatures: Vec<Signature> = authorized
        .into_iter()
        .take(role.threshold as usize)
        .map(|key| Signature {
            key_id: key.key_id().to_string(),
            sig: hex::encode(key.sign(&digest)),
        })
        .collect();
    debug!(kind = %kind, signatures = signatures.len(), "signed manifest");
    Ok(signatures)
}

/// Sign `manifest` and write its envelope to `out`
pub fn sign_and_write<W: Write>(
    out: &mut W,
    manifest: &Manifest,
    keys: &KeyStore,
    root: &Root,
) -> Result<()> {
    let signatures = sign(manifest, keys, root)?;
    let envelope = Envelope::new(signatures, manifest);
    serde_json::to_writer_pretty(&mut *out, &envelope)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// Convenience wrapper producing the encoded bytes
pub fn sign_to_vec(manifest: &Manifest, keys: &KeyStore, root: &Root) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    sign_and_write(&mut buf, manifest, keys, root)?;
    Ok(buf)
}
