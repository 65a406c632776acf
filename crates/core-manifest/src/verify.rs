//! Verification primitives
//!
//! Checks a client needs before trusting a manifest: threshold signatures
//! from the keys Root declares, expiry, version monotonicity, and the
//! Snapshot/Timestamp cross-references.

use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::manifest::{FileHash, Manifest, ManifestSet, Root};
use crate::registry::{ManifestKind, Registry};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Count valid signatures from the role's keys and enforce its threshold
///
/// Signatures are checked over the payload as it was read, not as it
/// re-serializes. Signatures from undeclared keys, malformed signatures and
/// repeated key ids are ignored rather than rejected.
pub fn verify_signatures(envelope: &Envelope, root: &Root) -> Result<u32> {
    let kind = envelope.signed.kind();
    let role = root.role(kind).ok_or(Error::MissingKey { kind })?;
    let digest = envelope.signed_digest()?;

    let mut counted = BTreeSet::new();
    for signature in &envelope.signatures {
        if counted.contains(signature.key_id.as_str()) {
            continue;
        }
        let Some(key) = role.keys.get(&signature.key_id) else {
            debug!(kind = %kind, key_id = %signature.key_id, "signature from undeclared key");
            continue;
        };
        let Ok(sig) = hex::decode(&signature.sig) else {
            warn!(kind = %kind, key_id = %signature.key_id, "malformed signature");
            continue;
        };
        if key.verify(&digest, &sig)? {
            counted.insert(signature.key_id.as_str());
        }
    }

    let found = counted.len() as u32;
    if found < role.threshold {
        return Err(Error::ThresholdNotMet {
            kind,
            required: role.threshold,
            found,
        });
    }
    Ok(found)
}

/// Reject a manifest whose `expires` is not after `now`
pub fn check_expiry(manifest: &Manifest, now: DateTime<Utc>) -> Result<()> {
    if manifest.base().is_expired(now)? {
        return Err(Error::Expired {
            kind: manifest.kind(),
            expires: manifest.base().expires.clone(),
        });
    }
    Ok(())
}

/// Candidate must be strictly newer than the trusted version
///
/// Snapshot is unversioned and always passes.
pub fn check_version(kind: ManifestKind, trusted: Option<u64>, candidate: u64) -> Result<()> {
    if kind == ManifestKind::Snapshot {
        return Ok(());
    }
    match trusted {
        Some(trusted) if candidate <= trusted => Err(Error::VersionRollback {
            kind,
            trusted,
            found: candidate,
        }),
        _ => Ok(()),
    }
}

/// Snapshot ledger and Timestamp binding agree with the set's contents
pub fn verify_set(set: &ManifestSet, registry: &Registry) -> Result<()> {
    let snapshot = set.snapshot()?;
    let timestamp = set.timestamp()?;

    for manifest in set.iter() {
        if manifest.kind() == ManifestKind::Timestamp {
            continue;
        }
        let filename = manifest.filename(registry)?;
        let recorded = snapshot.version_of(filename).ok_or_else(|| {
            Error::validation(format!("Snapshot has no entry for {}", filename))
        })?;
        if recorded != manifest.version() {
            return Err(Error::SnapshotVersionMismatch {
                filename: filename.to_string(),
                recorded,
                actual: manifest.version(),
            });
        }
    }

    let filename = registry.filename(ManifestKind::Snapshot)?;
    let recorded = timestamp.snapshot_hash(registry)?.ok_or_else(|| {
        Error::validation(format!("Timestamp has no entry for {}", filename))
    })?;
    let actual = FileHash::of(snapshot)?;
    if recorded != &actual {
        return Err(Error::DigestMismatch {
            filename: filename.to_string(),
            expected: describe(recorded),
            found: describe(&actual),
        });
    }
    Ok(())
}

/// Full check of a repository read back from storage
///
/// Root is verified against its own key set first, then every other
/// envelope against Root, then the cross-references.
pub fn verify_repository(
    envelopes: &BTreeMap<ManifestKind, Envelope>,
    registry: &Registry,
    now: DateTime<Utc>,
) -> Result<ManifestSet> {
    let root = match envelopes.get(&ManifestKind::Root).map(|e| &e.signed) {
        Some(Manifest::Root(root)) => root,
        _ => {
            return Err(Error::RegistryGap {
                kind: ManifestKind::Root,
            })
        }
    };

    for kind in registry.file_kinds() {
        let envelope = envelopes.get(&kind).ok_or(Error::RegistryGap { kind })?;
        let found = verify_signatures(envelope, root)?;
        check_expiry(&envelope.signed, now)?;
        debug!(kind = %kind, signatures = found, "manifest verified");
    }

    let set: ManifestSet = envelopes.values().map(|e| e.signed.clone()).collect();
    verify_set(&set, registry)?;
    Ok(set)
}

fn describe(hash: &FileHash) -> String {
    format!("{}:{}", hash.sha256().unwrap_or("-"), hash.length)
}
