/*!
 * Keystone Verify Command
 *
 * Reads every published manifest, checks it against the envelope schema,
 * verifies signatures against Root, expiry, and the Snapshot/Timestamp
 * cross-references.
 */

use crate::cli_style::{manifest_table, print_field, print_success, section_header, Icons, ManifestRow};
use crate::error::KeystoneError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keystone_core_manifest::{
    envelope, validate_envelope_bytes, verify_repository, DirStore, Envelope, Manifest,
    ManifestKind, ManifestStore, Registry,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Verify the repository at `repo_dir` as of `now`
pub fn run_verify(registry: &Registry, repo_dir: &Path, now: DateTime<Utc>) -> Result<Vec<ManifestRow>> {
    let store = DirStore::new(repo_dir);
    if !store.is_initialized(registry) {
        return Err(KeystoneError::RepositoryNotFound(repo_dir.to_path_buf()).into());
    }

    let envelopes = read_validated(&store, registry)?;
    let set = verify_repository(&envelopes, registry, now)
        .with_context(|| format!("Verification of {} failed", repo_dir.display()))?;
    info!(repo = %repo_dir.display(), manifests = set.len(), "repository verified");

    rows_for(
        envelopes.values().map(|e| (&e.signed, e.signatures.len())),
        registry,
    )
}

/// Print the outcome of [`run_verify`]
pub fn print_report(repo_dir: &Path, rows: &[ManifestRow], json: bool) -> Result<()> {
    if json {
        for row in rows {
            println!("{}", serde_json::to_string(row)?);
        }
        return Ok(());
    }

    section_header(&format!("{} Verifying Repository", Icons::SHIELD));
    print_field("Directory", repo_dir.display());
    println!();
    println!("{}", manifest_table(rows));
    println!();
    print_success(&format!("Verification complete: {} manifests trusted", rows.len()));
    Ok(())
}

/// Schema-check and decode the envelope of every file-backed kind
fn read_validated<S: ManifestStore>(
    store: &S,
    registry: &Registry,
) -> Result<BTreeMap<ManifestKind, Envelope>> {
    let mut envelopes = BTreeMap::new();
    for kind in registry.file_kinds() {
        let filename = registry.filename(kind)?;
        let bytes = store
            .read(filename)?
            .ok_or_else(|| keystone_core_manifest::Error::manifest_not_found(filename))?;
        validate_envelope_bytes(&bytes).with_context(|| format!("{} is malformed", filename))?;
        let envelope = envelope::decode(&bytes)?;
        debug!(file = filename, "envelope decoded");
        envelopes.insert(kind, envelope);
    }
    Ok(envelopes)
}

/// Table rows for manifests paired with their signature count
pub(crate) fn rows_for<'m, I>(manifests: I, registry: &Registry) -> Result<Vec<ManifestRow>>
where
    I: IntoIterator<Item = (&'m Manifest, usize)>,
{
    manifests
        .into_iter()
        .map(|(manifest, signatures)| {
            Ok(ManifestRow {
                filename: manifest.filename(registry)?.to_string(),
                kind: manifest.kind().to_string(),
                version: manifest.version(),
                expires: manifest.base().expires.clone(),
                signatures,
            })
        })
        .collect()
}
