/*!
 * Keystone Bump Command
 *
 * Republishes Root or Index with its version raised by one. Snapshot is
 * rebuilt and Timestamp reissued alongside it; the other files are left as
 * they are.
 */

use crate::cli_style::{manifest_table, print_success, section_header, Icons, ManifestRow};
use crate::commands::{load_keys, verify::rows_for};
use crate::error::KeystoneError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keystone_core_manifest::{
    read_envelopes, verify_set, verify_signatures, DirStore, Manifest, ManifestKind, ManifestSet,
    Registry, StagedUpdate, Updater,
};
use std::path::Path;
use tracing::info;

/// Republish `kind` from the repository at `repo_dir`
///
/// The published set must carry valid signatures and consistent
/// cross-references. Expiry is not checked: refreshing it is what a bump is for.
pub fn run_bump(
    registry: &Registry,
    repo_dir: &Path,
    keys_dir: &Path,
    kind: ManifestKind,
    now: DateTime<Utc>,
) -> Result<StagedUpdate> {
    let keys = load_keys(keys_dir)?;
    let mut store = DirStore::new(repo_dir);
    if !store.is_initialized(registry) {
        return Err(KeystoneError::RepositoryNotFound(repo_dir.to_path_buf()).into());
    }

    let published = load_trusted(&store, registry)
        .with_context(|| format!("Published repository at {} is not trusted", repo_dir.display()))?;

    let updater = Updater::new(registry, &keys);
    let staged = updater.stage(&published, kind, now, |_| Ok(()))?;
    updater
        .publish(&mut store, &published, &staged)
        .with_context(|| format!("Failed to publish {}", kind))?;
    info!(kind = %kind, repo = %repo_dir.display(), "manifest republished");

    section_header(&format!("{} Repository Updated", Icons::MANIFEST));
    let rows = written_rows(&store, registry, &staged.changed)?;
    println!("{}", manifest_table(&rows));
    println!();
    print_success(&format!("{} manifests rewritten", rows.len()));

    Ok(staged)
}

/// Table rows for the rewritten files, as they now sit in the store
fn written_rows(
    store: &DirStore,
    registry: &Registry,
    changed: &[ManifestKind],
) -> Result<Vec<ManifestRow>> {
    let written = read_envelopes(store, registry)?;
    let rows = changed
        .iter()
        .filter_map(|k| written.get(k))
        .map(|e| (&e.signed, e.signatures.len()));
    rows_for(rows, registry)
}

fn load_trusted(store: &DirStore, registry: &Registry) -> Result<ManifestSet> {
    let envelopes = read_envelopes(store, registry)?;
    let root = match envelopes.get(&ManifestKind::Root).map(|e| &e.signed) {
        Some(Manifest::Root(root)) => root,
        _ => {
            return Err(keystone_core_manifest::Error::RegistryGap {
                kind: ManifestKind::Root,
            }
            .into())
        }
    };
    for envelope in envelopes.values() {
        verify_signatures(envelope, root)?;
    }
    let set: ManifestSet = envelopes.into_values().map(|e| e.signed).collect();
    verify_set(&set, registry)?;
    Ok(set)
}
