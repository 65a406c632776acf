/*!
 * Keystone Keygen Command
 *
 * Generates threshold-many Ed25519 signing keys for every kind that has a
 * file and writes them to the key directory.
 */

use crate::cli_style::{print_field, print_success, section_header, Icons};
use anyhow::{bail, Context, Result};
use keystone_core_manifest::{KeyStore, Registry};
use std::fs;
use std::path::Path;
use tracing::info;

/// Generate and save a fresh key set
pub fn run_keygen(registry: &Registry, keys_dir: &Path, force: bool) -> Result<KeyStore> {
    if !force && has_key_files(keys_dir)? {
        bail!(
            "Key directory {} already holds keys (use --force to add a new set)",
            keys_dir.display()
        );
    }

    let keys = KeyStore::generate(registry).context("Failed to generate signing keys")?;
    keys.save_dir(keys_dir)
        .with_context(|| format!("Failed to save keys to {}", keys_dir.display()))?;

    section_header(&format!("{} Signing Keys", Icons::KEY));
    for kind in registry.file_kinds() {
        for key in keys.keys_for(kind) {
            print_field(kind.as_str(), key.key_id());
        }
    }
    println!();
    print_success(&format!("Keys written to {}", keys_dir.display()));
    info!(dir = %keys_dir.display(), "generated signing keys");

    Ok(keys)
}

fn has_key_files(dir: &Path) -> Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    let found = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("json"));
    Ok(found)
}
