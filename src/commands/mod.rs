/*!
 * Keystone subcommands
 *
 * Each command is a plain function taking resolved paths and a registry so
 * that it can be driven from tests without a terminal.
 */

pub mod bump;
pub mod init;
pub mod keygen;
pub mod verify;

use anyhow::{Context, Result};
use keystone_core_manifest::KeyStore;
use std::path::Path;

use crate::error::KeystoneError;

/// Load the signing keys under `keys_dir`, failing if there are none
pub(crate) fn load_keys(keys_dir: &Path) -> Result<KeyStore> {
    if !keys_dir.is_dir() {
        return Err(KeystoneError::KeysNotFound(keys_dir.to_path_buf()).into());
    }
    let keys = KeyStore::load_dir(keys_dir)
        .with_context(|| format!("Failed to load keys from {}", keys_dir.display()))?;
    if keys.is_empty() {
        return Err(KeystoneError::KeysNotFound(keys_dir.to_path_buf()).into());
    }
    Ok(keys)
}
