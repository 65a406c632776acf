/*!
 * Keystone Init Command
 *
 * Bootstraps an empty repository directory:
 * 1. Loads the signing keys
 * 2. Refuses to touch an initialized repository unless forced and confirmed
 * 3. Builds, signs and writes Root, Index, Snapshot and Timestamp as one batch
 */

use crate::cli_style::{manifest_table, print_info, print_success, section_header, Icons};
use crate::commands::{load_keys, verify::rows_for};
use crate::error::KeystoneError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use keystone_core_manifest::{Bootstrap, DirStore, ManifestSet, Registry};
use std::path::PathBuf;
use tracing::{info, warn};

/// Resolved options for `keystone init`
#[derive(Debug, Clone)]
pub struct InitOptions {
    pub repo_dir: PathBuf,
    pub keys_dir: PathBuf,
    /// Replace an existing repository
    pub force: bool,
    /// Skip the overwrite confirmation
    pub assume_yes: bool,
}

/// Run the bootstrap; returns `None` if the user declined to overwrite
pub fn run_init(
    registry: &Registry,
    options: &InitOptions,
    init_time: DateTime<Utc>,
) -> Result<Option<ManifestSet>> {
    let keys = load_keys(&options.keys_dir)?;
    let mut store = DirStore::new(&options.repo_dir);

    if store.is_initialized(registry) {
        if !options.force {
            return Err(KeystoneError::AlreadyInitialized(options.repo_dir.clone()).into());
        }
        warn!(repo = %options.repo_dir.display(), "overwriting existing repository");
        if !options.assume_yes
            && !Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt("Existing repository found. Overwrite?")
                .default(false)
                .interact()?
        {
            println!("\n{}", style("Repository unchanged.").cyan());
            return Ok(None);
        }
    }

    let set = Bootstrap::new(registry, &keys)
        .run(&mut store, init_time)
        .with_context(|| format!("Failed to initialize {}", options.repo_dir.display()))?;
    info!(repo = %options.repo_dir.display(), "bootstrap complete");

    print_summary(registry, &set, options)?;
    Ok(Some(set))
}

fn print_summary(registry: &Registry, set: &ManifestSet, options: &InitOptions) -> Result<()> {
    section_header(&format!("{} Repository Initialized", Icons::MANIFEST));
    let rows = rows_for(set.iter().map(|m| (m, 1)), registry)?;
    println!("{}", manifest_table(&rows));
    println!();
    print_success(&format!(
        "{} manifests written to {}",
        rows.len(),
        options.repo_dir.display()
    ));
    print_info("Run 'keystone verify' to check the published repository");
    Ok(())
}
