/*!
 * Integration tests for the keystone commands
 *
 * Drives keygen, init, verify and bump through their library entry points
 * with configuration loaded from TOML, without an interactive terminal.
 */

use chrono::{DateTime, TimeZone, Utc};
use keystone::commands::{
    bump::run_bump,
    init::{run_init, InitOptions},
    keygen::run_keygen,
    verify::run_verify,
};
use keystone::error::{KeystoneError, EXIT_FATAL, EXIT_INTEGRITY};
use keystone::manifest::ManifestKind;
use keystone::KeystoneConfig;
use std::fs;
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
}

fn write_config(dir: &TempDir, extra: &str) -> KeystoneConfig {
    let path = dir.path().join("keystone.toml");
    let body = format!(
        "repo_dir = {:?}\nkeys_dir = {:?}\n{}",
        dir.path().join("repo").display().to_string(),
        dir.path().join("keys").display().to_string(),
        extra
    );
    fs::write(&path, body).unwrap();
    KeystoneConfig::load(Some(&path)).unwrap()
}

fn init_options(config: &KeystoneConfig) -> InitOptions {
    InitOptions {
        repo_dir: config.repo_dir.clone(),
        keys_dir: config.keys_dir.clone(),
        force: false,
        assume_yes: false,
    }
}

#[test]
fn test_keygen_init_verify() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "");
    let registry = config.registry().unwrap();

    run_keygen(&registry, &config.keys_dir, false).unwrap();
    run_init(&registry, &init_options(&config), t0()).unwrap();
    let rows = run_verify(&registry, &config.repo_dir, t0()).unwrap();

    let files: Vec<&str> = rows.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(
        files,
        vec!["root.json", "index.json", "snapshot.json", "timestamp.json"]
    );
}

#[test]
fn test_threshold_override_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "[roles.index]\nthreshold = 2\n");
    let registry = config.registry().unwrap();

    let keys = run_keygen(&registry, &config.keys_dir, false).unwrap();
    assert_eq!(keys.keys_for(ManifestKind::Index).len(), 2);

    run_init(&registry, &init_options(&config), t0()).unwrap();
    let rows = run_verify(&registry, &config.repo_dir, t0()).unwrap();
    let index = rows.iter().find(|r| r.kind == "index").unwrap();
    assert_eq!(index.signatures, 2);
}

#[test]
fn test_expiry_override_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "[roles.timestamp]\nexpire_days = 7\n");
    let registry = config.registry().unwrap();

    run_keygen(&registry, &config.keys_dir, false).unwrap();
    let set = run_init(&registry, &init_options(&config), t0())
        .unwrap()
        .unwrap();
    assert_eq!(set.timestamp().unwrap().base.expires, "2020-01-08T00:00:00Z");
}

#[test]
fn test_bump_then_verify() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "");
    let registry = config.registry().unwrap();
    run_keygen(&registry, &config.keys_dir, false).unwrap();
    run_init(&registry, &init_options(&config), t0()).unwrap();

    let later = Utc.with_ymd_and_hms(2020, 2, 1, 0, 0, 0).unwrap();
    let expired: KeystoneError = run_verify(&registry, &config.repo_dir, later)
        .unwrap_err()
        .into();
    assert_eq!(expired.exit_code(), EXIT_INTEGRITY);

    run_bump(
        &registry,
        &config.repo_dir,
        &config.keys_dir,
        ManifestKind::Index,
        later,
    )
    .unwrap();
    let rows = run_verify(&registry, &config.repo_dir, later).unwrap();
    assert_eq!(rows.iter().find(|r| r.kind == "timestamp").unwrap().version, 2);
}

#[test]
fn test_init_without_keys_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "");
    let registry = config.registry().unwrap();

    let err: KeystoneError = run_init(&registry, &init_options(&config), t0())
        .unwrap_err()
        .into();
    assert!(matches!(err, KeystoneError::KeysNotFound(_)));
    assert_eq!(err.exit_code(), EXIT_FATAL);
}
