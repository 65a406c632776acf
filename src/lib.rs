/*!
 * Keystone - tamper-evident signed manifest repository
 *
 * Command-line front end over `keystone-core-manifest`:
 * - Ed25519 key generation per manifest role
 * - Atomic bootstrap of Root, Index, Snapshot and Timestamp
 * - Verification of signatures, expiry and cross-references
 * - Version-bumped republishing of Root or Index
 *
 * Version: 0.1.0
 * Author: Shane Wall <shaneawall@gmail.com>
 */

pub mod cli_style;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{KeystoneConfig, LogLevel, RoleOverride};
pub use error::{KeystoneError, Result};
pub use keystone_core_manifest as manifest;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
