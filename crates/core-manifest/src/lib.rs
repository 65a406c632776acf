//! Core manifest data structures for Keystone
//!
//! This crate provides the signed metadata that makes a Keystone repository
//! tamper-evident. Every file is an envelope holding a signed payload and
//! the signatures over it.
//!
//! # Key Concepts
//!
//! - **Registry**: Static table of manifest kinds with their filename, expiry and signature threshold
//! - **Root**: Trust anchor declaring which keys may sign each kind
//! - **Index**: Package index of owners and components
//! - **Snapshot**: Ledger of the version of every manifest in the repository
//! - **Timestamp**: Short-lived pointer to the current Snapshot by hash and length
//! - **Bootstrap**: Builds, signs and persists the initial set in one batch
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use keystone_core_manifest::{Bootstrap, DirStore, KeyStore, Registry};
//!
//! let registry = Registry::standard();
//! let keys = KeyStore::generate(registry)?;
//! let mut store = DirStore::new("/srv/repo");
//! Bootstrap::new(registry, &keys).run(&mut store, Utc::now())?;
//! # Ok::<(), keystone_core_manifest::Error>(())
//! ```

pub mod bootstrap;
pub mod canonical;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod manifest;
pub mod registry;
pub mod store;
pub mod update;
pub mod validate;
pub mod verify;

// Re-export main types for convenience
pub use bootstrap::{encode_set, Bootstrap};
pub use envelope::{Envelope, Signature};
pub use error::{Error, Result};
pub use keys::{KeyInfo, KeyStore, SigningKey};
pub use manifest::{
    ComponentItem, FileHash, FileVersion, Index, Manifest, ManifestSet, Owner, Role, Root,
    SignedBase, Snapshot, Timestamp,
};
pub use registry::{KindInfo, ManifestKind, Registry};
pub use store::{read_envelopes, read_set, DirStore, ManifestStore, MemoryStore};
pub use update::{StagedUpdate, Updater};
pub use validate::{validate_envelope, validate_envelope_bytes, validate_manifest};
pub use verify::{check_expiry, check_version, verify_repository, verify_set, verify_signatures};

/// Metadata format version written into every payload
pub const CURRENT_SPEC_VERSION: &str = "0.1.0";

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_spec_version_is_stamped() {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let set = Bootstrap::new(Registry::standard(), &KeyStore::new())
            .build(t0)
            .unwrap();
        for manifest in set.iter() {
            assert_eq!(manifest.base().spec_version, CURRENT_SPEC_VERSION);
        }
    }
}
