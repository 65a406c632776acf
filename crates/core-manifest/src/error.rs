//! Error types for manifest operations

use crate::registry::ManifestKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during manifest operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Payload could not be canonically encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A kind the registry requires was never produced
    #[error("Manifest '{kind}' not initialized properly")]
    RegistryGap { kind: ManifestKind },

    /// Kind has no registry entry at all
    #[error("Manifest kind '{kind}' is not registered")]
    Unregistered { kind: ManifestKind },

    /// Kind is registered as a placeholder without a file of its own
    #[error("Manifest kind '{kind}' has no filename")]
    NoFilename { kind: ManifestKind },

    /// Kind cannot carry a payload
    #[error("Unsupported manifest kind: {0}")]
    UnsupportedKind(String),

    /// Batch write failed
    #[error("Failed to persist {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another writer holds the destination
    #[error(
        "Repository at {path} is locked by another writer; if none is running, remove the stale .keystone.lock there"
    )]
    Locked { path: PathBuf },

    /// No signing key or no declared role for a kind
    #[error("No key available for manifest '{kind}'")]
    MissingKey { kind: ManifestKind },

    /// Not enough valid signatures
    #[error("Manifest '{kind}' requires {required} signature(s), found {found}")]
    ThresholdNotMet {
        kind: ManifestKind,
        required: u32,
        found: u32,
    },

    /// Manifest is past its expiry
    #[error("Manifest '{kind}' expired at {expires}")]
    Expired { kind: ManifestKind, expires: String },

    /// Candidate version does not move forward
    #[error("Manifest '{kind}' version {found} is not newer than trusted version {trusted}")]
    VersionRollback {
        kind: ManifestKind,
        trusted: u64,
        found: u64,
    },

    /// Timestamp binding does not match the snapshot
    #[error("Digest mismatch for {filename}: expected {expected}, found {found}")]
    DigestMismatch {
        filename: String,
        expected: String,
        found: String,
    },

    /// Snapshot ledger disagrees with a manifest version
    #[error("Snapshot records version {recorded} for {filename}, manifest has {actual}")]
    SnapshotVersionMismatch {
        filename: String,
        recorded: u64,
        actual: u64,
    },

    /// Key material could not be parsed
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Expiry string is not RFC 3339
    #[error("Invalid timestamp: {value}")]
    InvalidTimestamp { value: String },

    /// Manifest validation failed
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Manifest file not found
    #[error("Manifest not found: {path}")]
    ManifestNotFound { path: PathBuf },
}

impl Error {
    /// Create a validation error with a message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Create a persistence error for a path
    pub fn persistence<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Error::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Create a manifest not found error
    pub fn manifest_not_found<P: Into<PathBuf>>(path: P) -> Self {
        Error::ManifestNotFound { path: path.into() }
    }

    /// Whether the error means the repository content cannot be trusted
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Error::ThresholdNotMet { .. }
                | Error::Expired { .. }
                | Error::VersionRollback { .. }
                | Error::DigestMismatch { .. }
                | Error::SnapshotVersionMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_gap_names_kind() {
        let err = Error::RegistryGap {
            kind: ManifestKind::Component,
        };
        assert_eq!(err.to_string(), "Manifest 'component' not initialized properly");
    }

    #[test]
    fn test_threshold_message() {
        let err = Error::ThresholdNotMet {
            kind: ManifestKind::Root,
            required: 2,
            found: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("'root'"));
        assert!(msg.contains("requires 2"));
        assert!(msg.contains("found 1"));
        assert!(err.is_integrity());
    }

    #[test]
    fn test_locked_message_names_lock_file() {
        let err = Error::Locked {
            path: PathBuf::from("/srv/repo"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/srv/repo"));
        assert!(msg.contains(crate::store::LOCK_FILE));
    }

    #[test]
    fn test_persistence_error_keeps_source() {
        use std::error::Error as _;

        let err = Error::persistence("/repo/root.json", io::Error::other("disk full"));
        assert!(err.to_string().contains("/repo/root.json"));
        assert!(err.source().is_some());
        assert!(!err.is_integrity());
    }
}
