/*!
 * Error types for Keystone
 */

use keystone_core_manifest::Error as ManifestError;
use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, KeystoneError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;
pub const EXIT_INTEGRITY: i32 = 3;

#[derive(Debug)]
pub enum KeystoneError {
    /// Repository directory has no manifests
    RepositoryNotFound(PathBuf),

    /// Repository already holds a Root manifest
    AlreadyInitialized(PathBuf),

    /// Key directory is missing or holds no keys
    KeysNotFound(PathBuf),

    /// I/O error
    Io(io::Error),

    /// Configuration error
    Config(String),

    /// Error from the manifest core
    Manifest(ManifestError),

    /// Generic error with message
    Other(String),
}

impl KeystoneError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            KeystoneError::Manifest(e) if e.is_integrity() => EXIT_INTEGRITY,
            KeystoneError::RepositoryNotFound(_)
            | KeystoneError::AlreadyInitialized(_)
            | KeystoneError::KeysNotFound(_)
            | KeystoneError::Config(_)
            | KeystoneError::Manifest(_) => EXIT_FATAL,
            KeystoneError::Io(_) | KeystoneError::Other(_) => EXIT_PARTIAL,
        }
    }

    /// Suggested next step shown under the error message
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            KeystoneError::KeysNotFound(_) => Some("Run 'keystone keygen' first"),
            KeystoneError::RepositoryNotFound(_) => Some("Run 'keystone init' first"),
            KeystoneError::AlreadyInitialized(_) => Some("Pass --force to replace it"),
            KeystoneError::Manifest(ManifestError::Locked { .. }) => Some(
                "A crashed writer can leave .keystone.lock behind; delete it if no writer is running",
            ),
            _ => None,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            KeystoneError::RepositoryNotFound(_) | KeystoneError::AlreadyInitialized(_) => {
                ErrorCategory::Repository
            }
            KeystoneError::KeysNotFound(_) => ErrorCategory::Security,
            KeystoneError::Io(_) => ErrorCategory::IoError,
            KeystoneError::Config(_) => ErrorCategory::Configuration,
            KeystoneError::Manifest(e) => match e {
                e if e.is_integrity() => ErrorCategory::Integrity,
                ManifestError::MissingKey { .. } | ManifestError::InvalidKey(_) => {
                    ErrorCategory::Security
                }
                ManifestError::Persistence { .. }
                | ManifestError::Locked { .. }
                | ManifestError::Io(_) => ErrorCategory::IoError,
                ManifestError::ManifestNotFound { .. } => ErrorCategory::Repository,
                _ => ErrorCategory::Validation,
            },
            KeystoneError::Other(_) => ErrorCategory::Unknown,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or inconsistent manifests
    Validation,
    /// I/O and persistence errors
    IoError,
    /// Configuration errors
    Configuration,
    /// Signatures, expiry, rollback and cross-reference failures
    Integrity,
    /// Missing or invalid keys
    Security,
    /// Repository presence errors
    Repository,
    /// Uncategorized errors
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Integrity => write!(f, "integrity"),
            ErrorCategory::Security => write!(f, "security"),
            ErrorCategory::Repository => write!(f, "repository"),
            ErrorCategory::Unknown => write!(f, "unknown"),
        }
    }
}

impl fmt::Display for KeystoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeystoneError::RepositoryNotFound(path) => {
                write!(f, "No repository found at {}", path.display())
            }
            KeystoneError::AlreadyInitialized(path) => {
                write!(f, "Repository already initialized at {}", path.display())
            }
            KeystoneError::KeysNotFound(path) => {
                write!(f, "No signing keys found in {}", path.display())
            }
            KeystoneError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            KeystoneError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            KeystoneError::Manifest(err) => {
                write!(f, "{}", err)
            }
            KeystoneError::Other(msg) => {
                write!(f, "{}", msg)
            }
        }
    }
}

impl std::error::Error for KeystoneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeystoneError::Io(err) => Some(err),
            KeystoneError::Manifest(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for KeystoneError {
    fn from(err: io::Error) -> Self {
        KeystoneError::Io(err)
    }
}

impl From<ManifestError> for KeystoneError {
    fn from(err: ManifestError) -> Self {
        KeystoneError::Manifest(err)
    }
}

impl From<anyhow::Error> for KeystoneError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<KeystoneError>() {
            Ok(err) => return err,
            Err(err) => err,
        };
        match err.downcast::<ManifestError>() {
            Ok(err) => KeystoneError::Manifest(err),
            Err(err) => KeystoneError::Other(format!("{:#}", err)),
        }
    }
}

impl From<toml::de::Error> for KeystoneError {
    fn from(err: toml::de::Error) -> Self {
        KeystoneError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for KeystoneError {
    fn from(err: toml::ser::Error) -> Self {
        KeystoneError::Config(format!("TOML encode error: {}", err))
    }
}
