//! Manifest persistence
//!
//! A [`ManifestStore`] writes a batch of manifest files so that readers see
//! either the previous complete set or the new one. [`DirStore`] stages every
//! file into a temporary file in the destination directory, flushes it to
//! disk, then renames each one into place while holding an exclusive lock.

use crate::envelope::{self, Envelope};
use crate::error::{Error, Result};
use crate::manifest::ManifestSet;
use crate::registry::{ManifestKind, Registry};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Name of the lock file held during a batch write
pub const LOCK_FILE: &str = ".keystone.lock";

/// Destination for encoded manifest files
pub trait ManifestStore {
    /// Write every file or none of them
    fn write_batch(&mut self, files: &[(String, Vec<u8>)]) -> Result<()>;

    /// Current content of a file, if present
    fn read(&self, filename: &str) -> Result<Option<Vec<u8>>>;
}

/// Repository directory on the local filesystem
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Whether a repository has already been initialized here
    pub fn is_initialized(&self, registry: &Registry) -> bool {
        registry
            .filename(ManifestKind::Root)
            .map(|name| self.root.join(name).exists())
            .unwrap_or(false)
    }

    fn stage(&self, name: &str, bytes: &[u8]) -> Result<NamedTempFile> {
        let mut tmp =
            NamedTempFile::new_in(&self.root).map_err(|e| Error::persistence(&self.root, e))?;
        let target = self.root.join(name);
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| Error::persistence(&target, e))?;
        Ok(tmp)
    }

    fn previous_contents(&self, target: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(target) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::persistence(target, e)),
        }
    }

    fn restore(&self, committed: &[(PathBuf, Option<Vec<u8>>)]) {
        for (target, previous) in committed.iter().rev() {
            let result = match previous {
                Some(bytes) => NamedTempFile::new_in(&self.root).and_then(|mut tmp| {
                    tmp.write_all(bytes)?;
                    tmp.as_file().sync_all()?;
                    tmp.persist(target).map(|_| ()).map_err(|e| e.error)
                }),
                None => fs::remove_file(target),
            };
            if let Err(e) = result {
                warn!(path = %target.display(), error = %e, "failed to restore manifest");
            }
        }
    }
}

impl ManifestStore for DirStore {
    fn write_batch(&mut self, files: &[(String, Vec<u8>)]) -> Result<()> {
        for (name, _) in files {
            check_filename(name)?;
        }
        fs::create_dir_all(&self.root).map_err(|e| Error::persistence(&self.root, e))?;
        let _lock = DirLock::acquire(&self.root)?;

        let mut staged = Vec::with_capacity(files.len());
        for (name, bytes) in files {
            let target = self.root.join(name);
            let previous = self.previous_contents(&target)?;
            staged.push((target, previous, self.stage(name, bytes)?));
        }

        let mut committed: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::with_capacity(staged.len());
        for (target, previous, tmp) in staged {
            if let Err(e) = tmp.persist(&target) {
                warn!(path = %target.display(), "rename failed, restoring previous manifests");
                self.restore(&committed);
                return Err(Error::persistence(&target, e.error));
            }
            debug!(path = %target.display(), "manifest written");
            committed.push((target, previous));
        }

        sync_dir(&self.root);
        info!(dir = %self.root.display(), files = committed.len(), "manifest batch committed");
        Ok(())
    }

    fn read(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        check_filename(filename)?;
        self.previous_contents(&self.root.join(filename))
    }
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.files
    }
}

impl ManifestStore for MemoryStore {
    fn write_batch(&mut self, files: &[(String, Vec<u8>)]) -> Result<()> {
        for (name, _) in files {
            check_filename(name)?;
        }
        for (name, bytes) in files {
            self.files.insert(name.clone(), bytes.clone());
        }
        Ok(())
    }

    fn read(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.get(filename).cloned())
    }
}

/// Read and decode the envelope of every file-backed kind
pub fn read_envelopes<S: ManifestStore + ?Sized>(
    store: &S,
    registry: &Registry,
) -> Result<BTreeMap<ManifestKind, Envelope>> {
    let mut envelopes = BTreeMap::new();
    for kind in registry.file_kinds() {
        let filename = registry.filename(kind)?;
        let bytes = store
            .read(filename)?
            .ok_or_else(|| Error::manifest_not_found(filename))?;
        let envelope = envelope::decode(&bytes)?;
        if envelope.signed.kind() != kind {
            return Err(Error::validation(format!(
                "{} holds a {} manifest",
                filename,
                envelope.signed.kind()
            )));
        }
        envelopes.insert(kind, envelope);
    }
    Ok(envelopes)
}

/// Payloads of every file-backed kind, without signature checks
pub fn read_set<S: ManifestStore + ?Sized>(store: &S, registry: &Registry) -> Result<ManifestSet> {
    Ok(read_envelopes(store, registry)?
        .into_values()
        .map(|e| e.signed)
        .collect())
}

fn check_filename(name: &str) -> Result<()> {
    let plain = Path::new(name)
        .file_name()
        .map(|f| f == name)
        .unwrap_or(false);
    if !plain || name == LOCK_FILE {
        return Err(Error::validation(format!("Invalid manifest filename '{}'", name)));
    }
    Ok(())
}

/// Exclusive lock on a repository directory, released on drop
struct DirLock {
    path: PathBuf,
}

impl DirLock {
    fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(Error::Locked {
                path: dir.to_path_buf(),
            }),
            Err(e) => Err(Error::persistence(&path, e)),
        }
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|f| f.sync_all()) {
        warn!(dir = %dir.display(), error = %e, "directory sync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
