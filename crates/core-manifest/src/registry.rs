//! Manifest type registry
//!
//! Every manifest kind maps to a canonical filename, an expiry duration and a
//! signature threshold. The standard table is built once and never mutated;
//! custom tables go through [`Registry::with`], which checks thresholds and
//! filename uniqueness.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Closed set of manifest kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    Root,
    Index,
    Snapshot,
    Timestamp,
    /// Placeholder for per-component manifests; has no file of its own
    Component,
}

impl ManifestKind {
    /// All kinds in registry order
    pub const ALL: [ManifestKind; 5] = [
        ManifestKind::Root,
        ManifestKind::Index,
        ManifestKind::Snapshot,
        ManifestKind::Timestamp,
        ManifestKind::Component,
    ];

    /// Wire name used in `_type` and role keys
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestKind::Root => "root",
            ManifestKind::Index => "index",
            ManifestKind::Snapshot => "snapshot",
            ManifestKind::Timestamp => "timestamp",
            ManifestKind::Component => "component",
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ManifestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "root" => Ok(ManifestKind::Root),
            "index" => Ok(ManifestKind::Index),
            "snapshot" => Ok(ManifestKind::Snapshot),
            "timestamp" => Ok(ManifestKind::Timestamp),
            "component" => Ok(ManifestKind::Component),
            other => Err(Error::UnsupportedKind(other.to_string())),
        }
    }
}

/// Per-kind registry entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindInfo {
    /// Canonical filename; empty for kinds without a file
    pub filename: String,
    /// Lifetime added to the creation time to compute `expires`
    pub expire: Duration,
    /// Minimum number of signatures
    pub threshold: u32,
}

impl KindInfo {
    pub fn new<S: Into<String>>(filename: S, expire: Duration, threshold: u32) -> Self {
        Self {
            filename: filename.into(),
            expire,
            threshold,
        }
    }

    /// Whether this kind produces a file
    pub fn has_file(&self) -> bool {
        !self.filename.is_empty()
    }
}

/// Read-only kind → metadata table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: BTreeMap<ManifestKind, KindInfo>,
}

static STANDARD: Lazy<Registry> = Lazy::new(|| {
    let entries = [
        (ManifestKind::Root, KindInfo::new("root.json", Duration::days(365), 1)),
        (ManifestKind::Index, KindInfo::new("index.json", Duration::days(365), 1)),
        (ManifestKind::Component, KindInfo::new("", Duration::days(365), 1)),
        (ManifestKind::Snapshot, KindInfo::new("snapshot.json", Duration::days(1), 1)),
        (ManifestKind::Timestamp, KindInfo::new("timestamp.json", Duration::days(1), 1)),
    ];
    Registry {
        entries: entries.into_iter().collect(),
    }
});

impl Registry {
    /// Empty registry, for building custom tables
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide standard table
    pub fn standard() -> &'static Registry {
        &STANDARD
    }

    /// Add or replace an entry, rejecting zero thresholds and duplicate filenames
    pub fn with(mut self, kind: ManifestKind, info: KindInfo) -> Result<Self> {
        if info.threshold == 0 {
            return Err(Error::validation(format!(
                "Threshold for '{}' must be at least 1",
                kind
            )));
        }
        if info.has_file() {
            if let Some((other, _)) = self
                .entries
                .iter()
                .find(|(k, v)| **k != kind && v.filename == info.filename)
            {
                return Err(Error::validation(format!(
                    "Filename '{}' is already used by '{}'",
                    info.filename, other
                )));
            }
        }
        self.entries.insert(kind, info);
        Ok(self)
    }

    /// Entry for a kind, if registered
    pub fn get(&self, kind: ManifestKind) -> Option<&KindInfo> {
        self.entries.get(&kind)
    }

    /// Entry for a kind, or `Unregistered`
    pub fn info(&self, kind: ManifestKind) -> Result<&KindInfo> {
        self.get(kind).ok_or(Error::Unregistered { kind })
    }

    /// Filename of a file-backed kind
    pub fn filename(&self, kind: ManifestKind) -> Result<&str> {
        let info = self.info(kind)?;
        if !info.has_file() {
            return Err(Error::NoFilename { kind });
        }
        Ok(&info.filename)
    }

    pub fn threshold(&self, kind: ManifestKind) -> Result<u32> {
        Ok(self.info(kind)?.threshold)
    }

    /// `created + expire`, formatted as RFC 3339 in UTC
    pub fn expires_at(&self, kind: ManifestKind, created: DateTime<Utc>) -> Result<String> {
        let expire = self.info(kind)?.expire;
        let at = created
            .checked_add_signed(expire)
            .ok_or_else(|| Error::validation(format!("Expiry overflow for '{}'", kind)))?;
        Ok(format_time(at))
    }

    /// Reverse lookup from filename
    pub fn kind_for_filename(&self, filename: &str) -> Option<ManifestKind> {
        self.entries
            .iter()
            .find(|(_, info)| info.has_file() && info.filename == filename)
            .map(|(kind, _)| *kind)
    }

    /// All registered kinds with their entries
    pub fn iter(&self) -> impl Iterator<Item = (ManifestKind, &KindInfo)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Registered kinds that produce a file
    pub fn file_kinds(&self) -> impl Iterator<Item = ManifestKind> + '_ {
        self.iter()
            .filter(|(_, info)| info.has_file())
            .map(|(kind, _)| kind)
    }
}

/// Format a time the way every `expires` field is written
pub fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an `expires` field
pub fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| Error::InvalidTimestamp {
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_standard_filenames() {
        let registry = Registry::standard();
        assert_eq!(registry.filename(ManifestKind::Root).unwrap(), "root.json");
        assert_eq!(registry.filename(ManifestKind::Index).unwrap(), "index.json");
        assert_eq!(
            registry.filename(ManifestKind::Snapshot).unwrap(),
            "snapshot.json"
        );
        assert_eq!(
            registry.filename(ManifestKind::Timestamp).unwrap(),
            "timestamp.json"
        );
        assert!(matches!(
            registry.filename(ManifestKind::Component),
            Err(Error::NoFilename { .. })
        ));
    }

    #[test]
    fn test_file_kinds_skip_placeholder() {
        let kinds: Vec<_> = Registry::standard().file_kinds().collect();
        assert_eq!(kinds.len(), 4);
        assert!(!kinds.contains(&ManifestKind::Component));
    }

    #[test]
    fn test_expires_at_format() {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let registry = Registry::standard();
        assert_eq!(
            registry.expires_at(ManifestKind::Timestamp, t0).unwrap(),
            "2020-01-02T00:00:00Z"
        );
        assert_eq!(
            registry.expires_at(ManifestKind::Root, t0).unwrap(),
            "2020-12-31T00:00:00Z"
        );
    }

    #[test]
    fn test_with_rejects_zero_threshold() {
        let result = Registry::new().with(
            ManifestKind::Root,
            KindInfo::new("root.json", Duration::days(1), 0),
        );
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_with_rejects_duplicate_filename() {
        let result = Registry::new()
            .with(
                ManifestKind::Root,
                KindInfo::new("root.json", Duration::days(1), 1),
            )
            .and_then(|r| {
                r.with(
                    ManifestKind::Index,
                    KindInfo::new("root.json", Duration::days(1), 1),
                )
            });
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_with_replaces_entry() {
        let registry = Registry::standard()
            .clone()
            .with(
                ManifestKind::Root,
                KindInfo::new("root.json", Duration::days(30), 2),
            )
            .unwrap();
        assert_eq!(registry.threshold(ManifestKind::Root).unwrap(), 2);
        assert_eq!(registry.file_kinds().count(), 4);
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in ManifestKind::ALL {
            assert_eq!(kind.as_str().parse::<ManifestKind>().unwrap(), kind);
        }
        assert!("targets".parse::<ManifestKind>().is_err());
    }

    #[test]
    fn test_kind_for_filename() {
        let registry = Registry::standard();
        assert_eq!(
            registry.kind_for_filename("index.json"),
            Some(ManifestKind::Index)
        );
        assert_eq!(registry.kind_for_filename(""), None);
    }

    #[test]
    fn test_parse_time() {
        let t = parse_time("2020-01-02T00:00:00Z").unwrap();
        assert_eq!(format_time(t), "2020-01-02T00:00:00Z");
        assert!(parse_time("yesterday").is_err());
    }
}
