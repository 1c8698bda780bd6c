//! Post-build package validation.
//!
//! Checks run against the archive on disk, after the archiver has exited:
//! advisory size thresholds, a full decompression pass that verifies every
//! entry's checksum, root-level placement of `manifest.json`, and a SHA-256
//! digest for the build summary.

use crate::config::{MANIFEST_FILE, SizeThresholds};
use crate::error::{PackagerError, Result};
use crate::report::{Reporter, human_size};
use camino::{Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};

const MIB: u64 = 1024 * 1024;

/// How the archive size compares with the configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeVerdict {
    /// At or below the warning threshold.
    WithinLimits,
    /// Above the warning threshold.
    Large,
    /// Above the critical threshold.
    VeryLarge,
}

impl SizeVerdict {
    /// Classify `bytes` against `thresholds`.
    ///
    /// # Examples
    ///
    /// ```
    /// use web_notes_packager::config::SizeThresholds;
    /// use web_notes_packager::verify::SizeVerdict;
    ///
    /// let limits = SizeThresholds::default();
    /// assert_eq!(SizeVerdict::classify(40 * 1024, limits), SizeVerdict::WithinLimits);
    /// assert_eq!(SizeVerdict::classify(11 * 1024 * 1024, limits), SizeVerdict::Large);
    /// ```
    #[must_use]
    pub fn classify(bytes: u64, thresholds: SizeThresholds) -> Self {
        if bytes > thresholds.critical_mb.saturating_mul(MIB) {
            Self::VeryLarge
        } else if bytes > thresholds.warn_mb.saturating_mul(MIB) {
            Self::Large
        } else {
            Self::WithinLimits
        }
    }
}

/// One entry of the produced archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive.
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u64,
}

/// Facts established about a package that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPackage {
    /// Archive location.
    pub path: Utf8PathBuf,
    /// Archive size on disk.
    pub size_bytes: u64,
    /// Size classification.
    pub size_verdict: SizeVerdict,
    /// Lowercase hex SHA-256 of the archive.
    pub sha256: String,
    /// File entries, in archive order.
    pub entries: Vec<ArchiveEntry>,
}

/// Validates a freshly built archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageValidator {
    thresholds: SizeThresholds,
}

impl PackageValidator {
    /// Create a validator using `thresholds` for size warnings.
    #[must_use]
    pub const fn new(thresholds: SizeThresholds) -> Self {
        Self { thresholds }
    }

    /// Validate the archive at `path`.
    ///
    /// Size findings are reported as warnings only.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::CorruptArchive`] if the archive cannot be
    /// read or an entry fails its checksum, and
    /// [`PackagerError::ManifestNotAtRoot`] if `manifest.json` is not a
    /// root-level entry.
    pub fn validate(&self, path: &Utf8Path, reporter: &mut Reporter<'_>) -> Result<ValidatedPackage> {
        let size_bytes = fs::metadata(path)?.len();
        let size_verdict = SizeVerdict::classify(size_bytes, self.thresholds);
        reporter.info(format!(
            "Package size: {} ({size_bytes} bytes)",
            human_size(size_bytes)
        ));
        match size_verdict {
            SizeVerdict::WithinLimits => {}
            SizeVerdict::Large => reporter.warn(format!(
                "package is larger than {} MB; consider trimming bundled libraries",
                self.thresholds.warn_mb
            )),
            SizeVerdict::VeryLarge => reporter.warn(format!(
                "package exceeds {} MB; store review may be slow or the upload rejected",
                self.thresholds.critical_mb
            )),
        }

        let entries = test_integrity(path)?;
        reporter.success(format!("Archive integrity verified ({} entries)", entries.len()));

        check_manifest_at_root(path, &entries)?;
        reporter.success("manifest.json is at the archive root");

        let sha256 = compute_sha256(path)?;
        reporter.plain("Contents:");
        for entry in &entries {
            reporter.plain(format!("  {} ({})", entry.name, human_size(entry.size)));
        }
        reporter.plain(format!("SHA-256: {sha256}"));

        Ok(ValidatedPackage {
            path: path.to_owned(),
            size_bytes,
            size_verdict,
            sha256,
            entries,
        })
    }
}

/// Decompress every entry, verifying checksums, and list the file entries.
///
/// # Errors
///
/// Returns [`PackagerError::CorruptArchive`] naming the first failing entry.
pub fn test_integrity(path: &Utf8Path) -> Result<Vec<ArchiveEntry>> {
    let corrupt = |reason: String| PackagerError::CorruptArchive {
        path: path.to_owned(),
        reason,
    };

    let mut archive = zip::ZipArchive::new(File::open(path)?).map_err(|e| corrupt(e.to_string()))?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| corrupt(format!("entry #{index}: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_owned();
        let size = io::copy(&mut entry, &mut io::sink())
            .map_err(|e| corrupt(format!("{name}: {e}")))?;
        entries.push(ArchiveEntry { name, size });
    }
    Ok(entries)
}

fn check_manifest_at_root(path: &Utf8Path, entries: &[ArchiveEntry]) -> Result<()> {
    if entries.iter().any(|entry| entry.name == MANIFEST_FILE) {
        return Ok(());
    }
    let nested_suffix = format!("/{MANIFEST_FILE}");
    Err(PackagerError::ManifestNotAtRoot {
        path: path.to_owned(),
        nested: entries
            .iter()
            .find(|entry| entry.name.ends_with(&nested_suffix))
            .map(|entry| entry.name.clone()),
    })
}

/// Compute the lowercase hex SHA-256 digest of a file.
///
/// # Errors
///
/// Returns [`PackagerError::Io`] if the file cannot be read.
pub fn compute_sha256(path: &Utf8Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    Ok(format!("{:x}", hasher.finalize()))
}
