//! Error types for the extension packager.
//!
//! Each variant names the artefact that caused the failure (file, manifest
//! field, icon size, tool) so the CLI can print the message verbatim and the
//! user knows exactly what to fix. Icon-converter unavailability is not an
//! error at all; it is reported as a warning by [`crate::icons`].

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while packaging the extension.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// The manifest is not well-formed JSON.
    #[error("manifest {path} could not be parsed: {reason}")]
    ManifestParse {
        /// Path of the manifest that failed to parse.
        path: Utf8PathBuf,
        /// Diagnostic reported by the JSON parser.
        reason: String,
    },

    /// A required manifest field is absent or unusable.
    #[error("manifest field `{field}` is {problem}")]
    ManifestFieldMissing {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it, such as `missing` or `blank`.
        problem: &'static str,
    },

    /// One or more mandatory source files do not exist.
    #[error("required source file(s) missing from {root}: {}", .missing.join(", "))]
    RequiredFilesMissing {
        /// Source root that was inspected.
        root: Utf8PathBuf,
        /// Every missing file, relative to `root`, in declaration order.
        missing: Vec<String>,
    },

    /// A selected icon converter failed to produce the raster for a size.
    #[error("icon conversion failed for {size}x{size} using {tool}: {reason}")]
    IconConversionFailed {
        /// Pixel size that could not be produced.
        size: u32,
        /// Converter that was selected.
        tool: &'static str,
        /// Description of the failure.
        reason: String,
    },

    /// None of the configured archiving backends is available.
    #[error("no archiver available; tried: {}", .tried.join(", "))]
    NoArchiverAvailable {
        /// Backends probed, in preference order.
        tried: Vec<&'static str>,
    },

    /// The selected archiver ran but did not produce the archive.
    #[error("archiving with {tool} failed: {reason}")]
    ArchiveFailed {
        /// Backend that failed.
        tool: &'static str,
        /// Description of the failure.
        reason: String,
    },

    /// The produced archive failed its integrity test.
    #[error("archive {path} failed integrity check: {reason}")]
    CorruptArchive {
        /// Archive that was tested.
        path: Utf8PathBuf,
        /// Description of the first failing entry or structural problem.
        reason: String,
    },

    /// `manifest.json` is absent from the archive root.
    #[error("manifest.json is not at the root of {path}{}", nested_hint(.nested.as_deref()))]
    ManifestNotAtRoot {
        /// Archive that was inspected.
        path: Utf8PathBuf,
        /// Nested location of the manifest, when one was found.
        nested: Option<String>,
    },

    /// The staging area could not be created or populated.
    #[error("staging failed: {reason}")]
    StagingFailed {
        /// Description of the staging failure.
        reason: String,
    },

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration {path}: {reason}")]
    InvalidConfig {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// Another build currently holds the output directory.
    #[error("another build is already running in {output_dir}")]
    BuildInProgress {
        /// Output directory whose lock is held.
        output_dir: Utf8PathBuf,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

fn nested_hint(nested: Option<&str>) -> String {
    nested.map_or_else(String::new, |entry| format!(" (found at {entry})"))
}

/// Result type alias using [`PackagerError`].
pub type Result<T> = std::result::Result<T, PackagerError>;
