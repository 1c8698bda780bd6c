//! Packager configuration.
//!
//! Settings live in an optional `packager.toml` next to the project. Every
//! key falls back to the production defaults when omitted, so an absent file
//! builds the Web Notes extension exactly as shipped. Unknown keys are
//! rejected to catch typos early.

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;

/// Default configuration file name, resolved relative to the working directory.
pub const CONFIG_FILE_NAME: &str = "packager.toml";

/// Manifest file name; it must sit at the archive root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Production files copied into the package when present.
pub const DEFAULT_INCLUDE_FILES: &[&str] = &[
    MANIFEST_FILE,
    "background.js",
    "content.js",
    "popup.html",
    "popup.js",
    "popup.css",
    "shared-utils.js",
    "shared-api.js",
];

/// Production directories copied recursively when present.
pub const DEFAULT_INCLUDE_DIRS: &[&str] = &["libs", "_locales"];

/// Development and test artefacts that never ship.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "test-*",
    "*.test.js",
    "*.spec.js",
    "*.md",
    ".*",
    "*.map",
    "*.log",
    "node_modules",
];

/// Files that must exist before any staging work begins.
pub const DEFAULT_REQUIRED_FILES: &[&str] = &[
    MANIFEST_FILE,
    "background.js",
    "content.js",
    "popup.html",
    "popup.js",
    "icon16.svg",
    "icon48.svg",
    "icon128.svg",
];

/// Icon converter names accepted in `converters`, in default preference order.
pub const KNOWN_CONVERTERS: &[&str] = &["magick", "convert", "inkscape"];

/// Archiver names accepted in `archivers`, in default preference order.
pub const KNOWN_ARCHIVERS: &[&str] = &["zip", "7z", "python3", "embedded"];

/// Complete packager configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PackagerConfig {
    /// Archive name prefix. Derived from the manifest `name` when unset.
    pub product: Option<String>,
    /// Extension source directory.
    pub source_dir: Utf8PathBuf,
    /// Directory that receives the final archive.
    pub output_dir: Utf8PathBuf,
    /// Individual production files.
    pub include_files: Vec<String>,
    /// Production directories copied recursively.
    pub include_dirs: Vec<String>,
    /// Glob patterns for files that must never be packaged.
    pub exclude_patterns: Vec<String>,
    /// Files the pre-flight check insists on.
    pub required_files: Vec<String>,
    /// Advisory size thresholds.
    pub size: SizeThresholds,
    /// Upper bound, in seconds, for a single external tool invocation.
    pub tool_timeout_secs: u64,
    /// Icon converters in preference order (`magick`, `convert`, `inkscape`).
    pub converters: Option<Vec<String>>,
    /// Archivers in preference order (`zip`, `7z`, `python3`, `embedded`).
    pub archivers: Option<Vec<String>>,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            product: None,
            source_dir: Utf8PathBuf::from("extension"),
            output_dir: Utf8PathBuf::from("dist"),
            include_files: owned(DEFAULT_INCLUDE_FILES),
            include_dirs: owned(DEFAULT_INCLUDE_DIRS),
            exclude_patterns: owned(DEFAULT_EXCLUDE_PATTERNS),
            required_files: owned(DEFAULT_REQUIRED_FILES),
            size: SizeThresholds::default(),
            tool_timeout_secs: 120,
            converters: None,
            archivers: None,
        }
    }
}

impl PackagerConfig {
    /// Load configuration from `path`.
    ///
    /// When `path` is `None` the default [`CONFIG_FILE_NAME`] is used if it
    /// exists, and built-in defaults otherwise. An explicitly requested file
    /// must exist.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfig`] when the file cannot be read
    /// or does not deserialise.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(explicit) => (explicit.to_owned(), true),
            None => (Utf8PathBuf::from(CONFIG_FILE_NAME), false),
        };

        if !required && !path.is_file() {
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&path).map_err(|e| PackagerError::InvalidConfig {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        Self::from_toml(&path, &contents)
    }

    /// Parse configuration text, attributing errors to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfig`] when the text is not valid
    /// TOML, contains unknown keys, or names an unknown backend.
    pub fn from_toml(path: &Utf8Path, contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| PackagerError::InvalidConfig {
            path: path.to_owned(),
            reason: e.message().to_owned(),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Return the tool timeout as a [`Duration`].
    #[must_use]
    pub const fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    fn validate(&self, path: &Utf8Path) -> Result<()> {
        let invalid = |reason: String| PackagerError::InvalidConfig {
            path: path.to_owned(),
            reason,
        };

        if self.size.warn_mb > self.size.critical_mb {
            return Err(invalid(format!(
                "size.warn_mb ({}) exceeds size.critical_mb ({})",
                self.size.warn_mb, self.size.critical_mb
            )));
        }
        if self.tool_timeout_secs == 0 {
            return Err(invalid("tool_timeout_secs must be positive".to_owned()));
        }
        if let Some(product) = &self.product
            && product.trim().is_empty()
        {
            return Err(invalid("product must not be blank".to_owned()));
        }
        check_backends("converters", self.converters.as_deref(), KNOWN_CONVERTERS)
            .map_err(&invalid)?;
        check_backends("archivers", self.archivers.as_deref(), KNOWN_ARCHIVERS)
            .map_err(&invalid)?;
        for pattern in &self.exclude_patterns {
            glob::Pattern::new(pattern)
                .map_err(|e| invalid(format!("bad exclude pattern `{pattern}`: {e}")))?;
        }
        Ok(())
    }
}

/// Advisory archive size thresholds, in mebibytes.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SizeThresholds {
    /// Size above which a warning is emitted.
    pub warn_mb: u64,
    /// Size above which a stronger warning is emitted.
    pub critical_mb: u64,
}

impl Default for SizeThresholds {
    fn default() -> Self {
        Self {
            warn_mb: 10,
            critical_mb: 100,
        }
    }
}

fn check_backends(
    key: &str,
    requested: Option<&[String]>,
    known: &[&str],
) -> std::result::Result<(), String> {
    let unknown = requested
        .unwrap_or_default()
        .iter()
        .find(|name| !known.contains(&name.as_str()));
    match unknown {
        Some(name) => Err(format!(
            "unknown backend `{name}` in {key}; expected one of {}",
            known.join(", ")
        )),
        None => Ok(()),
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}
