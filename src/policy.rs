//! Production file selection.
//!
//! A source file ships when it is named in `include_files`, or lives under
//! one of `include_dirs`, and no component of its relative path matches an
//! exclusion glob. Exclusions therefore prune nested development artefacts
//! such as `libs/test-helper.js` or `libs/vendor/README.md`, and whole
//! subtrees such as `node_modules/`.

use crate::config::{CONFIG_FILE_NAME, PackagerConfig};
use crate::error::{PackagerError, Result};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use glob::Pattern;
use std::fs;
use std::io;

/// Included names and excluded glob patterns.
#[derive(Debug, Clone)]
pub struct FileSelectionPolicy {
    include_files: Vec<String>,
    include_dirs: Vec<String>,
    excluded: Vec<Pattern>,
}

/// Result of applying a [`FileSelectionPolicy`] to a source tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Files to copy, relative to the source root, in traversal order.
    pub files: Vec<Utf8PathBuf>,
    /// Declared inclusions that do not exist in the source tree.
    pub missing: Vec<String>,
    /// Paths skipped because they match an exclusion pattern.
    pub excluded: Vec<Utf8PathBuf>,
    /// Symbolic links found among the inclusions; never followed.
    pub links: Vec<Utf8PathBuf>,
}

impl FileSelectionPolicy {
    /// Build a policy from explicit lists.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfig`] when a pattern is not a valid
    /// glob.
    pub fn new(
        include_files: Vec<String>,
        include_dirs: Vec<String>,
        exclude_patterns: &[String],
    ) -> Result<Self> {
        let excluded = exclude_patterns
            .iter()
            .map(|raw| {
                Pattern::new(raw).map_err(|e| PackagerError::InvalidConfig {
                    path: Utf8PathBuf::from(CONFIG_FILE_NAME),
                    reason: format!("bad exclude pattern `{raw}`: {e}"),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            include_files,
            include_dirs,
            excluded,
        })
    }

    /// Build the policy described by `config`.
    ///
    /// # Errors
    ///
    /// See [`FileSelectionPolicy::new`].
    pub fn from_config(config: &PackagerConfig) -> Result<Self> {
        Self::new(
            config.include_files.clone(),
            config.include_dirs.clone(),
            &config.exclude_patterns,
        )
    }

    /// Whether any component of `relative` matches an exclusion pattern.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use web_notes_packager::config::PackagerConfig;
    /// use web_notes_packager::policy::FileSelectionPolicy;
    ///
    /// let policy = FileSelectionPolicy::from_config(&PackagerConfig::default())?;
    /// assert!(policy.is_excluded(Utf8Path::new("libs/test-utils.js")));
    /// assert!(!policy.is_excluded(Utf8Path::new("libs/marked.min.js")));
    /// # Ok::<(), web_notes_packager::error::PackagerError>(())
    /// ```
    #[must_use]
    pub fn is_excluded(&self, relative: &Utf8Path) -> bool {
        relative.components().any(|component| match component {
            Utf8Component::Normal(name) => self.excluded.iter().any(|p| p.matches(name)),
            _ => false,
        })
    }

    /// Individually included files.
    #[must_use]
    pub fn include_files(&self) -> &[String] {
        &self.include_files
    }

    /// Recursively included directories.
    #[must_use]
    pub fn include_dirs(&self) -> &[String] {
        &self.include_dirs
    }

    /// Walk `root` and list the files that ship.
    ///
    /// Directory contents are visited in name order so the selection, and
    /// therefore the archive entry order, is stable across runs. Symbolic
    /// links are never followed: they are listed in [`Selection::links`]
    /// and left out, so nothing outside `root` can reach the package.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] if a directory cannot be read.
    pub fn select(&self, root: &Utf8Path) -> Result<Selection> {
        let mut selection = Selection::default();

        for name in &self.include_files {
            let relative = Utf8PathBuf::from(name);
            if self.is_excluded(&relative) {
                selection.excluded.push(relative);
                continue;
            }
            match fs::symlink_metadata(root.join(&relative)).map(|m| m.file_type()) {
                Ok(kind) if kind.is_symlink() => selection.links.push(relative),
                Ok(kind) if kind.is_file() => selection.files.push(relative),
                _ => selection.missing.push(name.clone()),
            }
        }

        for name in &self.include_dirs {
            let relative = Utf8PathBuf::from(name);
            if self.is_excluded(&relative) {
                selection.excluded.push(relative);
                continue;
            }
            match fs::symlink_metadata(root.join(&relative)).map(|m| m.file_type()) {
                Ok(kind) if kind.is_symlink() => selection.links.push(relative),
                Ok(kind) if kind.is_dir() => self.walk(root, &relative, &mut selection)?,
                _ => selection.missing.push(format!("{name}/")),
            }
        }

        Ok(selection)
    }

    fn walk(&self, root: &Utf8Path, relative: &Utf8Path, selection: &mut Selection) -> Result<()> {
        let mut entries: Vec<_> = root
            .join(relative)
            .read_dir_utf8()?
            .collect::<io::Result<_>>()?;
        entries.sort_by(|a, b| a.file_name().cmp(b.file_name()));

        for entry in entries {
            let child = relative.join(entry.file_name());
            if self.is_excluded(&child) {
                selection.excluded.push(child);
                continue;
            }
            let file_type = entry.file_type()?;
            if file_type.is_symlink() {
                selection.links.push(child);
            } else if file_type.is_dir() {
                self.walk(root, &child, selection)?;
            } else if file_type.is_file() {
                selection.files.push(child);
            }
        }
        Ok(())
    }
}
