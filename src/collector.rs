//! Asset collection into the staging area.
//!
//! Copies the production file set chosen by [`FileSelectionPolicy`], then
//! writes the staged manifest with its icon references pointing at the raster
//! names the icon stage produces. The source manifest is never modified.

use crate::config::MANIFEST_FILE;
use crate::error::{PackagerError, Result};
use crate::icons::IconSpec;
use crate::manifest::Manifest;
use crate::policy::FileSelectionPolicy;
use crate::report::Reporter;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Summary of the collection stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedAssets {
    /// Staged files relative to the staging root, manifest included.
    pub files: Vec<Utf8PathBuf>,
    /// Declared inclusions absent from the source tree.
    pub missing: Vec<String>,
    /// Source paths skipped by an exclusion pattern.
    pub excluded: Vec<Utf8PathBuf>,
}

/// Inputs of the collection stage.
pub struct AssetCollector<'a> {
    policy: &'a FileSelectionPolicy,
    icons: &'a IconSpec,
}

impl<'a> AssetCollector<'a> {
    /// Create a collector applying `policy` and rewriting icons per `icons`.
    #[must_use]
    pub fn new(policy: &'a FileSelectionPolicy, icons: &'a IconSpec) -> Self {
        Self { policy, icons }
    }

    /// Populate `staging` from `source`.
    ///
    /// Missing optional inclusions and symbolic links are reported as
    /// warnings.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::StagingFailed`] naming the file when a copy
    /// fails, or the manifest error when the staged manifest cannot be
    /// written.
    pub fn collect(
        &self,
        source: &Utf8Path,
        staging: &Utf8Path,
        manifest: &Manifest,
        reporter: &mut Reporter<'_>,
    ) -> Result<CollectedAssets> {
        reporter.info(format!("Collecting production files from {source}..."));
        let selection = self.policy.select(source)?;

        for name in &selection.missing {
            reporter.warn(format!("declared file {name} not found in {source}; skipping"));
        }
        for link in &selection.links {
            reporter.warn(format!("{link} is a symbolic link; skipping"));
        }

        let mut files = Vec::with_capacity(selection.files.len() + 1);
        for relative in selection.files.iter().filter(|f| f.as_str() != MANIFEST_FILE) {
            copy_into(source, staging, relative)?;
            files.push(relative.clone());
        }

        manifest
            .with_raster_icons(self.icons)
            .write_to(&staging.join(MANIFEST_FILE))?;
        files.insert(0, Utf8PathBuf::from(MANIFEST_FILE));

        reporter.success(format!(
            "Staged {} file(s), skipped {} excluded path(s)",
            files.len(),
            selection.excluded.len()
        ));
        Ok(CollectedAssets {
            files,
            missing: selection.missing,
            excluded: selection.excluded,
        })
    }
}

fn copy_into(source: &Utf8Path, staging: &Utf8Path, relative: &Utf8Path) -> Result<()> {
    let from = source.join(relative);
    let to = staging.join(relative);
    let failed = |e: std::io::Error| PackagerError::StagingFailed {
        reason: format!("failed to copy {from} to {to}: {e}"),
    };

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(failed)?;
    }
    fs::copy(&from, &to).map_err(failed)?;
    Ok(())
}
