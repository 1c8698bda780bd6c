//! Transient staging area.
//!
//! The staging directory is created inside the output directory (so the final
//! archive step never crosses file systems) and is owned by a
//! [`StagingArea`] guard. Dropping the guard deletes the directory, which
//! covers normal completion, early returns and unwinding alike. Live staging
//! directories are also recorded in a process-wide registry so an interrupt
//! or termination handler can delete them before the process exits.

use crate::error::{PackagerError, Result};
use crate::report::Reporter;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::fs;
use std::sync::{Mutex, PoisonError};
use tempfile::TempDir;

/// Prefix of staging directory names inside the output directory.
pub const STAGING_PREFIX: &str = ".staging-";

/// Exit code used when the build is interrupted.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

static ACTIVE: Mutex<Vec<Utf8PathBuf>> = Mutex::new(Vec::new());

/// Scoped ownership of a staging directory.
#[derive(Debug)]
pub struct StagingArea {
    dir: Option<TempDir>,
    path: Utf8PathBuf,
}

impl StagingArea {
    /// Create a fresh staging directory under `output_dir`.
    ///
    /// The output directory is created if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::StagingFailed`] if either directory cannot be
    /// created or the staging path is not valid UTF-8.
    pub fn create(output_dir: &Utf8Path) -> Result<Self> {
        let failed = |e: &dyn std::fmt::Display| PackagerError::StagingFailed {
            reason: format!("cannot create staging area in {output_dir}: {e}"),
        };

        fs::create_dir_all(output_dir).map_err(|e| failed(&e))?;
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(output_dir)
            .map_err(|e| failed(&e))?;
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).map_err(|e| failed(&e))?;

        register(&path);
        debug!("created staging area {path}");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Return the staging directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Delete the staging directory now, reporting any failure.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::StagingFailed`] if the directory cannot be
    /// removed.
    pub fn close(mut self) -> Result<()> {
        unregister(&self.path);
        match self.dir.take() {
            Some(dir) => dir.close().map_err(|e| PackagerError::StagingFailed {
                reason: format!("cannot remove staging area {}: {e}", self.path),
            }),
            None => Ok(()),
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        unregister(&self.path);
        if let Some(dir) = self.dir.take()
            && let Err(e) = dir.close()
        {
            warn!("failed to remove staging area {}: {e}", self.path);
        }
    }
}

fn register(path: &Utf8Path) {
    ACTIVE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(path.to_owned());
}

fn unregister(path: &Utf8Path) {
    ACTIVE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .retain(|active| active != path);
}

/// Staging directories currently owned by a live [`StagingArea`].
#[must_use]
pub fn active_staging_areas() -> Vec<Utf8PathBuf> {
    ACTIVE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Delete every registered staging directory and return the ones removed.
///
/// Used from the interrupt handler, where guards will not get to run.
pub fn remove_active_staging_areas() -> Vec<Utf8PathBuf> {
    let paths = std::mem::take(&mut *ACTIVE.lock().unwrap_or_else(PoisonError::into_inner));
    paths
        .into_iter()
        .filter(|path| fs::remove_dir_all(path).is_ok())
        .collect()
}

/// Install a handler for Ctrl+C and termination requests (`SIGTERM`,
/// `SIGHUP`) that removes live staging areas and exits with
/// [`INTERRUPTED_EXIT_CODE`].
///
/// # Errors
///
/// Returns [`PackagerError::StagingFailed`] if a handler is already
/// installed or the platform refuses the registration.
pub fn install_interrupt_cleanup() -> Result<()> {
    ctrlc::set_handler(|| {
        let mut stderr = std::io::stderr();
        let mut reporter = Reporter::new(&mut stderr, false);
        for path in remove_active_staging_areas() {
            reporter.warn(format!("interrupted; removed staging area {path}"));
        }
        reporter.error("build interrupted");
        std::process::exit(INTERRUPTED_EXIT_CODE);
    })
    .map_err(|e| PackagerError::StagingFailed {
        reason: format!("failed to install interrupt handler: {e}"),
    })
}
