//! Output-directory build lock.
//!
//! Two builds writing the same archive would race on the stale-archive
//! removal and the final write, so a run holds an exclusive advisory lock on
//! `<output>/.packager.lock` for its whole duration.

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use log::{debug, warn};
use std::fs::{self, File, OpenOptions};

/// Lock file name inside the output directory.
pub const LOCK_FILE_NAME: &str = ".packager.lock";

/// Exclusive lock on an output directory, released on drop.
#[derive(Debug)]
pub struct BuildLock {
    file: File,
    path: Utf8PathBuf,
}

impl BuildLock {
    /// Acquire the lock for `output_dir` without blocking.
    ///
    /// The directory is created if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::BuildInProgress`] if another process holds the
    /// lock, or [`PackagerError::Io`] if the lock file cannot be opened.
    pub fn acquire(output_dir: &Utf8Path) -> Result<Self> {
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("acquired build lock {path}");
                Ok(Self { file, path })
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(PackagerError::BuildInProgress {
                    output_dir: output_dir.to_owned(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Return the lock file path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("failed to release build lock {}: {e}", self.path);
        }
    }
}
