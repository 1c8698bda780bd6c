//! Pre-flight source checks.
//!
//! Runs before any staging work so that a broken source tree never leaves a
//! partial build behind.

use crate::error::{PackagerError, Result};
use camino::Utf8Path;

/// Confirm every file in `required` exists under `root` as a regular file.
///
/// All missing files are collected so the user can fix them in one pass.
///
/// # Errors
///
/// Returns [`PackagerError::RequiredFilesMissing`] listing every absent file,
/// including the case where `root` itself does not exist.
pub fn validate_file_set(root: &Utf8Path, required: &[String]) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !root.join(name.as_str()).is_file())
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PackagerError::RequiredFilesMissing {
            root: root.to_owned(),
            missing,
        })
    }
}
