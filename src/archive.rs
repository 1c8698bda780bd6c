//! Archive construction.
//!
//! The staging directory becomes the archive root: every staged file is
//! stored under its path relative to staging, deflate-compressed. Backends are
//! probed in preference order (the `zip` utility, `7z`, Python's `zipfile`
//! module, then the in-process writer) and the first available one is used.

use crate::config::KNOWN_ARCHIVERS;
use crate::error::{PackagerError, Result};
use crate::exec::{CommandExecutor, command_succeeds, failure_reason};
use crate::report::Reporter;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io;
use std::rc::Rc;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Python program that zips the working directory into `sys.argv[1]`.
const PYTHON_ZIP_SCRIPT: &str = "\
import os, sys, zipfile
with zipfile.ZipFile(sys.argv[1], 'w', zipfile.ZIP_DEFLATED) as archive:
    for root, dirs, files in os.walk('.'):
        dirs.sort()
        for name in sorted(files):
            path = os.path.join(root, name)
            archive.write(path, os.path.relpath(path, '.'))
";

/// A backend capable of packing a directory into a zip archive.
#[cfg_attr(test, mockall::automock)]
pub trait Archiver {
    /// Short name used in diagnostics and configuration.
    fn name(&self) -> &'static str;

    /// Whether the backend can run on this host.
    fn is_available(&self) -> bool;

    /// Pack the contents of `staging` into `destination`.
    ///
    /// `destination` is absolute and does not exist when this is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn archive(&self, staging: &Utf8Path, destination: &Utf8Path) -> Result<()>;
}

/// External archiving programs, in default preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiverTool {
    /// Info-ZIP `zip`.
    Zip,
    /// 7-Zip command line.
    SevenZip,
    /// Python 3 `zipfile` module.
    Python,
}

impl ArchiverTool {
    /// Resolve a configuration name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "zip" => Some(Self::Zip),
            "7z" => Some(Self::SevenZip),
            "python3" => Some(Self::Python),
            _ => None,
        }
    }

    /// Program name, which doubles as the configuration name.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::SevenZip => "7z",
            Self::Python => "python3",
        }
    }

    const fn probe_args(self) -> &'static [&'static str] {
        match self {
            Self::Zip => &["-v"],
            Self::SevenZip => &["i"],
            Self::Python => &["-c", "import zipfile"],
        }
    }

    fn archive_args(self, destination: &Utf8Path) -> Vec<&str> {
        match self {
            Self::Zip => vec!["-q", "-r", "-X", destination.as_str(), "."],
            Self::SevenZip => vec![
                "a",
                "-tzip",
                "-mm=Deflate",
                "-bso0",
                "-bsp0",
                destination.as_str(),
                "*",
            ],
            Self::Python => vec!["-c", PYTHON_ZIP_SCRIPT, destination.as_str()],
        }
    }
}

/// An [`Archiver`] backed by an external program run inside the staging
/// directory.
pub struct ExternalArchiver {
    tool: ArchiverTool,
    executor: Rc<dyn CommandExecutor>,
}

impl ExternalArchiver {
    /// Create an archiver for `tool` that runs through `executor`.
    #[must_use]
    pub fn new(tool: ArchiverTool, executor: Rc<dyn CommandExecutor>) -> Self {
        Self { tool, executor }
    }
}

impl Archiver for ExternalArchiver {
    fn name(&self) -> &'static str {
        self.tool.program()
    }

    fn is_available(&self) -> bool {
        command_succeeds(
            self.executor.as_ref(),
            self.tool.program(),
            self.tool.probe_args(),
        )
    }

    fn archive(&self, staging: &Utf8Path, destination: &Utf8Path) -> Result<()> {
        let args = self.tool.archive_args(destination);
        let output = self
            .executor
            .run(Some(staging), self.tool.program(), &args)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(PackagerError::ArchiveFailed {
                tool: self.name(),
                reason: failure_reason(&output),
            })
        }
    }
}

/// In-process archiver built on the `zip` crate; always available.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedArchiver;

impl EmbeddedArchiver {
    const NAME: &'static str = "embedded";
}

impl Archiver for EmbeddedArchiver {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_available(&self) -> bool {
        true
    }

    fn archive(&self, staging: &Utf8Path, destination: &Utf8Path) -> Result<()> {
        let failed = |e: &dyn std::fmt::Display| PackagerError::ArchiveFailed {
            tool: Self::NAME,
            reason: e.to_string(),
        };

        let mut files = Vec::new();
        collect_files(staging, Utf8Path::new(""), &mut files)?;

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);
        let mut writer = zip::ZipWriter::new(File::create(destination)?);
        for relative in files {
            writer
                .start_file(relative.as_str(), options)
                .map_err(|e| failed(&e))?;
            let mut source = File::open(staging.join(&relative))?;
            io::copy(&mut source, &mut writer)?;
        }
        writer.finish().map_err(|e| failed(&e))?;
        Ok(())
    }
}

/// Append every regular file under `root/relative` to `files`, using `/`
/// separated paths relative to `root`, in name order.
fn collect_files(root: &Utf8Path, relative: &Utf8Path, files: &mut Vec<Utf8PathBuf>) -> Result<()> {
    let mut entries: Vec<_> = root
        .join(relative)
        .read_dir_utf8()?
        .collect::<io::Result<_>>()?;
    entries.sort_by(|a, b| a.file_name().cmp(b.file_name()));

    for entry in entries {
        let child = if relative.as_str().is_empty() {
            Utf8PathBuf::from(entry.file_name())
        } else {
            Utf8PathBuf::from(format!("{relative}/{}", entry.file_name()))
        };
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(root, &child, files)?;
        } else if file_type.is_file() {
            files.push(child);
        }
    }
    Ok(())
}

/// Build the archiver chain for the configured (or default) order.
#[must_use]
pub fn archiver_chain(
    names: Option<&[String]>,
    executor: &Rc<dyn CommandExecutor>,
) -> Vec<Box<dyn Archiver>> {
    let defaults: Vec<String> = KNOWN_ARCHIVERS.iter().map(|n| (*n).to_owned()).collect();
    names
        .unwrap_or(&defaults)
        .iter()
        .filter_map(|name| -> Option<Box<dyn Archiver>> {
            if name == EmbeddedArchiver::NAME {
                return Some(Box::new(EmbeddedArchiver));
            }
            ArchiverTool::from_name(name).map(|tool| {
                Box::new(ExternalArchiver::new(tool, Rc::clone(executor))) as Box<dyn Archiver>
            })
        })
        .collect()
}

/// Pack `staging` into `output_dir/filename` and return the archive's
/// absolute path.
///
/// Any archive already at the target path is removed first, so a rebuild
/// never leaves a stale package behind. A failed attempt removes whatever
/// partial file the backend left.
///
/// # Errors
///
/// Returns [`PackagerError::NoArchiverAvailable`] when no backend is
/// available and [`PackagerError::ArchiveFailed`] when the selected backend
/// fails or produces no file.
pub fn build_archive(
    staging: &Utf8Path,
    output_dir: &Utf8Path,
    filename: &str,
    archivers: &[Box<dyn Archiver>],
    reporter: &mut Reporter<'_>,
) -> Result<Utf8PathBuf> {
    let destination = output_dir.canonicalize_utf8()?.join(filename);
    if destination.exists() {
        reporter.info(format!("Removing previous {filename}"));
        fs::remove_file(&destination)?;
    }

    let Some(archiver) = archivers.iter().find(|a| a.is_available()) else {
        return Err(PackagerError::NoArchiverAvailable {
            tried: archivers.iter().map(|a| a.name()).collect(),
        });
    };

    reporter.info(format!("Creating {filename} with {}...", archiver.name()));
    let outcome = archiver.archive(staging, &destination).and_then(|()| {
        if destination.is_file() {
            Ok(())
        } else {
            Err(PackagerError::ArchiveFailed {
                tool: archiver.name(),
                reason: format!("{filename} was not created"),
            })
        }
    });

    if let Err(e) = outcome {
        if destination.exists() && fs::remove_file(&destination).is_err() {
            log::warn!("failed to remove partial archive {destination}");
        }
        return Err(match e {
            PackagerError::ArchiveFailed { .. } => e,
            other => PackagerError::ArchiveFailed {
                tool: archiver.name(),
                reason: other.to_string(),
            },
        });
    }

    reporter.success(format!("Created {destination}"));
    Ok(destination)
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
