//! CLI argument definitions for the extension packager.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint so argument handling can be tested without
//! running a build.

use crate::config::PackagerConfig;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};

/// Package the Web Notes browser extension for store submission.
#[derive(Parser, Debug)]
#[command(name = "web-notes-packager")]
#[command(version, about)]
#[command(long_about = concat!(
    "Package the Web Notes browser extension for store submission.\n\n",
    "Validates the manifest and required source files, copies the production ",
    "file set into a temporary staging area, converts the SVG icons to PNG with ",
    "whichever converter is installed, writes a deflate-compressed zip archive ",
    "and checks it before reporting success.\n\n",
    "Settings are read from packager.toml in the working directory when present; ",
    "command-line flags take precedence.",
))]
#[command(after_help = concat!(
    "ICON CONVERTERS (first available wins):\n",
    "  magick, convert, inkscape\n\n",
    "ARCHIVERS (first available wins):\n",
    "  zip, 7z, python3, embedded\n\n",
    "EXAMPLES:\n",
    "  Build dist/<product>-extension-v<version>.zip:\n",
    "    $ web-notes-packager\n\n",
    "  Build from another source tree into another directory:\n",
    "    $ web-notes-packager --source-dir ext --output-dir out\n\n",
    "  Show the production file set without building:\n",
    "    $ web-notes-packager plan\n",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Build arguments (used when no subcommand is given).
    #[command(flatten)]
    pub build: BuildArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build and validate the package (default when no subcommand given).
    Build(BuildArgs),

    /// Show the resolved configuration and file set without building.
    Plan(BuildArgs),
}

/// What the invocation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Run the full pipeline.
    Build,
    /// Only compute the plan.
    Plan,
}

/// Arguments shared by `build` and `plan`.
#[derive(Parser, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Extension source directory [default: extension].
    #[arg(short, long, value_name = "DIR")]
    pub source_dir: Option<Utf8PathBuf>,

    /// Directory that receives the archive [default: dist].
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Archive name prefix [default: slugified manifest name].
    #[arg(short, long, value_name = "NAME")]
    pub product: Option<String>,

    /// Configuration file [default: packager.toml when present].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Show the plan and exit without building.
    #[arg(long)]
    pub dry_run: bool,

    /// List staged and excluded files after the build (repeatable).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (warnings and errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Resolve the subcommand and its arguments.
    ///
    /// Without a subcommand the top-level flags describe a build; `--dry-run`
    /// turns any build into a plan.
    #[must_use]
    pub fn invocation(&self) -> (Mode, &BuildArgs) {
        let (mode, args) = match &self.command {
            None => (Mode::Build, &self.build),
            Some(Command::Build(args)) => (Mode::Build, args),
            Some(Command::Plan(args)) => (Mode::Plan, args),
        };
        if args.dry_run {
            (Mode::Plan, args)
        } else {
            (mode, args)
        }
    }
}

impl BuildArgs {
    /// Return the explicitly requested configuration file, if any.
    #[must_use]
    pub fn config_path(&self) -> Option<&Utf8Path> {
        self.config.as_deref()
    }

    /// Overlay command-line values onto `config`.
    ///
    /// # Examples
    ///
    /// ```
    /// use web_notes_packager::cli::BuildArgs;
    /// use web_notes_packager::config::PackagerConfig;
    ///
    /// let args = BuildArgs {
    ///     output_dir: Some("out".into()),
    ///     ..BuildArgs::default()
    /// };
    /// let mut config = PackagerConfig::default();
    /// args.apply_to(&mut config);
    /// assert_eq!(config.output_dir, "out");
    /// assert_eq!(config.source_dir, "extension");
    /// ```
    pub fn apply_to(&self, config: &mut PackagerConfig) {
        if let Some(source_dir) = &self.source_dir {
            config.source_dir.clone_from(source_dir);
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir.clone_from(output_dir);
        }
        if let Some(product) = &self.product {
            config.product = Some(product.clone());
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
