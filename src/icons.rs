//! Icon rasterisation.
//!
//! The extension ships vector icon sources, but stores require PNG icons at
//! 16, 48 and 128 pixels. Conversion is delegated to whichever external tool
//! is installed, probed in a fixed preference order: ImageMagick 7 (`magick`),
//! the legacy ImageMagick 6 entry point (`convert`), then Inkscape.
//!
//! When no converter is available the vector sources are copied under
//! size-tagged names and the build continues with a warning. Once a converter
//! has been selected, however, every size must be produced.

use crate::config::KNOWN_CONVERTERS;
use crate::error::{PackagerError, Result};
use crate::exec::{CommandExecutor, command_succeeds, failure_reason};
use crate::report::Reporter;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::rc::Rc;

/// Resolution used when rendering vector sources before downscaling.
const RENDER_DENSITY: &str = "384";

/// One required raster size and the vector source it is rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconTarget {
    /// Edge length in pixels.
    pub size: u32,
    /// Vector source file name, relative to the source root.
    pub source: String,
}

impl IconTarget {
    /// Raster output name; depends only on the size.
    #[must_use]
    pub fn raster_name(&self) -> String {
        format!("{}.png", self.size)
    }

    /// Name used when the vector source is staged unconverted.
    #[must_use]
    pub fn fallback_name(&self) -> String {
        format!("{}.svg", self.size)
    }
}

/// Ordered set of icon sizes the package must contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSpec {
    targets: Vec<IconTarget>,
}

impl Default for IconSpec {
    fn default() -> Self {
        Self::from_sizes(&[16, 48, 128])
    }
}

impl IconSpec {
    /// Build a spec whose sources follow the `icon<size>.svg` convention.
    #[must_use]
    pub fn from_sizes(sizes: &[u32]) -> Self {
        Self {
            targets: sizes
                .iter()
                .map(|&size| IconTarget {
                    size,
                    source: format!("icon{size}.svg"),
                })
                .collect(),
        }
    }

    /// Return the targets in ascending size order.
    #[must_use]
    pub fn targets(&self) -> &[IconTarget] {
        &self.targets
    }

    /// Map a vector source name to the raster file that replaces it.
    ///
    /// # Examples
    ///
    /// ```
    /// use web_notes_packager::icons::IconSpec;
    ///
    /// let spec = IconSpec::default();
    /// assert_eq!(spec.raster_for_source("icon48.svg").as_deref(), Some("48.png"));
    /// assert_eq!(spec.raster_for_source("logo.svg"), None);
    /// ```
    #[must_use]
    pub fn raster_for_source(&self, source: &str) -> Option<String> {
        self.targets
            .iter()
            .find(|target| target.source == source)
            .map(IconTarget::raster_name)
    }
}

/// A backend capable of rasterising a vector icon.
#[cfg_attr(test, mockall::automock)]
pub trait IconConverter {
    /// Short name used in diagnostics and configuration.
    fn name(&self) -> &'static str;

    /// Whether the backend can run on this host.
    fn is_available(&self) -> bool;

    /// Render `source` as a `size`×`size` PNG at `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to run or exits unsuccessfully.
    fn convert(&self, source: &Utf8Path, target: &Utf8Path, size: u32) -> Result<()>;
}

/// External converter programs, in default preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterTool {
    /// ImageMagick 7.
    Magick,
    /// ImageMagick 6 `convert` entry point.
    LegacyConvert,
    /// Inkscape 1.x command line.
    Inkscape,
}

impl ConverterTool {
    /// Resolve a configuration name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "magick" => Some(Self::Magick),
            "convert" => Some(Self::LegacyConvert),
            "inkscape" => Some(Self::Inkscape),
            _ => None,
        }
    }

    /// Program name, which doubles as the configuration name.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Magick => "magick",
            Self::LegacyConvert => "convert",
            Self::Inkscape => "inkscape",
        }
    }

    const fn probe_args(self) -> &'static [&'static str] {
        match self {
            Self::Magick | Self::LegacyConvert => &["-version"],
            Self::Inkscape => &["--version"],
        }
    }

    fn convert_args(self, source: &Utf8Path, target: &Utf8Path, size: u32) -> Vec<String> {
        match self {
            Self::Magick | Self::LegacyConvert => vec![
                "-background".to_owned(),
                "none".to_owned(),
                "-density".to_owned(),
                RENDER_DENSITY.to_owned(),
                source.to_string(),
                "-resize".to_owned(),
                format!("{size}x{size}"),
                target.to_string(),
            ],
            Self::Inkscape => vec![
                "--export-type=png".to_owned(),
                format!("--export-filename={target}"),
                format!("--export-width={size}"),
                format!("--export-height={size}"),
                source.to_string(),
            ],
        }
    }
}

/// An [`IconConverter`] backed by an external program.
pub struct ExternalConverter {
    tool: ConverterTool,
    executor: Rc<dyn CommandExecutor>,
}

impl ExternalConverter {
    /// Create a converter for `tool` that runs through `executor`.
    #[must_use]
    pub fn new(tool: ConverterTool, executor: Rc<dyn CommandExecutor>) -> Self {
        Self { tool, executor }
    }
}

impl IconConverter for ExternalConverter {
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

    fn convert(&self, source: &Utf8Path, target: &Utf8Path, size: u32) -> Result<()> {
        let args = self.tool.convert_args(source, target, size);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.executor.run(None, self.tool.program(), &args)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(PackagerError::IconConversionFailed {
                size,
                tool: self.name(),
                reason: failure_reason(&output),
            })
        }
    }
}

/// Build the converter chain for the configured (or default) order.
#[must_use]
pub fn converter_chain(
    names: Option<&[String]>,
    executor: &Rc<dyn CommandExecutor>,
) -> Vec<Box<dyn IconConverter>> {
    let defaults: Vec<String> = KNOWN_CONVERTERS.iter().map(|n| (*n).to_owned()).collect();
    names
        .unwrap_or(&defaults)
        .iter()
        .filter_map(|name| ConverterTool::from_name(name))
        .map(|tool| {
            Box::new(ExternalConverter::new(tool, Rc::clone(executor))) as Box<dyn IconConverter>
        })
        .collect()
}

/// What the icon stage produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconOutcome {
    /// Every size was rasterised by `tool`.
    Converted {
        /// Converter that produced the icons.
        tool: &'static str,
        /// Raster files written to staging.
        files: Vec<Utf8PathBuf>,
    },
    /// No converter was available; vector sources were staged instead.
    VectorFallback {
        /// Vector copies written to staging.
        files: Vec<Utf8PathBuf>,
    },
}

impl IconOutcome {
    /// Return the staged icon files.
    #[must_use]
    pub fn files(&self) -> &[Utf8PathBuf] {
        match self {
            Self::Converted { files, .. } | Self::VectorFallback { files } => files,
        }
    }
}

/// Produce the staged icons for `spec`.
///
/// Sources are read from `source_dir`; outputs land in `staging_dir`.
///
/// # Errors
///
/// Returns [`PackagerError::IconConversionFailed`] naming the size when the
/// selected converter fails or does not write its output file, and
/// [`PackagerError::Io`] when a fallback copy fails. Converter
/// unavailability is not an error.
pub fn convert_icons(
    spec: &IconSpec,
    source_dir: &Utf8Path,
    staging_dir: &Utf8Path,
    converters: &[Box<dyn IconConverter>],
    reporter: &mut Reporter<'_>,
) -> Result<IconOutcome> {
    let Some(converter) = converters.iter().find(|c| c.is_available()) else {
        return stage_vector_fallback(spec, source_dir, staging_dir, converters, reporter);
    };

    reporter.info(format!("Converting icons with {}...", converter.name()));
    let mut files = Vec::with_capacity(spec.targets().len());
    for target in spec.targets() {
        let source = source_dir.join(&target.source);
        let output = staging_dir.join(target.raster_name());

        converter
            .convert(&source, &output, target.size)
            .map_err(|e| match e {
                PackagerError::IconConversionFailed { .. } => e,
                other => PackagerError::IconConversionFailed {
                    size: target.size,
                    tool: converter.name(),
                    reason: other.to_string(),
                },
            })?;

        if !output.is_file() {
            return Err(PackagerError::IconConversionFailed {
                size: target.size,
                tool: converter.name(),
                reason: format!("{} was not created", target.raster_name()),
            });
        }
        reporter.info(format!("  {} -> {}", target.source, target.raster_name()));
        files.push(output);
    }

    reporter.success(format!("Converted {} icon(s)", files.len()));
    Ok(IconOutcome::Converted {
        tool: converter.name(),
        files,
    })
}

fn stage_vector_fallback(
    spec: &IconSpec,
    source_dir: &Utf8Path,
    staging_dir: &Utf8Path,
    converters: &[Box<dyn IconConverter>],
    reporter: &mut Reporter<'_>,
) -> Result<IconOutcome> {
    let tried: Vec<&str> = converters.iter().map(|c| c.name()).collect();
    let tried = if tried.is_empty() {
        "none configured".to_owned()
    } else {
        tried.join(", ")
    };
    reporter.warn(format!(
        "no icon converter available (tried: {tried}); staging vector icons, \
         manual PNG conversion required"
    ));

    let mut files = Vec::with_capacity(spec.targets().len());
    for target in spec.targets() {
        let output = staging_dir.join(target.fallback_name());
        fs::copy(source_dir.join(&target.source), &output)?;
        files.push(output);
    }
    reporter.warn(format!(
        "manifest references {} but staged icons are SVG",
        spec.targets()
            .iter()
            .map(IconTarget::raster_name)
            .collect::<Vec<_>>()
            .join(", ")
    ));
    Ok(IconOutcome::VectorFallback { files })
}

#[cfg(test)]
#[path = "icons_tests.rs"]
mod tests;
