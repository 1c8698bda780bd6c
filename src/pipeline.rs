//! Packaging pipeline orchestration.
//!
//! The pipeline runs its stages strictly in sequence:
//!
//! `Init → PreflightValidated → StagingPrepared → AssetsCollected →
//! IconsConverted → Packaged → Validated → Done`
//!
//! Any fatal error moves it to `Failed`. Pre-flight checks touch nothing on
//! disk. From `StagingPrepared` onwards the staging directory is held by a
//! [`StagingArea`] guard, so it is removed on every exit path, and the output
//! directory is held by a [`BuildLock`] so concurrent builds cannot collide.

use crate::archive::{Archiver, archiver_chain, build_archive};
use crate::collector::{AssetCollector, CollectedAssets};
use crate::config::{MANIFEST_FILE, PackagerConfig};
use crate::error::Result;
use crate::exec::{CommandExecutor, SystemCommandExecutor};
use crate::icons::{IconConverter, IconOutcome, IconSpec, convert_icons, converter_chain};
use crate::lock::BuildLock;
use crate::manifest::{ExtensionVersion, Manifest};
use crate::naming::PackageName;
use crate::policy::{FileSelectionPolicy, Selection};
use crate::preflight::validate_file_set;
use crate::report::{Reporter, success_message};
use crate::staging::StagingArea;
use crate::verify::{ArchiveEntry, PackageValidator};
use camino::Utf8PathBuf;
use log::debug;
use std::fmt;
use std::rc::Rc;

/// Pipeline progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Nothing has run yet.
    Init,
    /// Manifest and required files checked.
    PreflightValidated,
    /// Staging directory created.
    StagingPrepared,
    /// Production files copied and manifest rewritten.
    AssetsCollected,
    /// Icons rasterised or staged as vector fallbacks.
    IconsConverted,
    /// Archive written.
    Packaged,
    /// Archive checked.
    Validated,
    /// Build finished and staging removed.
    Done,
    /// A fatal error stopped the build.
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Icon converters and archivers available to a run, in preference order.
pub struct Toolbox {
    /// Icon conversion backends.
    pub converters: Vec<Box<dyn IconConverter>>,
    /// Archiving backends.
    pub archivers: Vec<Box<dyn Archiver>>,
}

impl Toolbox {
    /// Build the backend chains named in `config`, running external tools
    /// through `executor`.
    #[must_use]
    pub fn from_config(config: &PackagerConfig, executor: Rc<dyn CommandExecutor>) -> Self {
        Self {
            converters: converter_chain(config.converters.as_deref(), &executor),
            archivers: archiver_chain(config.archivers.as_deref(), &executor),
        }
    }

    /// Build the backend chains using host programs bounded by the
    /// configured tool timeout.
    #[must_use]
    pub fn system(config: &PackagerConfig) -> Self {
        let executor: Rc<dyn CommandExecutor> =
            Rc::new(SystemCommandExecutor::with_timeout(config.tool_timeout()));
        Self::from_config(config, executor)
    }
}

/// Outcome of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Absolute path of the archive.
    pub archive: Utf8PathBuf,
    /// Manifest version embedded in the archive name.
    pub version: ExtensionVersion,
    /// Archive size in bytes.
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 of the archive.
    pub sha256: String,
    /// Archive file entries.
    pub entries: Vec<ArchiveEntry>,
    /// What the icon stage produced.
    pub icons: IconOutcome,
    /// Files staged by the collector.
    pub collected: CollectedAssets,
    /// Every warning reported during the run.
    pub warnings: Vec<String>,
}

/// What a build would do, computed without writing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    /// Archive that would be produced.
    pub package: PackageName,
    /// Output directory.
    pub output_dir: Utf8PathBuf,
    /// Production file set.
    pub selection: Selection,
}

/// One packaging run over a configuration and a set of backends.
pub struct Pipeline<'a> {
    config: &'a PackagerConfig,
    toolbox: &'a Toolbox,
    icons: IconSpec,
    stage: PipelineStage,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline in the [`PipelineStage::Init`] state.
    #[must_use]
    pub fn new(config: &'a PackagerConfig, toolbox: &'a Toolbox) -> Self {
        Self {
            config,
            toolbox,
            icons: IconSpec::default(),
            stage: PipelineStage::Init,
        }
    }

    /// Return the current stage.
    #[must_use]
    pub const fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Run every stage and return the build report.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; the pipeline is then in
    /// [`PipelineStage::Failed`] and no staging directory remains.
    pub fn run(&mut self, reporter: &mut Reporter<'_>) -> Result<BuildReport> {
        match self.execute(reporter) {
            Ok(report) => {
                self.advance(PipelineStage::Done);
                reporter.success(success_message(
                    &report.archive,
                    report.size_bytes,
                    report.warnings.len(),
                ));
                Ok(report)
            }
            Err(e) => {
                self.advance(PipelineStage::Failed);
                Err(e)
            }
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        debug!("pipeline stage {} -> {next}", self.stage);
        self.stage = next;
    }

    fn execute(&mut self, reporter: &mut Reporter<'_>) -> Result<BuildReport> {
        let config = self.config;
        let source = config.source_dir.as_path();

        let (manifest, package) = preflight(config, reporter)?;
        let policy = FileSelectionPolicy::from_config(config)?;
        self.advance(PipelineStage::PreflightValidated);

        let _lock = BuildLock::acquire(&config.output_dir)?;
        let staging = StagingArea::create(&config.output_dir)?;
        self.advance(PipelineStage::StagingPrepared);

        let collected = AssetCollector::new(&policy, &self.icons).collect(
            source,
            staging.path(),
            &manifest,
            reporter,
        )?;
        self.advance(PipelineStage::AssetsCollected);

        let icons = convert_icons(
            &self.icons,
            source,
            staging.path(),
            &self.toolbox.converters,
            reporter,
        )?;
        self.advance(PipelineStage::IconsConverted);

        let archive = build_archive(
            staging.path(),
            &config.output_dir,
            &package.filename(),
            &self.toolbox.archivers,
            reporter,
        )?;
        self.advance(PipelineStage::Packaged);

        if let Err(e) = staging.close() {
            reporter.warn(e);
        }

        let validated = PackageValidator::new(config.size).validate(&archive, reporter)?;
        self.advance(PipelineStage::Validated);

        Ok(BuildReport {
            archive,
            version: package.version().clone(),
            size_bytes: validated.size_bytes,
            sha256: validated.sha256,
            entries: validated.entries,
            icons,
            collected,
            warnings: reporter.warnings().to_vec(),
        })
    }
}

/// Read-only checks that must pass before anything is written.
fn preflight(
    config: &PackagerConfig,
    reporter: &mut Reporter<'_>,
) -> Result<(Manifest, PackageName)> {
    let source = config.source_dir.as_path();
    reporter.info(format!("Checking source files in {source}..."));
    validate_file_set(source, &config.required_files)?;

    let manifest = Manifest::load(&source.join(MANIFEST_FILE))?;
    let version = manifest.version()?;
    let product = config.product.as_deref().unwrap_or_else(|| manifest.name());
    let package = PackageName::new(product, version);
    reporter.success(format!(
        "Manifest v{} valid: {} {}",
        manifest.manifest_version(),
        manifest.name(),
        package.version()
    ));
    Ok((manifest, package))
}

/// Compute the build plan for `config` without touching the output
/// directory.
///
/// # Errors
///
/// Returns the same pre-flight errors as [`Pipeline::run`].
pub fn plan(config: &PackagerConfig, reporter: &mut Reporter<'_>) -> Result<BuildPlan> {
    let (_, package) = preflight(config, reporter)?;
    let selection = FileSelectionPolicy::from_config(config)?.select(&config.source_dir)?;
    Ok(BuildPlan {
        package,
        output_dir: config.output_dir.clone(),
        selection,
    })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
