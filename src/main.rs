//! Web Notes extension packager CLI entrypoint.
//!
//! Builds `<output>/<product>-extension-v<version>.zip` from the extension
//! source tree, or with `plan`/`--dry-run` shows what a build would package.

use clap::Parser;
use std::io::Write;
use web_notes_packager::cli::{Cli, Mode};
use web_notes_packager::config::PackagerConfig;
use web_notes_packager::error::Result;
use web_notes_packager::pipeline::{BuildReport, Pipeline, Toolbox, plan};
use web_notes_packager::report::Reporter;
use web_notes_packager::staging::install_interrupt_cleanup;

fn main() {
    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let (mode, args) = cli.invocation();
    let mut config = PackagerConfig::load(args.config_path())?;
    args.apply_to(&mut config);

    let mut reporter = Reporter::new(stderr, args.quiet);
    match mode {
        Mode::Plan => run_plan(&config, &mut reporter),
        Mode::Build => {
            install_interrupt_cleanup()?;
            let toolbox = Toolbox::system(&config);
            let report = Pipeline::new(&config, &toolbox).run(&mut reporter)?;
            if args.verbosity > 0 {
                print_staged_files(&report, &mut reporter);
            }
            Ok(())
        }
    }
}

/// Shows the resolved configuration and production file set.
fn run_plan(config: &PackagerConfig, reporter: &mut Reporter<'_>) -> Result<()> {
    let plan = plan(config, reporter)?;

    reporter.plain("");
    reporter.plain("Dry run - no files will be written");
    reporter.plain(format!("  Source:    {}", config.source_dir));
    reporter.plain(format!(
        "  Archive:   {}",
        plan.output_dir.join(plan.package.filename())
    ));
    reporter.plain(format!(
        "  Size warn: {} MB / {} MB",
        config.size.warn_mb, config.size.critical_mb
    ));
    reporter.plain("");
    reporter.plain(format!("Files to package ({}):", plan.selection.files.len()));
    for file in &plan.selection.files {
        reporter.plain(format!("  {file}"));
    }
    if !plan.selection.excluded.is_empty() {
        reporter.plain(format!("Excluded ({}):", plan.selection.excluded.len()));
        for file in &plan.selection.excluded {
            reporter.plain(format!("  {file}"));
        }
    }
    for missing in &plan.selection.missing {
        reporter.warn(format!("declared file {missing} not found; it will be skipped"));
    }
    for link in &plan.selection.links {
        reporter.warn(format!("{link} is a symbolic link; it will be skipped"));
    }
    Ok(())
}

fn print_staged_files(report: &BuildReport, reporter: &mut Reporter<'_>) {
    reporter.plain("");
    reporter.plain("Staged files:");
    for file in &report.collected.files {
        reporter.plain(format!("  {file}"));
    }
    for icon in report.icons.files() {
        if let Some(name) = icon.file_name() {
            reporter.plain(format!("  {name}"));
        }
    }
    if !report.collected.excluded.is_empty() {
        reporter.plain("Excluded:");
        for file in &report.collected.excluded {
            reporter.plain(format!("  {file}"));
        }
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            Reporter::new(stderr, false).error(err);
            1
        }
    }
}
