//! Tests for packager CLI parsing and default behaviours.

use super::*;
use rstest::rstest;

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["web-notes-packager"]);
    assert!(cli.command.is_none());
    assert!(cli.build.source_dir.is_none());
    assert!(cli.build.output_dir.is_none());
    assert!(cli.build.product.is_none());
    assert!(cli.build.config.is_none());
    assert!(!cli.build.dry_run);
    assert_eq!(cli.build.verbosity, 0);
    assert!(!cli.build.quiet);
    assert_eq!(cli.invocation().0, Mode::Build);
}

#[test]
fn cli_parses_directories() {
    let cli = Cli::parse_from(["web-notes-packager", "-s", "ext", "--output-dir", "/tmp/out"]);
    assert_eq!(cli.build.source_dir, Some(Utf8PathBuf::from("ext")));
    assert_eq!(cli.build.output_dir, Some(Utf8PathBuf::from("/tmp/out")));
}

#[test]
fn cli_parses_build_subcommand() {
    let cli = Cli::parse_from(["web-notes-packager", "build", "--product", "notes"]);
    let (mode, args) = cli.invocation();
    assert_eq!(mode, Mode::Build);
    assert_eq!(args.product.as_deref(), Some("notes"));
}

#[test]
fn cli_parses_plan_subcommand() {
    let cli = Cli::parse_from(["web-notes-packager", "plan", "-c", "ci.toml"]);
    let (mode, args) = cli.invocation();
    assert_eq!(mode, Mode::Plan);
    assert_eq!(args.config_path(), Some(Utf8Path::new("ci.toml")));
}

#[rstest]
#[case::top_level(&["web-notes-packager", "--dry-run"])]
#[case::build(&["web-notes-packager", "build", "--dry-run"])]
fn dry_run_turns_a_build_into_a_plan(#[case] argv: &[&str]) {
    let cli = Cli::parse_from(argv.iter().copied());
    assert_eq!(cli.invocation().0, Mode::Plan);
}

#[test]
fn cli_counts_verbosity() {
    let cli = Cli::parse_from(["web-notes-packager", "-vv"]);
    assert_eq!(cli.build.verbosity, 2);
}

#[test]
fn quiet_conflicts_with_verbose() {
    let result = Cli::try_parse_from(["web-notes-packager", "-q", "-v"]);
    assert!(result.is_err());
}

#[rstest]
fn apply_overrides_only_given_values() {
    let args = BuildArgs {
        source_dir: Some(Utf8PathBuf::from("src/ext")),
        product: Some("Notes".to_owned()),
        ..BuildArgs::default()
    };
    let mut config = PackagerConfig::default();

    args.apply_to(&mut config);

    assert_eq!(config.source_dir, "src/ext");
    assert_eq!(config.output_dir, "dist");
    assert_eq!(config.product.as_deref(), Some("Notes"));
}
