//! Unit tests for icon conversion and converter selection.

use super::*;
use crate::test_utils::{ExpectedCall, StubExecutor};
use rstest::{fixture, rstest};
use tempfile::TempDir;

/// Source and staging directories with the three vector icons in place.
struct IconDirs {
    _temp: TempDir,
    source: Utf8PathBuf,
    staging: Utf8PathBuf,
}

#[fixture]
fn dirs() -> IconDirs {
    let temp = TempDir::new().expect("failed to create temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("temp dir is UTF-8");
    let source = root.join("extension");
    let staging = root.join("staging");
    fs::create_dir_all(&source).expect("create source");
    fs::create_dir_all(&staging).expect("create staging");
    for size in [16, 48, 128] {
        fs::write(source.join(format!("icon{size}.svg")), format!("<svg id=\"{size}\"/>"))
            .expect("write icon");
    }
    IconDirs {
        _temp: temp,
        source,
        staging,
    }
}

fn unavailable(name: &'static str) -> Box<dyn IconConverter> {
    let mut mock = MockIconConverter::new();
    mock.expect_name().return_const(name);
    mock.expect_is_available().times(1).return_const(false);
    mock.expect_convert().never();
    Box::new(mock)
}

fn writing_converter(name: &'static str) -> Box<dyn IconConverter> {
    let mut mock = MockIconConverter::new();
    mock.expect_name().return_const(name);
    mock.expect_is_available().times(1).return_const(true);
    mock.expect_convert().times(3).returning(|_, target, _| {
        fs::write(target, b"\x89PNG")?;
        Ok(())
    });
    Box::new(mock)
}

fn convert(dirs: &IconDirs, converters: &[Box<dyn IconConverter>]) -> (Result<IconOutcome>, Vec<String>) {
    let mut buffer = Vec::new();
    let mut reporter = Reporter::new(&mut buffer, false);
    let result = convert_icons(
        &IconSpec::default(),
        &dirs.source,
        &dirs.staging,
        converters,
        &mut reporter,
    );
    let warnings = reporter.warnings().to_vec();
    (result, warnings)
}

#[rstest]
fn default_spec_covers_store_sizes() {
    let sizes: Vec<u32> = IconSpec::default().targets().iter().map(|t| t.size).collect();
    assert_eq!(sizes, [16, 48, 128]);
}

#[rstest]
fn output_names_depend_only_on_size() {
    let target = IconTarget {
        size: 48,
        source: "logo-large.svg".to_owned(),
    };
    assert_eq!(target.raster_name(), "48.png");
    assert_eq!(target.fallback_name(), "48.svg");
}

#[rstest]
fn first_available_converter_is_used(dirs: IconDirs) {
    let mut never_probed = MockIconConverter::new();
    never_probed.expect_name().return_const("inkscape");
    never_probed.expect_is_available().never();

    let converters: Vec<Box<dyn IconConverter>> = vec![
        unavailable("magick"),
        writing_converter("convert"),
        Box::new(never_probed),
    ];

    let (result, warnings) = convert(&dirs, &converters);

    let outcome = result.expect("conversion succeeds");
    assert!(matches!(outcome, IconOutcome::Converted { tool: "convert", .. }));
    assert!(warnings.is_empty());
    for name in ["16.png", "48.png", "128.png"] {
        assert!(dirs.staging.join(name).is_file(), "{name} missing");
    }
}

#[rstest]
fn missing_output_is_fatal_for_that_size(dirs: IconDirs) {
    let mut lazy = MockIconConverter::new();
    lazy.expect_name().return_const("magick");
    lazy.expect_is_available().return_const(true);
    lazy.expect_convert().times(1).returning(|_, _, _| Ok(()));

    let (result, _) = convert(&dirs, &[Box::new(lazy)]);

    let err = result.expect_err("conversion should fail");
    assert!(
        matches!(err, PackagerError::IconConversionFailed { size: 16, tool: "magick", .. }),
        "unexpected error: {err}"
    );
}

#[rstest]
fn converter_failure_names_the_size(dirs: IconDirs) {
    let mut flaky = MockIconConverter::new();
    flaky.expect_name().return_const("inkscape");
    flaky.expect_is_available().return_const(true);
    flaky.expect_convert().returning(|_, target, size| {
        if size == 48 {
            return Err(std::io::Error::other("renderer crashed").into());
        }
        fs::write(target, b"\x89PNG")?;
        Ok(())
    });

    let (result, _) = convert(&dirs, &[Box::new(flaky)]);

    let err = result.expect_err("conversion should fail");
    assert!(
        matches!(err, PackagerError::IconConversionFailed { size: 48, .. }),
        "unexpected error: {err}"
    );
    assert!(err.to_string().contains("renderer crashed"));
}

#[rstest]
fn no_converter_falls_back_to_vector_copies(dirs: IconDirs) {
    let converters: Vec<Box<dyn IconConverter>> =
        vec![unavailable("magick"), unavailable("convert"), unavailable("inkscape")];

    let (result, warnings) = convert(&dirs, &converters);

    let outcome = result.expect("fallback is not fatal");
    assert!(matches!(outcome, IconOutcome::VectorFallback { .. }));
    assert_eq!(outcome.files().len(), 3);
    let staged = fs::read_to_string(dirs.staging.join("48.svg")).expect("read fallback");
    assert_eq!(staged, "<svg id=\"48\"/>");
    assert!(warnings.iter().any(|w| w.contains("manual PNG conversion")));
    assert!(warnings.iter().any(|w| w.contains("magick, convert, inkscape")));
}

#[rstest]
fn empty_chain_falls_back_too(dirs: IconDirs) {
    let (result, warnings) = convert(&dirs, &[]);
    assert!(matches!(result, Ok(IconOutcome::VectorFallback { .. })));
    assert!(warnings.iter().any(|w| w.contains("none configured")));
}

#[rstest]
fn magick_receives_resize_arguments() {
    let executor = Rc::new(StubExecutor::new(vec![
        ExpectedCall::new("magick", &["-version"]),
        ExpectedCall::new(
            "magick",
            &[
                "-background",
                "none",
                "-density",
                "384",
                "src/icon16.svg",
                "-resize",
                "16x16",
                "out/16.png",
            ],
        ),
    ]));
    let converter = ExternalConverter::new(ConverterTool::Magick, executor.clone());

    assert!(converter.is_available());
    converter
        .convert(Utf8Path::new("src/icon16.svg"), Utf8Path::new("out/16.png"), 16)
        .expect("conversion succeeds");
    executor.assert_finished();
}

#[rstest]
fn inkscape_exports_png_with_explicit_dimensions() {
    let executor = Rc::new(StubExecutor::new(vec![ExpectedCall::new(
        "inkscape",
        &[
            "--export-type=png",
            "--export-filename=out/128.png",
            "--export-width=128",
            "--export-height=128",
            "src/icon128.svg",
        ],
    )
    .failing("unknown option")]));
    let converter = ExternalConverter::new(ConverterTool::Inkscape, executor.clone());

    let err = converter
        .convert(Utf8Path::new("src/icon128.svg"), Utf8Path::new("out/128.png"), 128)
        .expect_err("non-zero exit should fail");
    assert!(err.to_string().contains("unknown option"));
    executor.assert_finished();
}

#[rstest]
fn missing_binary_is_unavailable() {
    let executor = Rc::new(StubExecutor::new(vec![
        ExpectedCall::new("convert", &["-version"]).not_found(),
    ]));
    let converter = ExternalConverter::new(ConverterTool::LegacyConvert, executor);
    assert!(!converter.is_available());
}

#[rstest]
#[case::defaults(None, &["magick", "convert", "inkscape"])]
#[case::custom(Some(vec!["inkscape".to_owned(), "magick".to_owned()]), &["inkscape", "magick"])]
fn chain_follows_configured_order(#[case] names: Option<Vec<String>>, #[case] expected: &[&str]) {
    let executor: Rc<dyn CommandExecutor> = Rc::new(StubExecutor::new(Vec::new()));
    let chain = converter_chain(names.as_deref(), &executor);
    let actual: Vec<&str> = chain.iter().map(|c| c.name()).collect();
    assert_eq!(actual, expected);
}
