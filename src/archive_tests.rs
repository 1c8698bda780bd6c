//! Unit tests for archive construction and archiver selection.

use super::*;
use crate::test_utils::{ExpectedCall, StubExecutor};
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Workspace {
    _temp: TempDir,
    staging: Utf8PathBuf,
    output: Utf8PathBuf,
}

impl Workspace {
    fn destination(&self, filename: &str) -> Utf8PathBuf {
        self.output
            .canonicalize_utf8()
            .expect("canonical output dir")
            .join(filename)
    }
}

#[fixture]
fn workspace() -> Workspace {
    let temp = TempDir::new().expect("create temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp dir");
    let staging = root.join("staging");
    let output = root.join("dist");
    fs::create_dir_all(staging.join("libs")).expect("create staging");
    fs::create_dir_all(&output).expect("create output");
    fs::write(staging.join("manifest.json"), "{}").expect("write manifest");
    fs::write(staging.join("16.png"), b"\x89PNG").expect("write icon");
    fs::write(staging.join("libs/marked.min.js"), "marked").expect("write lib");
    Workspace {
        _temp: temp,
        staging,
        output,
    }
}

fn build(ws: &Workspace, archivers: &[Box<dyn Archiver>]) -> Result<Utf8PathBuf> {
    let mut buffer = Vec::new();
    let mut reporter = Reporter::new(&mut buffer, true);
    build_archive(&ws.staging, &ws.output, "pkg.zip", archivers, &mut reporter)
}

fn entry_names(path: &Utf8Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(File::open(path).expect("open archive")).expect("read zip");
    let mut names: Vec<String> = archive.file_names().map(str::to_owned).collect();
    names.sort();
    names
}

fn unavailable(name: &'static str) -> Box<dyn Archiver> {
    let mut mock = MockArchiver::new();
    mock.expect_name().return_const(name);
    mock.expect_is_available().return_const(false);
    mock.expect_archive().never();
    Box::new(mock)
}

#[rstest]
fn embedded_archiver_roots_entries_at_staging(workspace: Workspace) {
    let path = build(&workspace, &[Box::new(EmbeddedArchiver)]).expect("archive builds");

    assert!(path.is_absolute());
    assert_eq!(path, workspace.destination("pkg.zip"));
    assert_eq!(
        entry_names(&path),
        ["16.png", "libs/marked.min.js", "manifest.json"]
    );
}

#[rstest]
fn embedded_archiver_deflates_entries(workspace: Workspace) {
    let path = build(&workspace, &[Box::new(EmbeddedArchiver)]).expect("archive builds");

    let mut archive =
        zip::ZipArchive::new(File::open(&path).expect("open archive")).expect("read zip");
    let entry = archive.by_name("libs/marked.min.js").expect("entry exists");
    assert_eq!(entry.compression(), CompressionMethod::Deflated);
}

#[rstest]
fn stale_archive_is_removed_before_building(workspace: Workspace) {
    let destination = workspace.destination("pkg.zip");
    fs::write(&destination, "stale").expect("write stale archive");

    let mut archiver = MockArchiver::new();
    archiver.expect_name().return_const("zip");
    archiver.expect_is_available().return_const(true);
    archiver
        .expect_archive()
        .times(1)
        .returning(|_, destination| {
            assert!(!destination.exists(), "stale archive survived");
            fs::write(destination, "fresh")?;
            Ok(())
        });

    build(&workspace, &[Box::new(archiver)]).expect("archive builds");
    assert_eq!(fs::read_to_string(&destination).expect("read"), "fresh");
}

#[rstest]
fn first_available_backend_wins(workspace: Workspace) {
    let mut python = MockArchiver::new();
    python.expect_name().return_const("python3");
    python.expect_is_available().return_const(true);
    python.expect_archive().times(1).returning(|_, destination| {
        fs::write(destination, "py")?;
        Ok(())
    });

    let mut embedded = MockArchiver::new();
    embedded.expect_name().return_const("embedded");
    embedded.expect_is_available().never();

    let archivers: Vec<Box<dyn Archiver>> = vec![
        unavailable("zip"),
        unavailable("7z"),
        Box::new(python),
        Box::new(embedded),
    ];
    build(&workspace, &archivers).expect("archive builds");
}

#[rstest]
fn no_backend_fails_without_leaving_an_archive(workspace: Workspace) {
    let destination = workspace.destination("pkg.zip");
    fs::write(&destination, "stale").expect("write stale archive");
    let archivers: Vec<Box<dyn Archiver>> =
        vec![unavailable("zip"), unavailable("7z"), unavailable("python3")];

    let err = build(&workspace, &archivers).expect_err("no archiver");

    assert!(
        matches!(&err, PackagerError::NoArchiverAvailable { tried } if tried == &["zip", "7z", "python3"]),
        "unexpected error: {err}"
    );
    assert!(!destination.exists());
}

#[rstest]
fn failed_backend_leaves_no_partial_archive(workspace: Workspace) {
    let mut archiver = MockArchiver::new();
    archiver.expect_name().return_const("7z");
    archiver.expect_is_available().return_const(true);
    archiver.expect_archive().returning(|_, destination| {
        fs::write(destination, "half")?;
        Err(std::io::Error::other("disk full").into())
    });

    let err = build(&workspace, &[Box::new(archiver)]).expect_err("archiving fails");

    assert!(matches!(err, PackagerError::ArchiveFailed { tool: "7z", .. }));
    assert!(err.to_string().contains("disk full"));
    assert!(!workspace.destination("pkg.zip").exists());
}

#[rstest]
fn silent_backend_without_output_is_a_failure(workspace: Workspace) {
    let mut archiver = MockArchiver::new();
    archiver.expect_name().return_const("zip");
    archiver.expect_is_available().return_const(true);
    archiver.expect_archive().returning(|_, _| Ok(()));

    let err = build(&workspace, &[Box::new(archiver)]).expect_err("no file produced");
    assert!(err.to_string().contains("pkg.zip was not created"));
}

#[rstest]
fn zip_cli_runs_inside_staging(workspace: Workspace) {
    let destination = workspace.destination("pkg.zip");
    let executor = Rc::new(StubExecutor::new(vec![
        ExpectedCall::new("zip", &["-q", "-r", "-X", destination.as_str(), "."])
            .in_dir(&workspace.staging)
            .failing("zip I/O error: No space left on device"),
    ]));
    let archiver = ExternalArchiver::new(ArchiverTool::Zip, executor.clone());

    let err = archiver
        .archive(&workspace.staging, &destination)
        .expect_err("stub reports failure");

    assert!(err.to_string().contains("No space left on device"));
    executor.assert_finished();
}

#[rstest]
fn seven_zip_requests_zip_format() {
    let args = ArchiverTool::SevenZip.archive_args(Utf8Path::new("/out/pkg.zip"));
    assert!(args.contains(&"-tzip"));
    assert_eq!(args.last(), Some(&"*"));
}

#[rstest]
#[case::zip(ArchiverTool::Zip, &["-v"])]
#[case::seven_zip(ArchiverTool::SevenZip, &["i"])]
#[case::python(ArchiverTool::Python, &["-c", "import zipfile"])]
fn probes_use_harmless_arguments(#[case] tool: ArchiverTool, #[case] args: &[&str]) {
    let executor = Rc::new(StubExecutor::new(vec![ExpectedCall::new(tool.program(), args)]));
    let archiver = ExternalArchiver::new(tool, executor.clone());
    assert!(archiver.is_available());
    executor.assert_finished();
}

#[rstest]
#[case::defaults(None, &["zip", "7z", "python3", "embedded"])]
#[case::strict(Some(vec!["zip".to_owned(), "7z".to_owned()]), &["zip", "7z"])]
fn chain_follows_configured_order(#[case] names: Option<Vec<String>>, #[case] expected: &[&str]) {
    let executor: Rc<dyn CommandExecutor> = Rc::new(StubExecutor::new(Vec::new()));
    let chain = archiver_chain(names.as_deref(), &executor);
    let actual: Vec<&str> = chain.iter().map(|a| a.name()).collect();
    assert_eq!(actual, expected);
}
