//! Reporter lines are mirrored to the `log` facade.
//!
//! Kept in its own test binary because `logtest` installs a process-wide
//! logger.

use log::Level;
use logtest::Logger;
use web_notes_packager::report::Reporter;

#[test]
fn reporter_mirrors_status_lines_to_log() {
    let mut logger = Logger::start();
    let mut buffer = Vec::new();
    let mut reporter = Reporter::new(&mut buffer, true);

    reporter.info("Checking source files in extension...");
    reporter.warn("declared file shared-api.js not found in extension; skipping");
    reporter.error("no archiver available; tried: zip, 7z, python3");
    drop(reporter);

    let mut records = Vec::new();
    while let Some(record) = logger.pop() {
        records.push((record.level(), record.args().to_string()));
    }

    assert!(records.contains(&(
        Level::Info,
        "Checking source files in extension...".to_owned()
    )));
    assert!(records.contains(&(
        Level::Warn,
        "declared file shared-api.js not found in extension; skipping".to_owned()
    )));
    assert!(records.contains(&(
        Level::Error,
        "no archiver available; tried: zip, 7z, python3".to_owned()
    )));

    let written = String::from_utf8_lossy(&buffer);
    assert!(!written.contains("[INFO]"), "quiet mode suppresses info");
    assert!(written.contains("[WARN] declared file shared-api.js"));
    assert!(written.contains("[ERROR] no archiver available"));
}
