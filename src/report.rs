//! Human-readable status stream.
//!
//! Every pipeline event is written as one line with a severity marker
//! (`[INFO]`, `[OK]`, `[WARN]`, `[ERROR]`) and mirrored to the `log` facade
//! so embedding applications can route diagnostics through their own
//! logger. Quiet mode drops info and success lines; warnings and errors are
//! always written.

use camino::Utf8Path;
use log::{error, info, warn};
use std::fmt;
use std::io::Write;

/// Severity of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Progress information.
    Info,
    /// A stage completed.
    Success,
    /// Degraded but non-fatal condition.
    Warning,
    /// Fatal condition; the build stops.
    Error,
}

impl Severity {
    /// Marker printed at the start of the line.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Info => "[INFO]",
            Self::Success => "[OK]",
            Self::Warning => "[WARN]",
            Self::Error => "[ERROR]",
        }
    }
}

/// Writes severity-marked status lines and remembers warnings.
pub struct Reporter<'a> {
    out: &'a mut dyn Write,
    quiet: bool,
    warnings: Vec<String>,
}

impl<'a> Reporter<'a> {
    /// Create a reporter writing to `out`.
    pub fn new(out: &'a mut dyn Write, quiet: bool) -> Self {
        Self {
            out,
            quiet,
            warnings: Vec::new(),
        }
    }

    /// Report progress.
    pub fn info(&mut self, message: impl fmt::Display) {
        info!("{message}");
        self.emit(Severity::Info, &message);
    }

    /// Report a completed stage.
    pub fn success(&mut self, message: impl fmt::Display) {
        info!("{message}");
        self.emit(Severity::Success, &message);
    }

    /// Report a non-fatal problem; it is kept for the build summary.
    pub fn warn(&mut self, message: impl fmt::Display) {
        warn!("{message}");
        self.warnings.push(message.to_string());
        self.emit(Severity::Warning, &message);
    }

    /// Report a fatal problem.
    pub fn error(&mut self, message: impl fmt::Display) {
        error!("{message}");
        self.emit(Severity::Error, &message);
    }

    /// Write an unmarked line (summaries, listings), honouring quiet mode.
    pub fn plain(&mut self, message: impl fmt::Display) {
        if !self.quiet {
            write_line(self.out, &message);
        }
    }

    /// Warnings reported so far, in order.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn emit(&mut self, severity: Severity, message: &dyn fmt::Display) {
        let suppressed = self.quiet && matches!(severity, Severity::Info | Severity::Success);
        if !suppressed {
            write_line(self.out, &format_args!("{} {message}", severity.marker()));
        }
    }
}

fn write_line(out: &mut dyn Write, message: &dyn fmt::Display) {
    if writeln!(out, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Format a byte count as `B`, `KB` or `MB` with two decimals.
///
/// # Examples
///
/// ```
/// use web_notes_packager::report::human_size;
///
/// assert_eq!(human_size(512), "512 B");
/// assert_eq!(human_size(1536), "1.50 KB");
/// assert_eq!(human_size(3 * 1024 * 1024), "3.00 MB");
/// ```
#[must_use]
pub fn human_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * KIB;

    let (unit, scale) = if bytes >= MIB {
        ("MB", MIB)
    } else if bytes >= KIB {
        ("KB", KIB)
    } else {
        return format!("{bytes} B");
    };
    let hundredths = u128::from(bytes) * 100 / u128::from(scale);
    format!("{}.{:02} {unit}", hundredths / 100, hundredths % 100)
}

/// Format the closing line of a successful build.
#[must_use]
pub fn success_message(archive: &Utf8Path, bytes: u64, warnings: usize) -> String {
    let suffix = match warnings {
        0 => String::new(),
        1 => " with 1 warning".to_owned(),
        n => format!(" with {n} warnings"),
    };
    format!(
        "Package ready: {archive} ({}){suffix}",
        human_size(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lines(buffer: &[u8]) -> Vec<String> {
        String::from_utf8_lossy(buffer)
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[rstest]
    fn every_severity_has_a_distinct_marker() {
        let mut buffer = Vec::new();
        let mut reporter = Reporter::new(&mut buffer, false);
        reporter.info("copying");
        reporter.success("copied");
        reporter.warn("optional file missing");
        reporter.error("manifest missing");

        assert_eq!(
            lines(&buffer),
            [
                "[INFO] copying",
                "[OK] copied",
                "[WARN] optional file missing",
                "[ERROR] manifest missing",
            ]
        );
    }

    #[rstest]
    fn quiet_mode_keeps_only_warnings_and_errors() {
        let mut buffer = Vec::new();
        let mut reporter = Reporter::new(&mut buffer, true);
        reporter.info("copying");
        reporter.success("copied");
        reporter.plain("summary");
        reporter.warn("slow");
        reporter.error("broken");

        assert_eq!(lines(&buffer), ["[WARN] slow", "[ERROR] broken"]);
    }

    #[rstest]
    fn warnings_are_remembered() {
        let mut buffer = Vec::new();
        let mut reporter = Reporter::new(&mut buffer, true);
        reporter.warn("first");
        reporter.info("ignored");
        reporter.warn("second");

        assert_eq!(reporter.warnings(), ["first", "second"]);
    }

    #[rstest]
    #[case::bytes(0, "0 B")]
    #[case::just_below_kib(1023, "1023 B")]
    #[case::one_kib(1024, "1.00 KB")]
    #[case::fractional_kib(10_342, "10.09 KB")]
    #[case::ten_mib(10 * 1024 * 1024, "10.00 MB")]
    fn human_size_picks_a_unit(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(human_size(bytes), expected);
    }

    #[rstest]
    #[case::clean(0, "Package ready: dist/a.zip (2.00 KB)")]
    #[case::one_warning(1, "Package ready: dist/a.zip (2.00 KB) with 1 warning")]
    #[case::many_warnings(3, "Package ready: dist/a.zip (2.00 KB) with 3 warnings")]
    fn success_message_pluralises_warnings(#[case] warnings: usize, #[case] expected: &str) {
        assert_eq!(
            success_message(Utf8Path::new("dist/a.zip"), 2048, warnings),
            expected
        );
    }
}
