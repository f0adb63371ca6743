//! Append-only diagnostic log file.
//!
//! Every host component records lifecycle events here. Each call opens the
//! file, writes one line and closes it again; there is no buffering, no
//! rotation and no size bound. The line format is fixed:
//!
//! ```text
//! File: <path>, Line: <n>, Message: <text>, HRESULT: 0x<hex>
//! ```
//!
//! Records are mirrored to the [`log`] facade so the env_logger stream
//! carries timestamped copies of the same events. A failure to open the log
//! file is reported through `log::error!` and never escalated to the caller.

use std::fs::OpenOptions;
use std::io::Write;
use std::panic::Location;
use std::path::Path;

/// Relative path of the process-wide log file.
pub const LOG_FILE: &str = "logfile.txt";

/// Status code for a successful operation.
pub const STATUS_OK: u32 = 0x0;
/// Status code for a generic failure.
pub const STATUS_FAIL: u32 = 0x8000_4005;

/// Append one diagnostic line to the process-wide log file.
///
/// The source location is captured from the caller.
#[track_caller]
pub fn record(status: u32, message: &str) {
    let location = Location::caller();
    record_to(Path::new(LOG_FILE), status, message, location);
}

/// Append one diagnostic line to the file at `path`.
///
/// Split out from [`record`] so tests can point the logger at a scratch file.
pub fn record_to(path: &Path, status: u32, message: &str, location: &Location<'_>) {
    log::debug!(
        target: "overlay_host::status",
        "{} ({}:{}) status 0x{:x}",
        message,
        location.file(),
        location.line(),
        status
    );

    let file = OpenOptions::new().append(true).create(true).open(path);
    match file {
        Ok(mut file) => {
            let line = format_record(status, message, location);
            if let Err(e) = writeln!(file, "{}", line) {
                log::error!("failed to write log record to {}: {}", path.display(), e);
            }
        }
        Err(e) => {
            log::error!("failed to open log file {}: {}", path.display(), e);
        }
    }
}

fn format_record(status: u32, message: &str, location: &Location<'_>) -> String {
    format!(
        "File: {}, Line: {}, Message: {}, HRESULT: 0x{:x}",
        location.file(),
        location.line(),
        message,
        status
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("overlay-host-{}-{}", name, std::process::id()));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn record_writes_expected_line_format() {
        let path = scratch_path("format");
        record_to(&path, STATUS_FAIL, "device creation rejected", Location::caller());
        let contents = fs::read_to_string(&path).unwrap();
        let line = contents.lines().next().unwrap();
        assert!(line.starts_with("File: "));
        assert!(line.contains(", Line: "));
        assert!(line.contains(", Message: device creation rejected, "));
        assert!(line.ends_with("HRESULT: 0x80004005"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn record_appends_across_calls() {
        let path = scratch_path("append");
        record_to(&path, STATUS_OK, "first", Location::caller());
        record_to(&path, STATUS_OK, "second", Location::caller());
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Message: first,"));
        assert!(lines[1].contains("Message: second,"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_parent_directory_is_not_fatal() {
        let mut path = std::env::temp_dir();
        path.push("overlay-host-no-such-dir");
        path.push("logfile.txt");
        // Must not panic; the failure goes to the log facade only.
        record_to(&path, STATUS_OK, "orphan", Location::caller());
    }

    #[test]
    fn status_code_is_written_in_hex() {
        let line = format_record(0xdead_beef, "hex check", Location::caller());
        assert!(line.ends_with("HRESULT: 0xdeadbeef"));
    }
}
