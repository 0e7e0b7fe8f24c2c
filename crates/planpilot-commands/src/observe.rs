use chrono::Utc;
use planpilot_core::runtime_dir;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only command log plus optional verbose stderr output.
///
/// Logging is strictly best-effort: an unwritable log never takes a
/// command down with it.
pub struct Observer {
    log_path: PathBuf,
    verbose: bool,
}

impl Observer {
    pub fn new(workspace: &Path, verbose: bool) -> Self {
        let dir = runtime_dir(workspace);
        let _ = fs::create_dir_all(&dir);
        Self {
            log_path: dir.join("observe.log"),
            verbose,
        }
    }

    /// Record one line in the log, stamped with the current time.
    pub fn record(&self, msg: &str) {
        let _ = self.append_log_line(&format!("{} {msg}", Utc::now().to_rfc3339()));
    }

    /// Log to stderr with a `[planpilot]` prefix when verbose mode is on;
    /// always lands in the log file.
    pub fn verbose_log(&self, msg: &str) {
        if self.verbose {
            eprintln!("[planpilot] {msg}");
        }
        self.record(msg);
    }

    /// Warnings go to stderr unconditionally.
    pub fn warn_log(&self, msg: &str) {
        eprintln!("[planpilot WARN] {msg}");
        let _ = self.append_log_line(&format!("{} WARN {msg}", Utc::now().to_rfc3339()));
    }

    fn append_log_line(&self, line: &str) -> std::io::Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(f, "{line}")
    }
}
