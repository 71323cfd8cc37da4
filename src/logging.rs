//! Run logging
//!
//! Every run appends timestamped lines to the configured log file and
//! mirrors them to stdout, so both cron mail and the on-disk log tell
//! the same story.

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Timestamped line logger
#[derive(Debug)]
pub struct Logger {
    file: Option<PathBuf>,
    verbose: bool,
}

impl Logger {
    pub fn new(file: impl Into<PathBuf>, verbose: bool) -> Self {
        Self {
            file: Some(file.into()),
            verbose,
        }
    }

    /// Logger that only writes to stdout (used by tests and `check`)
    pub fn stdout_only() -> Self {
        Self {
            file: None,
            verbose: false,
        }
    }

    /// Log a line to stdout and the log file
    pub fn log(&self, msg: impl AsRef<str>) {
        let line = format!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), msg.as_ref());
        println!("{}", line);

        if let Some(path) = &self.file {
            // A broken log file must not break the run.
            if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
                let _ = writeln!(f, "{}", line);
            }
        }
    }

    /// Log only when verbose output is enabled
    pub fn debug(&self, msg: impl AsRef<str>) {
        if self.verbose {
            self.log(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_log_appends_to_file() {
        let path = std::env::temp_dir().join(format!("fleetwatch-log-{}.log", std::process::id()));
        fs::remove_file(&path).ok();

        let logger = Logger::new(&path, false);
        logger.log("first line");
        logger.log("second line");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("first line"));
        assert!(content.contains("second line"));
        assert_eq!(content.lines().count(), 2);

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_debug_respects_verbose_flag() {
        let path = std::env::temp_dir().join(format!("fleetwatch-dbg-{}.log", std::process::id()));
        fs::remove_file(&path).ok();

        let quiet = Logger::new(&path, false);
        quiet.debug("hidden");
        assert!(!path.exists());

        let verbose = Logger::new(&path, true);
        verbose.debug("shown");
        assert!(fs::read_to_string(&path).unwrap().contains("shown"));

        fs::remove_file(path).ok();
    }
}
