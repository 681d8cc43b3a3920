//! Debug logging to a file
//!
//! The prompt owns stderr, so debug logs go to a file instead. Installed
//! only when --debug is passed; otherwise the log macros are no-ops.

use anyhow::Result;
use chrono::Utc;
use log::{Level, LevelFilter, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

struct FileLogger {
    file: Mutex<File>,
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(
                f,
                "[{}] {} {}: {}",
                Utc::now().to_rfc3339(),
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        if let Ok(mut f) = self.file.lock() {
            let _ = f.flush();
        }
    }
}

/// Default log file location, under the system temp dir.
pub fn default_log_file() -> PathBuf {
    std::env::temp_dir().join("s3nav.log")
}

pub fn init(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    log::set_boxed_logger(Box::new(FileLogger {
        file: Mutex::new(file),
    }))?;
    log::set_max_level(LevelFilter::Debug);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_writes_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nav.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        let logger = FileLogger {
            file: Mutex::new(file),
        };

        log::Log::log(
            &logger,
            &Record::builder()
                .level(Level::Debug)
                .target("s3nav::cache")
                .args(format_args!("cache miss"))
                .build(),
        );
        log::Log::flush(&logger);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("DEBUG s3nav::cache: cache miss"));
    }
}
