//! File persistence for log lines
//!
//! One plain-text file per process run, named by start time. Until
//! `init_file_logging` succeeds, writes are silently dropped.

use chrono::Local;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

static LOG_FILE: Lazy<Mutex<Option<BufWriter<File>>>> = Lazy::new(|| Mutex::new(None));

/// Open `<dir>/walletscout_<timestamp>.log` for appending
pub fn init_file_logging(dir: &Path) -> Result<PathBuf, String> {
    fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create log directory {}: {}", dir.display(), e))?;

    let path = dir.join(format!(
        "walletscout_{}.log",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))?;

    *LOG_FILE.lock() = Some(BufWriter::new(file));
    Ok(path)
}

pub fn write_to_file(line: &str) {
    let mut guard = LOG_FILE.lock();
    if let Some(writer) = guard.as_mut() {
        // A failing log file must never take the run down with it
        if writeln!(writer, "{}", line).is_err() {
            *guard = None;
        }
    }
}

pub fn flush_file_logging() {
    if let Some(writer) = LOG_FILE.lock().as_mut() {
        let _ = writer.flush();
    }
}
