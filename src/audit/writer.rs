//! JSONL audit log writer with daily file rotation.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};

use super::{AuditEntry, AuditLogger};
use crate::{AppError, Result};

/// Open output file together with the date it was opened for.
struct DayFile {
    date: NaiveDate,
    writer: BufWriter<File>,
}

/// A daily-rotating JSONL audit log writer.
///
/// Appends one JSON object per line to `<log_dir>/audit-YYYY-MM-DD.jsonl`
/// and opens a new file when the calendar date changes between writes.
pub struct JsonlAuditWriter {
    log_dir: PathBuf,
    current: Mutex<Option<DayFile>>,
}

impl JsonlAuditWriter {
    /// Construct a writer that stores logs in `log_dir`.
    ///
    /// Creates `log_dir` and all parent directories if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the directory cannot be created.
    pub fn new(log_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&log_dir).map_err(|e| {
            AppError::Config(format!(
                "failed to create audit log directory {}: {e}",
                log_dir.display()
            ))
        })?;
        Ok(Self {
            log_dir,
            current: Mutex::new(None),
        })
    }

    fn open_day_file(log_dir: &Path, date: NaiveDate) -> Result<DayFile> {
        let path = log_dir.join(format!("audit-{date}.jsonl"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                AppError::Config(format!("failed to open audit log {}: {e}", path.display()))
            })?;
        Ok(DayFile {
            date,
            writer: BufWriter::new(file),
        })
    }
}

impl AuditLogger for JsonlAuditWriter {
    fn log_entry(&self, entry: AuditEntry) -> Result<()> {
        let today = Utc::now().date_naive();
        let line = serde_json::to_string(&entry)
            .map_err(|e| AppError::Config(format!("failed to serialize audit entry: {e}")))?;

        let mut guard = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let rotate = !matches!(guard.as_ref(), Some(day) if day.date == today);
        if rotate {
            *guard = Some(Self::open_day_file(&self.log_dir, today)?);
        }

        // The guard was just populated above when empty.
        let Some(day) = guard.as_mut() else {
            return Ok(());
        };
        writeln!(day.writer, "{line}")
            .map_err(|e| AppError::Config(format!("audit write failed: {e}")))?;
        day.writer
            .flush()
            .map_err(|e| AppError::Config(format!("audit flush failed: {e}")))?;

        Ok(())
    }
}
