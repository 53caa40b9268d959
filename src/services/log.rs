use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

const INFO_MARK: &str = "🟢";
const ERROR_MARK: &str = "🔴";

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub owner: Option<String>,
    pub event: String,
    pub details: Option<String>,
}

/// Append-only history of what happened to monitoring requests.
///
/// One line per event:
/// `2025-10-01 12:00:00 UTC 🟢 notified U123 Hotel Landabout 2025-10-10..2025-10-15`
pub struct ActivityLogger {
    log_path: PathBuf,
}

impl ActivityLogger {
    /// `~/.roomwatch/activity.log`
    pub fn new() -> crate::Result<Self> {
        let user_dirs = directories::UserDirs::new().ok_or_else(|| {
            crate::error::RoomwatchError::storage_error(
                "initialization",
                "could not determine home directory",
            )
        })?;
        Self::at(user_dirs.home_dir().join(".roomwatch").join("activity.log"))
    }

    pub fn at(path: impl AsRef<Path>) -> crate::Result<Self> {
        let log_path = path.as_ref().to_path_buf();
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { log_path })
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    pub fn log(
        &self,
        level: LogLevel,
        owner: Option<&str>,
        event: &str,
        details: Option<&str>,
    ) -> crate::Result<()> {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            owner: owner.map(|o| o.to_string()),
            event: event.to_string(),
            details: details.map(|d| d.to_string()),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        let level_str = match entry.level {
            LogLevel::Info => INFO_MARK,
            LogLevel::Error => ERROR_MARK,
        };

        // keep one event per line
        let details_str = entry
            .details
            .as_deref()
            .unwrap_or("")
            .replace(['\r', '\n'], " ");

        writeln!(
            file,
            "{} {} {} {} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            level_str,
            entry.event,
            entry.owner.as_deref().unwrap_or("*"),
            details_str
        )?;

        Ok(())
    }

    /// Matching lines, newest first.
    pub fn read_logs(
        &self,
        owner_filter: Option<&str>,
        errors_only: bool,
    ) -> crate::Result<Vec<String>> {
        if !self.log_path.exists() {
            return Ok(vec![]);
        }

        let file = fs::File::open(&self.log_path)?;
        let reader = BufReader::new(file);
        let mut matching_lines = Vec::new();

        for line in reader.lines() {
            let line = line?;

            if errors_only && !line.contains(ERROR_MARK) {
                continue;
            }

            if let Some(owner) = owner_filter {
                // date, time, tz, mark, event, owner
                if line.split(' ').nth(5) != Some(owner) {
                    continue;
                }
            }

            matching_lines.push(line);
        }

        matching_lines.reverse();
        Ok(matching_lines)
    }

    pub fn info(
        &self,
        owner: Option<&str>,
        event: &str,
        details: Option<&str>,
    ) -> crate::Result<()> {
        self.log(LogLevel::Info, owner, event, details)
    }

    pub fn error(
        &self,
        owner: Option<&str>,
        event: &str,
        details: Option<&str>,
    ) -> crate::Result<()> {
        self.log(LogLevel::Error, owner, event, details)
    }

    /// Log and forget: a broken activity log must not break the caller.
    pub fn record(
        &self,
        level: LogLevel,
        owner: Option<&str>,
        event: &str,
        details: Option<&str>,
    ) {
        if let Err(e) = self.log(level, owner, event, details) {
            tracing::warn!(
                error = %e,
                path = %self.log_path.display(),
                "activity log write failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_owner_and_level_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLogger::at(dir.path().join("activity.log")).unwrap();
        log.info(Some("U1"), "watch", Some("Hotel A 2025-10-10..2025-10-15"))
            .unwrap();
        log.info(Some("U12"), "watch", None).unwrap();
        log.error(Some("U1"), "notify_failed", Some("status 500\nbody"))
            .unwrap();
        log.info(None, "cycle", Some("checked=2")).unwrap();

        let all = log.read_logs(None, false).unwrap();
        assert_eq!(all.len(), 4);
        assert!(all[0].contains("cycle"));

        let mine = log.read_logs(Some("U1"), false).unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine[0].contains("notify_failed"));
        assert!(mine[0].ends_with("status 500 body"));

        let errors = log.read_logs(None, true).unwrap();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLogger::at(dir.path().join("none.log")).unwrap();
        assert!(log.read_logs(None, false).unwrap().is_empty());
    }
}
