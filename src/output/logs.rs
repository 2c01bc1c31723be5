//! zmap log lines: `<month> <day> <time> [<SEVERITY>] <message>`.
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use log::debug;
use serde_derive::Serialize;

use crate::error::{Result, ScanError};

const TIMESTAMP_FORMAT: &str = "%Y %b %d %H:%M:%S%.f";
const LOG_FILE_NAME_FORMAT: &str = "zmap-%Y-%m-%dT%H%M%S%z.log";

/// Severity of a log entry, in zmap's order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Warning,
    Info,
    Fatal,
}

impl LogLevel {
    pub const ALL: [Self; 5] = [
        Self::Trace,
        Self::Debug,
        Self::Warning,
        Self::Info,
        Self::Fatal,
    ];

    /// The bracketed token zmap prints for this level.
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Trace => "[TRACE]",
            Self::Debug => "[DEBUG]",
            Self::Warning => "[WARN]",
            Self::Info => "[INFO]",
            Self::Fatal => "[FATAL]",
        }
    }

    fn classify(line: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| line.contains(level.marker()))
    }
}

/// One timestamped diagnostic line emitted by the engine.
///
/// zmap does not print the year; entries carry the year they were parsed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub time: NaiveDateTime,
    pub level: LogLevel,
    pub message: String,
}

/// Log entries of one run, split by severity, each in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogEntries {
    pub trace: Vec<LogEntry>,
    pub debug: Vec<LogEntry>,
    pub warning: Vec<LogEntry>,
    pub info: Vec<LogEntry>,
    pub fatal: Vec<LogEntry>,
}

impl LogEntries {
    pub fn level(&self, level: LogLevel) -> &[LogEntry] {
        match level {
            LogLevel::Trace => &self.trace,
            LogLevel::Debug => &self.debug,
            LogLevel::Warning => &self.warning,
            LogLevel::Info => &self.info,
            LogLevel::Fatal => &self.fatal,
        }
    }

    fn push(&mut self, entry: LogEntry) {
        let bucket = match entry.level {
            LogLevel::Trace => &mut self.trace,
            LogLevel::Debug => &mut self.debug,
            LogLevel::Warning => &mut self.warning,
            LogLevel::Info => &mut self.info,
            LogLevel::Fatal => &mut self.fatal,
        };
        bucket.push(entry);
    }

    pub fn len(&self) -> usize {
        LogLevel::ALL.iter().map(|l| self.level(*l).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parses every line carrying one of the five severity markers. Other lines
/// (status updates, stray output) are skipped.
pub fn parse_logs(text: &str, year: i32) -> Result<LogEntries> {
    let mut entries = LogEntries::default();
    for line in text.lines() {
        if let Some(level) = LogLevel::classify(line) {
            entries.push(parse_log_line(line, level, year)?);
        }
    }
    Ok(entries)
}

fn parse_log_line(line: &str, level: LogLevel, year: i32) -> Result<LogEntry> {
    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() < 4 {
        return Err(ScanError::MalformedLogLine(line.to_owned()));
    }

    let stamp = format!("{year} {}", parts[..3].join(" "));
    let time = NaiveDateTime::parse_from_str(&stamp, TIMESTAMP_FORMAT).map_err(|source| {
        ScanError::LogTimestamp {
            line: line.to_owned(),
            source,
        }
    })?;

    Ok(LogEntry {
        time,
        level,
        message: parts[4..].join(" "),
    })
}

/// Picks the most recent `zmap-<timestamp>.log` name; other names are
/// ignored.
pub fn pick_latest<'a, I>(names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter_map(|name| {
            DateTime::parse_from_str(name, LOG_FILE_NAME_FORMAT)
                .ok()
                .map(|stamp| (stamp, name))
        })
        .max_by_key(|(stamp, _)| *stamp)
        .map(|(_, name)| name)
}

/// The most recent zmap log file in `directory`.
pub async fn latest_log_file(directory: &Path) -> Result<PathBuf> {
    let io_error = |source| ScanError::Io {
        path: directory.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(directory).await.map_err(io_error)?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let is_file = entry.file_type().await.map_err(io_error)?.is_file();
        if is_file {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    let latest = pick_latest(names.iter().map(String::as_str))
        .ok_or_else(|| ScanError::NoLogFile(directory.to_path_buf()))?;
    debug!("Latest log file in {}: {}", directory.display(), latest);
    Ok(directory.join(latest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE: &str = "\
Jan 02 15:04:05.123 [INFO] zmap: output module: csv
Jan 02 15:04:05.124 [DEBUG] send: send thread 0 starting
 0:01 12%; send: 10 done (10 p/s avg); recv: 2 2 p/s (2 p/s avg); hitrate: 20.00%
Jan 02 15:04:05.125 [TRACE] recv: capture started
Jan 02 15:04:05.126 [WARN] blacklist: using the default blacklist
Jan 02 15:04:05.127 [FATAL] recv: could not open device
Jan 02 15:04:05.128 [INFO] zmap: completed
";

    #[test]
    fn parse_logs_splits_by_severity() {
        let entries = parse_logs(SAMPLE, 2024).unwrap();

        assert_eq!(entries.len(), 6);
        assert_eq!(entries.trace.len(), 1);
        assert_eq!(entries.debug.len(), 1);
        assert_eq!(entries.warning.len(), 1);
        assert_eq!(entries.fatal.len(), 1);
        assert_eq!(
            entries
                .info
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>(),
            vec!["zmap: output module: csv", "zmap: completed"]
        );
    }

    #[test]
    fn timestamp_uses_given_year() {
        let entries = parse_logs(SAMPLE, 2024).unwrap();
        let first = &entries.info[0];

        assert_eq!(first.time.date(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(first.time.hour(), 15);
        assert_eq!(first.time.nanosecond(), 123_000_000);
        assert_eq!(first.level, LogLevel::Info);
    }

    #[test]
    fn lines_without_markers_are_skipped() {
        let entries = parse_logs("hello\n\n 0:00 0%; send: 0\n", 2024).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let err = parse_logs("Foo 99 25:00:00.000 [INFO] nope\n", 2024).unwrap_err();
        assert!(matches!(err, ScanError::LogTimestamp { .. }));
    }

    #[test]
    fn short_marked_line_is_an_error() {
        let err = parse_logs("[INFO] nope\n", 2024).unwrap_err();
        assert!(matches!(err, ScanError::MalformedLogLine(_)));
    }

    #[test]
    fn marker_without_message_gives_empty_message() {
        let entries = parse_logs("Jan 02 15:04:05.123 [INFO]\n", 2024).unwrap();
        assert_eq!(entries.info[0].message, "");
    }

    #[test]
    fn pick_latest_ignores_foreign_names() {
        let names = [
            "zmap-2020-01-01T000000+0000.log",
            "notes.txt",
            "zmap-2024-06-01T120000+0000.log",
            "zmap-2023-12-31T235959+0000.log",
            "zmap-latest.log",
        ];
        assert_eq!(
            pick_latest(names),
            Some("zmap-2024-06-01T120000+0000.log")
        );
        assert_eq!(pick_latest(["notes.txt"]), None);
    }

    #[test]
    fn pick_latest_compares_across_offsets() {
        let names = [
            "zmap-2024-06-01T120000+0000.log",
            "zmap-2024-06-01T130000+0200.log",
        ];
        assert_eq!(
            pick_latest(names),
            Some("zmap-2024-06-01T120000+0000.log")
        );
    }

    #[tokio::test]
    async fn latest_log_file_in_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("zmap-2020-01-01T000000+0000.log"), "").unwrap();
        fs::write(dir.path().join("zmap-2021-01-01T000000+0000.log"), "").unwrap();
        fs::create_dir(dir.path().join("zmap-2030-01-01T000000+0000.log")).unwrap();

        let latest = latest_log_file(dir.path()).await.unwrap();
        assert_eq!(
            latest,
            dir.path().join("zmap-2021-01-01T000000+0000.log")
        );
    }

    #[tokio::test]
    async fn empty_log_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let err = latest_log_file(dir.path()).await.unwrap_err();
        assert!(matches!(err, ScanError::NoLogFile(_)));
    }
}
