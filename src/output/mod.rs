//! Turning what a finished zmap run left behind into log entries and result
//! records.
pub mod logs;
pub mod results;

use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};
use log::debug;
use serde_derive::Serialize;

use crate::arguments::Arguments;
use crate::error::{Result, ScanError};
use crate::options::{flag, STDOUT};

pub use logs::{LogEntries, LogEntry, LogLevel};
pub use results::ScanRecord;

/// Where a run's log lines end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    File(PathBuf),
    /// The newest `zmap-<timestamp>.log` inside the directory.
    Directory(PathBuf),
    Stderr,
}

/// Where a run's result rows end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultSource {
    File(PathBuf),
    Stdout,
}

/// What the argument list of a run says about its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub dryrun: bool,
    pub logs: LogSource,
    pub results: ResultSource,
    pub fields: Vec<String>,
}

impl OutputPlan {
    pub fn from_arguments(args: &Arguments) -> Self {
        let non_empty = |flag: &str| args.value_of(flag).filter(|value| !value.is_empty());

        let logs = if let Some(file) = non_empty(flag::LOG_FILE) {
            LogSource::File(PathBuf::from(file))
        } else if let Some(directory) = non_empty(flag::LOG_DIRECTORY) {
            LogSource::Directory(PathBuf::from(directory))
        } else {
            LogSource::Stderr
        };

        let results = match non_empty(flag::OUTPUT_FILE) {
            Some(file) if file != STDOUT => ResultSource::File(PathBuf::from(file)),
            _ => ResultSource::Stdout,
        };

        let fields = non_empty(flag::OUTPUT_FIELDS)
            .map(|fields| {
                fields
                    .split(',')
                    .map(|field| field.trim().to_owned())
                    .filter(|field| !field.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            dryrun: args.contains(flag::DRYRUN),
            logs,
            results,
            fields,
        }
    }
}

/// Everything one completed run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanOutput {
    pub results: Vec<ScanRecord>,
    pub logs: LogEntries,
    /// Exit code of the engine, `None` when it was ended by a signal.
    pub exit_code: Option<i32>,
}

impl ScanOutput {
    pub fn traces(&self) -> &[LogEntry] {
        &self.logs.trace
    }

    pub fn debugs(&self) -> &[LogEntry] {
        &self.logs.debug
    }

    pub fn warnings(&self) -> &[LogEntry] {
        &self.logs.warning
    }

    pub fn infos(&self) -> &[LogEntry] {
        &self.logs.info
    }

    pub fn fatals(&self) -> &[LogEntry] {
        &self.logs.fatal
    }
}

/// Reads the log and result sources named by `plan`, falling back to the
/// captured streams.
pub async fn interpret(
    plan: &OutputPlan,
    stdout: &[u8],
    stderr: &[u8],
) -> Result<(Vec<ScanRecord>, LogEntries)> {
    let log_text = match &plan.logs {
        LogSource::File(path) => read(path).await?,
        LogSource::Directory(directory) => {
            let latest = logs::latest_log_file(directory).await?;
            read(&latest).await?
        }
        LogSource::Stderr => stderr.to_vec(),
    };
    let entries = logs::parse_logs(&String::from_utf8_lossy(&log_text), Local::now().year())?;
    debug!("Parsed {} log entries from {:?}", entries.len(), plan.logs);

    if plan.dryrun {
        debug!("Dry run, skipping results");
        return Ok((Vec::new(), entries));
    }

    let records = match &plan.results {
        ResultSource::File(path) => results::parse_results(&read(path).await?, &plan.fields)?,
        ResultSource::Stdout => results::parse_results(stdout, &plan.fields)?,
    };
    debug!("Parsed {} result records from {:?}", records.len(), plan.results);

    Ok((records, entries))
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn plan(tokens: &[&str]) -> OutputPlan {
        let mut args = Arguments::new();
        args.extend(tokens.iter().map(ToString::to_string));
        OutputPlan::from_arguments(&args)
    }

    const LOGS: &[u8] = b"Jan 02 15:04:05.120 [INFO] zmap: started\n\
                          Jan 02 15:04:05.121 [DEBUG] send: thread ready\n";

    #[test]
    fn plan_defaults_to_standard_streams() {
        let plan = plan(&["1.1.1.1", "--output-fields", "saddr,sport"]);

        assert!(!plan.dryrun);
        assert_eq!(plan.logs, LogSource::Stderr);
        assert_eq!(plan.results, ResultSource::Stdout);
        assert_eq!(plan.fields, vec!["saddr", "sport"]);
    }

    #[test]
    fn plan_reads_files_and_directories() {
        let plan_file = plan(&["--log-file", "/tmp/zmap.log", "--output-file", "/tmp/out.csv"]);
        assert_eq!(plan_file.logs, LogSource::File("/tmp/zmap.log".into()));
        assert_eq!(plan_file.results, ResultSource::File("/tmp/out.csv".into()));

        let plan_dir = plan(&["--log-directory", "/var/log/zmap", "--dryrun"]);
        assert_eq!(plan_dir.logs, LogSource::Directory("/var/log/zmap".into()));
        assert!(plan_dir.dryrun);
    }

    #[test]
    fn dash_output_file_means_stdout() {
        assert_eq!(plan(&["--output-file", "-"]).results, ResultSource::Stdout);
    }

    #[test]
    fn flag_without_value_is_ignored() {
        let plan = plan(&["--log-file", "--dryrun"]);
        assert_eq!(plan.logs, LogSource::Stderr);
    }

    #[test]
    fn flag_text_in_a_value_is_not_read_as_a_flag() {
        let mut args = Arguments::new();
        args.push_pair(flag::NOTES, flag::DRYRUN);
        args.push_pair(flag::USER_METADATA, flag::LOG_FILE);
        args.push_pair(flag::OUTPUT_FIELDS, "saddr");

        let plan = OutputPlan::from_arguments(&args);

        assert!(!plan.dryrun);
        assert_eq!(plan.logs, LogSource::Stderr);
        assert_eq!(plan.fields, vec!["saddr"]);
    }

    #[tokio::test]
    async fn interpret_standard_streams() {
        let plan = plan(&["--output-fields", "saddr"]);
        let (records, entries) = interpret(&plan, b"1.1.1.1\n", LOGS).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["saddr"], "1.1.1.1");
        assert_eq!(entries.info.len(), 1);
        assert_eq!(entries.debug.len(), 1);
    }

    #[tokio::test]
    async fn interpret_dryrun_has_no_results() {
        let plan = plan(&["--dryrun", "--output-fields", "saddr"]);
        let (records, entries) = interpret(&plan, b"packet dump\n", LOGS).await.unwrap();

        assert!(records.is_empty());
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn interpret_files() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("zmap.log");
        let out = dir.path().join("out.csv");
        fs::write(&log, LOGS).unwrap();
        fs::write(&out, "saddr,sport\n1.1.1.1,80\n").unwrap();

        let plan = plan(&[
            "--log-file",
            log.to_str().unwrap(),
            "--output-file",
            out.to_str().unwrap(),
            "--output-fields",
            "saddr,sport",
        ]);
        let (records, entries) = interpret(&plan, b"ignored\n", b"").await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["sport"], "80");
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn interpret_latest_file_in_log_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("zmap-2020-01-01T000000+0000.log"), "").unwrap();
        fs::write(dir.path().join("zmap-2024-01-01T000000+0000.log"), LOGS).unwrap();

        let plan = plan(&[
            "--log-directory",
            dir.path().to_str().unwrap(),
            "--output-fields",
            "saddr",
        ]);
        let (_, entries) = interpret(&plan, b"", b"").await.unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn missing_output_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("never-written.csv");
        let plan = plan(&["--output-file", missing.to_str().unwrap()]);

        let err = interpret(&plan, b"", b"").await.unwrap_err();
        assert!(matches!(err, ScanError::Io { .. }));
    }
}
