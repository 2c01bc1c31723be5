//! Error types returned by every public operation of the crate.
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Why a filesystem pre-check rejected a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathProblem {
    /// Nothing exists at the path.
    Missing,
    /// The path names a directory where a file is expected.
    IsDirectory,
    /// The path names a file where a directory is expected.
    NotADirectory,
    /// The path does not exist and neither does its parent directory.
    ParentMissing,
}

impl std::fmt::Display for PathProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Missing => "does not exist",
            Self::IsDirectory => "is a directory",
            Self::NotADirectory => "is not a directory",
            Self::ParentMissing => "has no existing parent directory",
        };
        f.write_str(text)
    }
}

/// A malformed or conflicting option, reported at the point it is applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    #[error("found already added {0} argument, zmap does not allow multiple {0} values")]
    Duplicate(&'static str),

    #[error("{flag} and {other} cannot be specified simultaneously")]
    Conflict {
        flag: &'static str,
        other: &'static str,
    },

    #[error("given {flag} value {value:?} is not a numeric value")]
    NotNumeric { flag: &'static str, value: String },

    #[error("given {flag} value {value:?} is not a valid decimal number")]
    NotDecimal { flag: &'static str, value: String },

    #[error("given {flag} value {value:?} must be between {min} and {max}")]
    OutOfRange {
        flag: &'static str,
        value: String,
        min: i64,
        max: i64,
    },

    #[error("given {flag} range {value:?} is invalid: {reason}")]
    InvalidRange {
        flag: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("given value {0:?} is not a valid ipv4 address or ipv4 cidr notation")]
    InvalidTarget(String),

    #[error("given {flag} value {value:?} is not a valid ipv4 address")]
    InvalidIpv4 { flag: &'static str, value: String },

    #[error("given {flag} value {value:?} is not a valid mac address")]
    InvalidMac { flag: &'static str, value: String },

    #[error("given {flag} path {path:?} {problem}")]
    Path {
        flag: &'static str,
        path: PathBuf,
        problem: PathProblem,
    },

    #[error("given probe module {0:?} is not in available probe modules")]
    UnknownProbeModule(String),

    #[error("given output module {0:?} is not in available output modules")]
    UnknownOutputModule(String),

    #[error("given field {0:?} is not in available output fields")]
    UnknownOutputField(String),

    #[error("given interface name {0:?} is not available on the system")]
    UnknownInterface(String),

    #[error("cannot enumerate network interfaces: {0}")]
    InterfacesUnavailable(String),

    #[error("core index {0:?} is not available on the system")]
    UnknownCore(String),

    #[error("{0} requires at least one value")]
    Empty(&'static str),
}

/// Everything that can go wrong while building a scanner, running the engine
/// or interpreting what it wrote.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("zmap binary was not found")]
    EngineNotFound,

    #[error("given binary path {0:?} does not exist")]
    BinaryMissing(PathBuf),

    #[error("given binary {0:?} is not a real zmap binary")]
    NotEngine(PathBuf),

    #[error("{0} is already set on this scanner")]
    AlreadyConfigured(&'static str),

    #[error(transparent)]
    Option(#[from] OptionError),

    #[error("failed to start zmap: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed while waiting for zmap: {0}")]
    Wait(#[source] std::io::Error),

    #[error("zmap scan timed out")]
    Timeout,

    #[error("a scan was already started on this scanner")]
    AlreadyStarted,

    #[error("no scan was started on this scanner")]
    NotStarted,

    /// A repeated wait on a scanner whose run failed; carries the first error.
    #[error("the scan on this scanner already failed: {0}")]
    PreviousFailure(String),

    #[error("`zmap {command}` exited with {status}: {stderr}")]
    Engine {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("unexpected zmap --version output {0:?}")]
    UnexpectedVersion(String),

    #[error("unexpected line {line:?} in `zmap {command}` output")]
    Introspection {
        command: &'static str,
        line: String,
    },

    #[error("cannot parse timestamp of log line {line:?}: {source}")]
    LogTimestamp {
        line: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("malformed log line {0:?}")]
    MalformedLogLine(String),

    #[error("no zmap log file found in {0:?}")]
    NoLogFile(PathBuf),

    #[error("malformed result row: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file {path:?}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("background scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ScanError {
    /// Whether the run was cut short by the scanner's context.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ScanError>;
