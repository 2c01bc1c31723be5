//! Locating the zmap binary and asking it about its own vocabulary.
//!
//! Every call re-invokes the engine; nothing is cached. These calls are not
//! bound to a scanner's [`ScanContext`](crate::context::ScanContext).
use std::env;
use std::path::{Path, PathBuf};

use log::debug;
use serde_derive::Serialize;
use tokio::process::Command;

use crate::error::{Result, ScanError};

const ENGINE_NAME: &str = "zmap";

const LIST_PROBE_MODULES: &str = "--list-probe-modules";
const LIST_OUTPUT_MODULES: &str = "--list-output-modules";
const LIST_OUTPUT_FIELDS: &str = "--list-output-fields";
const VERSION: &str = "--version";

/// One entry of `zmap --list-output-fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub explanation: String,
}

/// Handle on a zmap binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engine {
    binary: PathBuf,
}

impl Engine {
    /// Finds `zmap` on the `PATH`.
    pub fn locate() -> Result<Self> {
        let path = env::var_os("PATH").ok_or(ScanError::EngineNotFound)?;
        env::split_paths(&path)
            .map(|dir| dir.join(ENGINE_NAME))
            .find(|candidate| is_executable(candidate))
            .map(|binary| {
                debug!("Found zmap at {}", binary.display());
                Self { binary }
            })
            .ok_or(ScanError::EngineNotFound)
    }

    /// Uses an explicit binary, after checking that it exists and that its
    /// `--version` output names zmap.
    pub async fn at(binary: impl Into<PathBuf>) -> Result<Self> {
        let binary = binary.into();
        if !binary.exists() {
            return Err(ScanError::BinaryMissing(binary));
        }

        let authentic = match Command::new(&binary).arg(VERSION).output().await {
            Ok(output) => String::from_utf8_lossy(&output.stdout).contains(ENGINE_NAME),
            Err(e) => {
                debug!("Cannot execute {}: {}", binary.display(), e);
                false
            }
        };
        if !authentic {
            return Err(ScanError::NotEngine(binary));
        }

        Ok(Self { binary })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub async fn list_probe_modules(&self) -> Result<Vec<String>> {
        let output = self.query(LIST_PROBE_MODULES).await?;
        Ok(parse_lines(&output))
    }

    pub async fn list_output_modules(&self) -> Result<Vec<String>> {
        let output = self.query(LIST_OUTPUT_MODULES).await?;
        Ok(parse_lines(&output))
    }

    pub async fn list_output_fields(&self) -> Result<Vec<OutputField>> {
        let output = self.query(LIST_OUTPUT_FIELDS).await?;
        parse_output_fields(&output)
    }

    /// The version reported by the engine with the product name removed,
    /// e.g. `2.1.1` for `zmap 2.1.1`.
    pub async fn version(&self) -> Result<String> {
        let output = self.query(VERSION).await?;
        parse_version(&output)
    }

    async fn query(&self, flag: &'static str) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg(flag)
            .output()
            .await
            .map_err(ScanError::Spawn)?;

        if !output.status.success() {
            return Err(ScanError::Engine {
                command: flag.to_owned(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Non-empty lines, one record each.
pub fn parse_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parses `name type explanation...` lines.
pub fn parse_output_fields(output: &str) -> Result<Vec<OutputField>> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut words = line.split_whitespace();
            match (words.next(), words.next()) {
                (Some(name), Some(kind)) => Ok(OutputField {
                    name: name.to_owned(),
                    kind: kind.to_owned(),
                    explanation: words.collect::<Vec<_>>().join(" "),
                }),
                _ => Err(ScanError::Introspection {
                    command: LIST_OUTPUT_FIELDS,
                    line: line.to_owned(),
                }),
            }
        })
        .collect()
}

pub fn parse_version(output: &str) -> Result<String> {
    let trimmed = output.trim_matches('\n');
    if !trimmed.contains(ENGINE_NAME) {
        return Err(ScanError::UnexpectedVersion(trimmed.to_owned()));
    }

    Ok(trimmed
        .split_whitespace()
        .filter(|word| *word != ENGINE_NAME)
        .collect::<Vec<_>>()
        .join(" "))
}
