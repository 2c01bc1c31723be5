//! Eager, best-effort filesystem checks for path-valued options.
//!
//! The filesystem can change before the engine starts, so passing these
//! checks guarantees nothing about the run itself.
use std::path::{Path, PathBuf};

use crate::error::{OptionError, PathProblem};

fn problem(flag: &'static str, path: &Path, problem: PathProblem) -> OptionError {
    OptionError::Path {
        flag,
        path: path.to_path_buf(),
        problem,
    }
}

/// `path` must exist; files and directories are both accepted.
pub fn require_existing(flag: &'static str, path: &Path) -> Result<(), OptionError> {
    if path.exists() {
        Ok(())
    } else {
        Err(problem(flag, path, PathProblem::Missing))
    }
}

/// `path` must exist and must not be a directory.
pub fn require_file(flag: &'static str, path: &Path) -> Result<(), OptionError> {
    if !path.exists() {
        return Err(problem(flag, path, PathProblem::Missing));
    }
    if path.is_dir() {
        return Err(problem(flag, path, PathProblem::IsDirectory));
    }
    Ok(())
}

/// `path` must be an existing directory.
pub fn require_directory(flag: &'static str, path: &Path) -> Result<(), OptionError> {
    if !path.exists() {
        return Err(problem(flag, path, PathProblem::Missing));
    }
    if !path.is_dir() {
        return Err(problem(flag, path, PathProblem::NotADirectory));
    }
    Ok(())
}

/// `path` is a file the engine will create or overwrite: it must not be a
/// directory, and if it does not exist yet its parent must.
pub fn require_creatable(flag: &'static str, path: &Path) -> Result<(), OptionError> {
    if path.is_dir() {
        return Err(problem(flag, path, PathProblem::IsDirectory));
    }
    if !path.exists() && !parent_of(path).exists() {
        return Err(problem(flag, path, PathProblem::ParentMissing));
    }
    Ok(())
}

fn parent_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
