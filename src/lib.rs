//! Validated, cancellable control of the [ZMap](https://zmap.io) network
//! scanner.
//!
//! zmap runs as a subprocess. This crate builds its argument list from typed,
//! eagerly validated options, runs it under a cancellation context and turns
//! what it printed into result records and severity-sorted log entries.
//!
//! ## Architecture Overview
//!
//! 1. **Options**: every [`ScanOption`](crate::options::ScanOption) checks
//!    its value (numbers, ports, addresses, paths, and the module and field
//!    names the engine reports) before it is appended to the scanner's
//!    [`Arguments`](crate::arguments::Arguments).
//! 2. **Introspection**: [`Engine`](crate::engine::Engine) locates the
//!    binary and asks it for its probe modules, output modules, output fields
//!    and version.
//! 3. **Process**: a run fills in default output fields and verbosity,
//!    spawns zmap and races it against the scanner's
//!    [`ScanContext`](crate::context::ScanContext).
//! 4. **Output**: log lines are read from stderr, a log file or the newest
//!    file in a log directory; results from stdout or an output file.
//!
//! ## Basic Usage Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use zmapctl::context::ScanContext;
//! use zmapctl::options::ScanOption;
//! use zmapctl::scanner::Scanner;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scanner = Scanner::builder()
//!         .context(ScanContext::with_timeout(Duration::from_secs(600)))?
//!         .options([
//!             ScanOption::targets(["192.168.1.0/24"]),
//!             ScanOption::target_port(80),
//!             ScanOption::rate(1_000),
//!             ScanOption::output_fields(["saddr", "sport"]),
//!         ])
//!         .build()
//!         .await?;
//!
//!     let output = scanner.run().await?;
//!     for record in &output.results {
//!         println!("{} answered on {}", record["saddr"], record["sport"]);
//!     }
//!     for entry in output.warnings() {
//!         eprintln!("{}: {}", entry.time, entry.message);
//!     }
//!     Ok(())
//! }
//! ```
#![allow(clippy::needless_doctest_main)]

pub mod arguments;

pub mod context;

pub mod engine;

pub mod error;

pub mod input;

pub mod options;

pub mod output;

pub mod process;

pub mod scanner;

#[cfg(test)]
mod test_support;

pub use error::{OptionError, ScanError};
pub use output::ScanOutput;
pub use scanner::{AsyncScanner, Scanner, ScannerBuilder};
