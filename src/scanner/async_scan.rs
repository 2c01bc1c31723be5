use log::debug;
use once_cell::sync::OnceCell;
use tokio::task::JoinHandle;

use super::Scanner;
use crate::engine::OutputField;
use crate::error::{Result, ScanError};
use crate::options::ScanOption;
use crate::output::{LogEntry, ScanOutput, ScanRecord};
use crate::process;

/// How the one run of an [`AsyncScanner`] ended.
#[derive(Debug)]
enum Outcome {
    Done(ScanOutput),
    TimedOut,
    Failed(String),
}

/// Runs a [`Scanner`] in a background task.
///
/// [`start`](Self::start) returns immediately. The output accessors return
/// empty slices until [`wait`](Self::wait) has returned `Ok`, then the
/// complete output of the run. Dropping the scanner aborts a run that was
/// never waited for, which kills the engine process.
#[derive(Debug)]
pub struct AsyncScanner {
    scanner: Scanner,
    task: Option<JoinHandle<Result<ScanOutput>>>,
    outcome: OnceCell<Outcome>,
}

impl AsyncScanner {
    pub const fn new(scanner: Scanner) -> Self {
        Self {
            scanner,
            task: None,
            outcome: OnceCell::new(),
        }
    }

    pub const fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub async fn add_option(&mut self, option: ScanOption) -> Result<()> {
        self.scanner.add_option(option).await
    }

    pub async fn add_options<I>(&mut self, options: I) -> Result<()>
    where
        I: IntoIterator<Item = ScanOption>,
    {
        self.scanner.add_options(options).await
    }

    /// Spawns the run on the current tokio runtime. One run per scanner.
    pub fn start(&mut self) -> Result<()> {
        if self.task.is_some() || self.outcome.get().is_some() {
            return Err(ScanError::AlreadyStarted);
        }

        let engine = self.scanner.engine.clone();
        let args = self.scanner.args.clone();
        let ctx = self.scanner.ctx.clone();
        self.task = Some(tokio::spawn(async move {
            process::run(&engine, &args, &ctx).await
        }));
        debug!("Started background scan");
        Ok(())
    }

    /// Waits for the background run and publishes its output.
    ///
    /// Once the run has ended, every later call reports the same ending:
    /// `Ok`, [`ScanError::Timeout`], or [`ScanError::PreviousFailure`] with
    /// the first error's message.
    pub async fn wait(&mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return match self.outcome.get() {
                Some(Outcome::Done(_)) => Ok(()),
                Some(Outcome::TimedOut) => Err(ScanError::Timeout),
                Some(Outcome::Failed(message)) => {
                    Err(ScanError::PreviousFailure(message.clone()))
                }
                None => Err(ScanError::NotStarted),
            };
        };

        match task.await.map_err(ScanError::from).and_then(|run| run) {
            Ok(output) => {
                self.publish(Outcome::Done(output));
                Ok(())
            }
            Err(e) => {
                self.publish(if e.is_timeout() {
                    Outcome::TimedOut
                } else {
                    Outcome::Failed(e.to_string())
                });
                Err(e)
            }
        }
    }

    fn publish(&self, outcome: Outcome) {
        if self.outcome.set(outcome).is_err() {
            debug!("Outcome of this scanner was already published");
        }
    }

    /// The whole output, once [`wait`](Self::wait) succeeded.
    pub fn output(&self) -> Option<&ScanOutput> {
        match self.outcome.get() {
            Some(Outcome::Done(output)) => Some(output),
            _ => None,
        }
    }

    pub fn results(&self) -> &[ScanRecord] {
        self.output().map(|output| output.results.as_slice()).unwrap_or_default()
    }

    pub fn traces(&self) -> &[LogEntry] {
        self.output().map(ScanOutput::traces).unwrap_or_default()
    }

    pub fn debugs(&self) -> &[LogEntry] {
        self.output().map(ScanOutput::debugs).unwrap_or_default()
    }

    pub fn warnings(&self) -> &[LogEntry] {
        self.output().map(ScanOutput::warnings).unwrap_or_default()
    }

    pub fn infos(&self) -> &[LogEntry] {
        self.output().map(ScanOutput::infos).unwrap_or_default()
    }

    pub fn fatals(&self) -> &[LogEntry] {
        self.output().map(ScanOutput::fatals).unwrap_or_default()
    }

    pub async fn probe_modules(&self) -> Result<Vec<String>> {
        self.scanner.probe_modules().await
    }

    pub async fn output_modules(&self) -> Result<Vec<String>> {
        self.scanner.output_modules().await
    }

    pub async fn output_fields(&self) -> Result<Vec<OutputField>> {
        self.scanner.output_fields().await
    }

    pub async fn version(&self) -> Result<String> {
        self.scanner.version().await
    }
}

impl From<Scanner> for AsyncScanner {
    fn from(scanner: Scanner) -> Self {
        Self::new(scanner)
    }
}

impl Drop for AsyncScanner {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Aborting background scan that was never waited for");
            task.abort();
        }
    }
}
