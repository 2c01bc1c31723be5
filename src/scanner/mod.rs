//! The scanner façade: configure once, run, read results and logs.
mod async_scan;

pub use async_scan::AsyncScanner;

use std::path::PathBuf;

use log::debug;

use crate::arguments::Arguments;
use crate::context::ScanContext;
use crate::engine::{Engine, OutputField};
use crate::error::{Result, ScanError};
use crate::input::ScanConfig;
use crate::options::ScanOption;
use crate::output::ScanOutput;
use crate::process;

/// A configured zmap invocation.
///
/// Options are validated when added. Every [`run`](Self::run) starts a fresh
/// engine process with the same arguments and is bound to the same
/// [`ScanContext`].
#[derive(Debug, Clone)]
pub struct Scanner {
    engine: Engine,
    ctx: ScanContext,
    args: Arguments,
}

impl Scanner {
    /// A scanner for the `zmap` on the `PATH`, never cancelled.
    pub fn new() -> Result<Self> {
        Ok(Self::with_engine(Engine::locate()?, ScanContext::background()))
    }

    pub const fn with_engine(engine: Engine, ctx: ScanContext) -> Self {
        Self {
            engine,
            ctx,
            args: Arguments::new(),
        }
    }

    pub fn builder() -> ScannerBuilder {
        ScannerBuilder::default()
    }

    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    pub const fn context(&self) -> &ScanContext {
        &self.ctx
    }

    /// The arguments added so far, without run defaults.
    pub const fn arguments(&self) -> &Arguments {
        &self.args
    }

    pub async fn add_option(&mut self, option: ScanOption) -> Result<()> {
        debug!("Adding option {}", option);
        option.apply(&mut self.args, &self.engine).await
    }

    /// Applies `options` in order and stops at the first invalid one. Options
    /// applied before it stay applied.
    pub async fn add_options<I>(&mut self, options: I) -> Result<()>
    where
        I: IntoIterator<Item = ScanOption>,
    {
        for option in options {
            self.add_option(option).await?;
        }
        Ok(())
    }

    /// Runs the scan to completion and interprets its output.
    ///
    /// Returns [`ScanError::Timeout`] with nothing else when the context
    /// finishes first.
    pub async fn run(&self) -> Result<ScanOutput> {
        process::run(&self.engine, &self.args, &self.ctx).await
    }

    pub async fn probe_modules(&self) -> Result<Vec<String>> {
        self.engine.list_probe_modules().await
    }

    pub async fn output_modules(&self) -> Result<Vec<String>> {
        self.engine.list_output_modules().await
    }

    pub async fn output_fields(&self) -> Result<Vec<OutputField>> {
        self.engine.list_output_fields().await
    }

    pub async fn version(&self) -> Result<String> {
        self.engine.version().await
    }
}

/// Builds a [`Scanner`]. The binary path and the context can each be set
/// once; setting either again is an error.
#[derive(Debug, Default)]
pub struct ScannerBuilder {
    binary: Option<PathBuf>,
    ctx: Option<ScanContext>,
    options: Vec<ScanOption>,
}

impl ScannerBuilder {
    /// Use this binary instead of searching the `PATH`.
    pub fn binary_path(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        if self.binary.is_some() {
            return Err(ScanError::AlreadyConfigured("binary path"));
        }
        self.binary = Some(path.into());
        Ok(self)
    }

    pub fn context(mut self, ctx: ScanContext) -> Result<Self> {
        if self.ctx.is_some() {
            return Err(ScanError::AlreadyConfigured("context"));
        }
        self.ctx = Some(ctx);
        Ok(self)
    }

    /// Options to apply, in order, when building.
    #[must_use]
    pub fn options<I>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = ScanOption>,
    {
        self.options.extend(options);
        self
    }

    /// Takes the binary path, timeout and options of a configuration file.
    pub fn config(mut self, config: &ScanConfig) -> Result<Self> {
        if let Some(path) = &config.binary_path {
            self = self.binary_path(path.clone())?;
        }
        if let Some(timeout) = config.timeout() {
            self = self.context(ScanContext::with_timeout(timeout))?;
        }
        Ok(self.options(config.options()))
    }

    /// Resolves the engine and applies the collected options.
    pub async fn build(self) -> Result<Scanner> {
        let engine = match self.binary {
            Some(path) => Engine::at(path).await?,
            None => Engine::locate()?,
        };
        let mut scanner = Scanner::with_engine(engine, self.ctx.unwrap_or_default());
        scanner.add_options(self.options).await?;
        Ok(scanner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OptionError;
    use crate::options::flag;
    use crate::test_support::{fake_engine, fake_engine_path};

    #[test]
    fn binary_path_only_once() {
        let err = Scanner::builder()
            .binary_path("/usr/sbin/zmap")
            .unwrap()
            .binary_path("/usr/local/sbin/zmap")
            .unwrap_err();
        assert!(matches!(err, ScanError::AlreadyConfigured("binary path")));
    }

    #[test]
    fn context_only_once() {
        let err = Scanner::builder()
            .context(ScanContext::background())
            .unwrap()
            .context(ScanContext::background())
            .unwrap_err();
        assert!(matches!(err, ScanError::AlreadyConfigured("context")));
    }

    #[tokio::test]
    async fn build_rejects_missing_binary() {
        let err = Scanner::builder()
            .binary_path("/definitely/not/zmap")
            .unwrap()
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::BinaryMissing(_)));
    }

    #[tokio::test]
    async fn build_applies_options() {
        let scanner = Scanner::builder()
            .binary_path(fake_engine_path())
            .unwrap()
            .options([ScanOption::Dryrun, ScanOption::rate(100)])
            .build()
            .await
            .unwrap();

        assert_eq!(scanner.arguments().as_slice(), ["--dryrun", "--rate", "100"]);
    }

    #[tokio::test]
    async fn add_options_keeps_earlier_options() {
        let mut scanner = Scanner::with_engine(fake_engine().await, ScanContext::background());

        let err = scanner
            .add_options([
                ScanOption::rate(100),
                ScanOption::rate("fast"),
                ScanOption::Quiet,
            ])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScanError::Option(OptionError::Duplicate(flag::RATE))
        ));
        assert_eq!(scanner.arguments().as_slice(), ["--rate", "100"]);
    }

    #[tokio::test]
    async fn config_sets_engine_and_options() {
        let config = ScanConfig {
            binary_path: Some(fake_engine_path()),
            timeout_secs: Some(60),
            dryrun: true,
            ..ScanConfig::default()
        };

        let scanner = Scanner::builder()
            .config(&config)
            .unwrap()
            .build()
            .await
            .unwrap();

        assert!(scanner.context().deadline().is_some());
        assert!(scanner.arguments().contains(flag::DRYRUN));
    }

    #[tokio::test]
    async fn introspection_passthrough() {
        let scanner = Scanner::with_engine(fake_engine().await, ScanContext::background());

        assert_eq!(
            scanner.probe_modules().await.unwrap(),
            vec!["tcp_synscan", "icmp_echoscan", "udp"]
        );
        assert_eq!(scanner.output_modules().await.unwrap(), vec!["csv", "json"]);
        assert_eq!(scanner.output_fields().await.unwrap().len(), 3);
        assert_eq!(scanner.version().await.unwrap(), "2.1.1");
    }
}
