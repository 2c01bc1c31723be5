//! Runs one scan to completion and prints what came back.
//!
//! ```text
//! RUST_LOG=debug cargo run --example blocking_scan -- 192.168.1.0/24 --port 80 --rate 1000
//! ```
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use zmapctl::context::ScanContext;
use zmapctl::input::ScanConfig;
use zmapctl::options::ScanOption;
use zmapctl::output::LogLevel;
use zmapctl::scanner::Scanner;

#[derive(Parser, Debug)]
#[command(name = "blocking_scan", version, about = "Run zmap once and print its results.")]
struct Opts {
    /// IPv4 addresses or CIDR blocks to scan.
    targets: Vec<String>,

    /// Destination port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Packets per second.
    #[arg(short, long)]
    rate: Option<u64>,

    /// Output fields; all fields when omitted.
    #[arg(short, long, value_delimiter = ',')]
    fields: Vec<String>,

    /// Only print the packets zmap would send.
    #[arg(long)]
    dryrun: bool,

    /// Give up after this many seconds.
    #[arg(short, long)]
    timeout: Option<u64>,

    /// zmap binary to use instead of the one on the PATH.
    #[arg(short, long)]
    binary: Option<PathBuf>,

    /// Configuration file, defaults to ~/.zmapctl.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the whole output as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();

    let config = ScanConfig::read(opts.config.clone())?;
    let mut builder = Scanner::builder();
    if let Some(binary) = &opts.binary {
        builder = builder.binary_path(binary)?;
    }
    if let Some(timeout) = opts.timeout {
        builder = builder.context(ScanContext::with_timeout(Duration::from_secs(timeout)))?;
    }
    let mut scanner = builder.config(&config)?.build().await?;

    if !opts.targets.is_empty() {
        scanner
            .add_option(ScanOption::targets(opts.targets.iter().cloned()))
            .await?;
    }
    if let Some(port) = opts.port {
        scanner.add_option(ScanOption::target_port(port)).await?;
    }
    if let Some(rate) = opts.rate {
        scanner.add_option(ScanOption::rate(rate)).await?;
    }
    if !opts.fields.is_empty() {
        scanner
            .add_option(ScanOption::output_fields(opts.fields.iter().cloned()))
            .await?;
    }
    if opts.dryrun {
        scanner.add_option(ScanOption::Dryrun).await?;
    }

    println!(
        "{} {}",
        "zmap".bold(),
        scanner.version().await.context("querying zmap version")?
    );

    let output = scanner.run().await?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for record in &output.results {
        let mut fields: Vec<_> = record.iter().collect();
        fields.sort();
        let line = fields
            .iter()
            .map(|(name, value)| format!("{}={}", name.cyan(), value))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{line}");
    }

    for level in [LogLevel::Warning, LogLevel::Fatal] {
        for entry in output.logs.level(level) {
            let message = match level {
                LogLevel::Fatal => entry.message.red(),
                _ => entry.message.yellow(),
            };
            eprintln!("{} {}", entry.time.format("%H:%M:%S%.3f"), message);
        }
    }

    println!(
        "{} results, {} log entries, exit code {}",
        output.results.len().to_string().green(),
        output.logs.len(),
        output
            .exit_code
            .map_or_else(|| "none".to_owned(), |code| code.to_string())
    );
    Ok(())
}
