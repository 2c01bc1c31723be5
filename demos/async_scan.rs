//! Starts a scan in the background, lists the engine's vocabulary while it
//! runs, then waits for it. Ctrl-C cancels the scan.
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use zmapctl::context::ScanContext;
use zmapctl::options::ScanOption;
use zmapctl::scanner::{AsyncScanner, Scanner};

#[derive(Parser, Debug)]
#[command(name = "async_scan", about = "Run zmap in the background.")]
struct Opts {
    /// IPv4 addresses or CIDR blocks to scan.
    #[arg(required = true)]
    targets: Vec<String>,

    #[arg(short, long, default_value_t = 80)]
    port: u16,

    #[arg(short, long)]
    binary: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();

    let token = CancellationToken::new();
    let mut builder = Scanner::builder().context(ScanContext::from_token(token.clone()))?;
    if let Some(binary) = opts.binary {
        builder = builder.binary_path(binary)?;
    }
    let mut scanner = AsyncScanner::new(builder.build().await?);
    scanner
        .add_options([
            ScanOption::targets(opts.targets),
            ScanOption::target_port(opts.port),
            ScanOption::output_fields(["saddr", "sport"]),
        ])
        .await?;

    scanner.start()?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    println!("{}", "Probe modules:".bold());
    for module in scanner.probe_modules().await? {
        println!("  {module}");
    }
    println!("{}", "Output fields:".bold());
    for field in scanner.output_fields().await? {
        println!("  {:<16} {:<8} {}", field.name, field.kind, field.explanation);
    }

    if let Err(e) = scanner.wait().await {
        if e.is_timeout() {
            eprintln!("{}", "Scan cancelled".red());
            return Ok(());
        }
        return Err(e.into());
    }

    for record in scanner.results() {
        println!("{}:{}", record["saddr"].green(), record["sport"]);
    }
    println!(
        "{} infos, {} warnings, {} fatals",
        scanner.infos().len(),
        scanner.warnings().len(),
        scanner.fatals().len()
    );
    Ok(())
}
