//! Running zmap once: default injection, spawning, and the race against the
//! scanner's context.
use std::process::{ExitStatus, Stdio};

use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::arguments::Arguments;
use crate::context::ScanContext;
use crate::engine::Engine;
use crate::error::{Result, ScanError};
use crate::options::{flag, ScanOption, MAX_VERBOSITY};
use crate::output::{self, OutputPlan, ScanOutput};

/// Both streams of a process that ran to completion.
#[derive(Debug)]
pub struct Captured {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// A copy of `args` with the run defaults filled in: every output field the
/// engine knows, when none were chosen, and maximum verbosity, when no level
/// was chosen.
pub async fn with_defaults(args: &Arguments, engine: &Engine) -> Result<Arguments> {
    let mut run_args = args.clone();

    if !run_args.contains(flag::OUTPUT_FIELDS) {
        let fields = engine.list_output_fields().await?;
        debug!("No output fields set, requesting all {}", fields.len());
        ScanOption::output_fields(fields.into_iter().map(|field| field.name))
            .apply(&mut run_args, engine)
            .await?;
    }

    if !run_args.contains(flag::VERBOSITY) {
        debug!("No verbosity set, using {MAX_VERBOSITY}");
        ScanOption::Verbosity(MAX_VERBOSITY)
            .apply(&mut run_args, engine)
            .await?;
    }

    Ok(run_args)
}

/// Runs zmap with exactly `args` until it exits or `ctx` completes.
///
/// When `ctx` wins the child is killed and [`ScanError::Timeout`] is returned;
/// whatever it printed so far is dropped.
pub async fn execute(engine: &Engine, args: &Arguments, ctx: &ScanContext) -> Result<Captured> {
    if ctx.is_done() {
        return Err(ScanError::Timeout);
    }

    debug!("Running {} {}", engine.binary().display(), args.as_slice().join(" "));
    let mut child = Command::new(engine.binary())
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(ScanError::Spawn)?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let exited = tokio::select! {
        status = child.wait() => Some(status),
        () = ctx.done() => None,
    };

    let Some(status) = exited else {
        debug!("Context finished before zmap exited, killing it");
        if let Err(e) = child.kill().await {
            debug!("Failed to kill zmap: {}", e);
        }
        stdout.abort();
        stderr.abort();
        return Err(ScanError::Timeout);
    };
    let status = status.map_err(ScanError::Wait)?;
    debug!("zmap exited with {}", status);

    Ok(Captured {
        status,
        stdout: stdout.await?.map_err(ScanError::Wait)?,
        stderr: stderr.await?.map_err(ScanError::Wait)?,
    })
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buffer).await?;
        }
        Ok(buffer)
    })
}

/// One full run: defaults, process, interpretation.
///
/// A non-zero exit is not an error by itself; the engine's `[FATAL]` lines
/// and [`ScanOutput::exit_code`] describe what went wrong.
pub async fn run(engine: &Engine, args: &Arguments, ctx: &ScanContext) -> Result<ScanOutput> {
    let run_args = with_defaults(args, engine).await?;
    let plan = OutputPlan::from_arguments(&run_args);
    debug!("Output plan: {:?}", plan);

    let captured = execute(engine, &run_args, ctx).await?;
    let (results, logs) = output::interpret(&plan, &captured.stdout, &captured.stderr).await?;

    Ok(ScanOutput {
        results,
        logs,
        exit_code: captured.status.code(),
    })
}
