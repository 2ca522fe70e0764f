use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use clap::Parser;
use tracing::{info, warn};

use workline_core::{Dispatch, Engine, WorkRef};
use workline_exec::{Guarded, ProcWork, SimWork};
use workline_model::{RawConfig, RunConfig, parse_duration, parse_timeout};
use workline_observe::{LoggerConfig, log_result, log_summary, logger_init};

/// Runs a batch of jobs through a bounded, cancellable worker pool.
#[derive(Parser, Debug)]
#[command(name = "jobrun", version)]
struct Cli {
    /// Number of jobs to produce.
    #[arg(long, env = "WORKLINE_JOBS", default_value_t = RunConfig::DEFAULT_JOBS as i64, allow_negative_numbers = true)]
    jobs: i64,

    /// Number of concurrent execution slots.
    #[arg(long, env = "WORKLINE_WORKERS", default_value_t = RunConfig::DEFAULT_WORKERS as i64, allow_negative_numbers = true)]
    workers: i64,

    /// Run timeout, e.g. `500ms`, `2s`, `1m30s`.
    #[arg(long, env = "WORKLINE_TIMEOUT", default_value = "500ms", value_parser = parse_timeout, allow_hyphen_values = true)]
    timeout: Duration,

    /// `pool` (fixed workers) or `gated` (one task per job behind a gate).
    #[arg(long, default_value = "pool")]
    dispatch: Dispatch,

    /// How long a job may keep running after cancellation before it is dropped.
    #[arg(long, value_parser = parse_duration)]
    grace: Option<Duration>,

    /// Simulated failure period; `0` never fails.
    #[arg(long, default_value_t = SimWork::FAIL_EVERY)]
    fail_every: u64,

    /// Run this shell script per job instead of the simulation (`$WORKLINE_JOB_ID` is set).
    #[arg(long)]
    shell: Option<String>,

    /// `text`, `json` or `journald`.
    #[arg(long, env = "WORKLINE_LOG_FORMAT", default_value = "text")]
    log_format: String,

    /// Log filter directive.
    #[arg(long, env = "WORKLINE_LOG", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn work(&self) -> anyhow::Result<WorkRef> {
        let work: WorkRef = match &self.shell {
            Some(script) => Arc::new(Guarded::new(ProcWork::shell(script.as_str())?)),
            None => Arc::new(Guarded::new(SimWork::new().fail_every(self.fail_every))),
        };
        Ok(work)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = RunConfig::try_from(RawConfig {
        jobs: cli.jobs,
        workers: cli.workers,
        timeout: cli.timeout,
    })
    .map_err(|e| anyhow!("invalid configuration: {e}"))?;

    let log_cfg = LoggerConfig::parse(&cli.log_format, cli.log_level.as_str())?;
    logger_init(&log_cfg)?;

    let work = cli.work()?;
    let engine = Engine::new(cfg)
        .with_dispatch(cli.dispatch)
        .with_grace(cli.grace);

    let mut run = engine.start(work);
    info!(run = %run.id(), "press Ctrl+C to cancel");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            next = run.next() => match next {
                Some(result) => {
                    log_result(&result);
                    println!("{result}");
                }
                None => break,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                warn!(run = %run.id(), "interrupted; cancelling run");
                run.cancel();
            }
        }
    }

    let summary = run.finish().await;
    log_summary(&summary);
    println!("{summary}");
    Ok(())
}
