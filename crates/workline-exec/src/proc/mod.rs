//! External-process work: every job runs one child process.
//!
//! The job id is exported to the child as `WORKLINE_JOB_ID`. Standard output
//! is forwarded line by line into the log (`workline.exec.proc.out`, trace);
//! standard error is inherited. On cancellation the child is killed and the
//! job reported canceled. Children are also killed if the job future is
//! dropped mid-flight.

use std::{path::PathBuf, process::Stdio};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
};
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, trace};
use workline_core::{CancelSignal, Work};
use workline_model::{Job, Outcome};

use crate::error::ExecError;

/// Environment variable holding the job id inside the child.
pub const JOB_ID_ENV: &str = "WORKLINE_JOB_ID";

const TARGET: &str = "workline.exec.proc";

/// Process configuration shared by every job of a run.
#[derive(Clone, Debug)]
pub struct ProcConfig {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    /// Report a failure when the exit code is not zero.
    pub fail_on_non_zero: bool,
}

impl Default for ProcConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            fail_on_non_zero: true,
        }
    }
}

#[derive(Debug)]
pub struct ProcWork {
    name: String,
    cfg: ProcConfig,
}

impl ProcWork {
    pub fn new(cfg: ProcConfig) -> Result<Self, ExecError> {
        if cfg.program.trim().is_empty() {
            return Err(ExecError::MissingProgram);
        }
        Ok(Self {
            name: format!("proc:{}", cfg.program),
            cfg,
        })
    }

    /// Runs `script` through the platform shell (`sh -c` / `cmd /C`).
    pub fn shell(script: impl Into<String>) -> Result<Self, ExecError> {
        let script = script.into();
        if script.trim().is_empty() {
            return Err(ExecError::MissingProgram);
        }

        cfg_if::cfg_if! {
            if #[cfg(target_family = "windows")] {
                let (program, flag) = ("cmd", "/C");
            } else {
                let (program, flag) = ("sh", "-c");
            }
        }
        let mut work = Self::new(ProcConfig {
            program: program.to_string(),
            args: vec![flag.to_string(), script],
            ..ProcConfig::default()
        })?;
        work.name = "shell".to_string();
        Ok(work)
    }

    pub fn config(&self) -> &ProcConfig {
        &self.cfg
    }

    fn command(&self, job: &Job) -> Command {
        let mut cmd = Command::new(&self.cfg.program);
        cmd.args(&self.cfg.args)
            .envs(self.cfg.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env(JOB_ID_ENV, job.id().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cfg.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

#[async_trait]
impl Work for ProcWork {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, signal: CancelSignal, job: Job) -> Outcome {
        let id = job.id();
        trace!(target: TARGET, job = id, program = %self.cfg.program, args = ?self.cfg.args, "spawn");

        let mut child = match self.command(&job).spawn() {
            Ok(child) => child,
            Err(e) => return Outcome::Failure(ExecError::Spawn(e.to_string()).for_job(id)),
        };

        let forward = child.stdout.take().map(|stdout| {
            AbortOnDropHandle::new(tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    trace!(target: "workline.exec.proc.out", job = id, %line);
                }
            }))
        });

        tokio::select! {
            status = child.wait() => {
                let status = match status {
                    Ok(status) => status,
                    Err(e) => return Outcome::Failure(ExecError::Wait(e.to_string()).for_job(id)),
                };
                if let Some(forward) = forward {
                    // Output tail. A grandchild may keep the pipe open past exit.
                    tokio::select! {
                        _ = forward => {}
                        _ = signal.cancelled() => {
                            debug!(target: TARGET, job = id, "cancelled while draining output");
                        }
                    }
                }

                if status.success() || !self.cfg.fail_on_non_zero {
                    debug!(target: TARGET, job = id, code = ?status.code(), "exit");
                    return Outcome::Success;
                }
                let err = match status.code() {
                    Some(code) => ExecError::NonZeroExit { code },
                    None => ExecError::KilledBySignal,
                };
                debug!(target: TARGET, job = id, error = %err, "exit failure");
                Outcome::Failure(err.for_job(id))
            }
            _ = signal.cancelled() => {
                debug!(target: TARGET, job = id, "cancelled; killing child");
                if let Err(e) = child.kill().await {
                    debug!(target: TARGET, job = id, error = %e, "kill failed");
                }
                Outcome::Canceled
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use workline_core::derive_run;
    use workline_model::JobError;

    use super::*;

    fn signal() -> (CancelSignal, workline_core::RunGuard) {
        derive_run(Duration::from_secs(30))
    }

    #[tokio::test]
    async fn zero_exit_is_success() {
        let (signal, _guard) = signal();
        let work = ProcWork::shell("exit 0").unwrap();
        assert_eq!(work.run(signal, Job::new(1)).await, Outcome::Success);
    }

    #[tokio::test]
    async fn non_zero_exit_is_failure() {
        let (signal, _guard) = signal();
        let work = ProcWork::shell("exit 3").unwrap();
        assert_eq!(
            work.run(signal, Job::new(4)).await,
            Outcome::Failure(JobError::Failed {
                job: 4,
                reason: "non-zero exit code: 3".into()
            })
        );
    }

    #[tokio::test]
    async fn non_zero_exit_tolerated_when_configured() {
        let (signal, _guard) = signal();
        let work = ProcWork::new(ProcConfig {
            program: "sh".into(),
            args: vec!["-c".into(), "exit 1".into()],
            fail_on_non_zero: false,
            ..ProcConfig::default()
        })
        .unwrap();
        assert_eq!(work.run(signal, Job::new(1)).await, Outcome::Success);
    }

    #[tokio::test]
    async fn job_id_is_exported() {
        let (signal, _guard) = signal();
        let work = ProcWork::shell(r#"test "$WORKLINE_JOB_ID" = 4"#).unwrap();
        assert_eq!(work.run(signal.clone(), Job::new(4)).await, Outcome::Success);
        assert!(matches!(work.run(signal, Job::new(5)).await, Outcome::Failure(_)));
    }

    #[tokio::test]
    async fn cancellation_kills_child() {
        let (signal, guard) = derive_run(Duration::from_millis(50));
        let work = ProcWork::shell("sleep 30").unwrap();

        let started = std::time::Instant::now();
        assert_eq!(work.run(signal, Job::new(1)).await, Outcome::Canceled);
        assert!(started.elapsed() < Duration::from_secs(10));
        drop(guard);
    }

    #[tokio::test]
    async fn lingering_grandchild_does_not_outlive_deadline() {
        let (signal, _guard) = derive_run(Duration::from_millis(100));
        let work = ProcWork::shell("sleep 5 & exit 0").unwrap();

        let started = std::time::Instant::now();
        let outcome = work.run(signal.clone(), Job::new(1)).await;
        assert_eq!(outcome, Outcome::Success);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let (signal, _guard) = signal();
        let work = ProcWork::new(ProcConfig {
            program: "/nonexistent/workline-test-binary".into(),
            ..ProcConfig::default()
        })
        .unwrap();
        let outcome = work.run(signal, Job::new(2)).await;
        assert_eq!(outcome.error().map(JobError::job), Some(2));
    }

    #[test]
    fn empty_program_is_rejected() {
        assert!(matches!(ProcWork::new(ProcConfig::default()), Err(ExecError::MissingProgram)));
        assert!(matches!(ProcWork::shell("   "), Err(ExecError::MissingProgram)));
    }
}
