//! # Job producer.
//!
//! Feeds `Job 1..=N` into the job channel in ascending order. Each handover
//! races the send against the [`CancelSignal`]; once the signal fires no
//! further job is created.
//!
//! The producer owns the only [`Sender`]. Returning drops it, which is the
//! single authoritative "no more work" signal for the workers.

use async_channel::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use workline_model::{Job, JobSeq};

use crate::cancel::CancelSignal;

const TARGET: &str = "workline.core.producer";

pub struct Producer {
    seq: JobSeq,
    signal: CancelSignal,
}

impl Producer {
    pub fn new(jobs: u64, signal: CancelSignal) -> Self {
        Self {
            seq: JobSeq::new(jobs),
            signal,
        }
    }

    /// Runs the producer on its own task. Resolves to the number of jobs handed over.
    pub fn spawn(self, tx: Sender<Job>) -> JoinHandle<u64> {
        tokio::spawn(self.run(tx))
    }

    /// Produces until the sequence is exhausted, the signal fires, or every
    /// receiver is gone. Consumes `tx`, closing the channel on return.
    pub async fn run(self, tx: Sender<Job>) -> u64 {
        let Self { mut seq, signal } = self;
        let mut handed = 0u64;

        loop {
            if signal.is_cancelled() {
                debug!(target: TARGET, handed, remaining = seq.remaining(), "producer stopped by cancellation");
                break;
            }
            let Some(job) = seq.next() else {
                trace!(target: TARGET, handed, "job sequence exhausted");
                break;
            };
            let id = job.id();

            tokio::select! {
                biased;
                _ = signal.cancelled() => {
                    debug!(target: TARGET, job = id, handed, "handover abandoned; run canceled");
                    break;
                }
                sent = tx.send(job) => {
                    if sent.is_err() {
                        debug!(target: TARGET, job = id, handed, "no receivers left");
                        break;
                    }
                    trace!(target: TARGET, job = id, "job handed over");
                    handed += 1;
                }
            }
        }
        handed
    }
}
