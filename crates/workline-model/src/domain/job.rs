use std::iter::FusedIterator;

use crate::JobId;

/// One unit of dispatchable work.
///
/// Intentionally neither `Clone` nor `Copy`: a job moves through the handoff
/// channel into exactly one unit of work and is consumed there.
#[derive(Debug, PartialEq, Eq)]
pub struct Job {
    id: JobId,
}

impl Job {
    pub fn new(id: JobId) -> Self {
        Self { id }
    }

    #[inline]
    pub fn id(&self) -> JobId {
        self.id
    }
}

/// Lazy ascending sequence of jobs `1..=count`.
///
/// Jobs are created on demand. The sequence is consumed by value and cannot
/// be rewound: once a job has been yielded it is never yielded again.
#[derive(Debug)]
pub struct JobSeq {
    next: JobId,
    remaining: u64,
}

impl JobSeq {
    pub fn new(count: u64) -> Self {
        Self {
            next: 1,
            remaining: count,
        }
    }

    /// Jobs not created yet.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for JobSeq {
    type Item = Job;

    fn next(&mut self) -> Option<Job> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        Some(Job::new(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl FusedIterator for JobSeq {}
