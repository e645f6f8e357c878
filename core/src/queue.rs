// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Job queues
//!
//! A [JobQueue] holds the jobs sent together in one message. Each stored
//! job is an attached [JobHandle], released when the queue is dropped.

use log::debug;

use hbci_proto::{JobStatus, ResultScope};

use crate::job::{JobFlags, JobHandle};

/// Outcome of adding a job to a queue
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[must_use]
pub enum AddResult {
    /// Job added
    Added,
    /// Queue can not take this job, start a new queue
    Full,
    /// Job signers differ from the queued jobs
    Incompatible,
}

/// Ordered batch of jobs for one message exchange
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Vec<JobHandle>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicate a queue, referencing the same jobs
    pub fn from_queue(other: &JobQueue) -> Self {
        Self {
            jobs: other.jobs.iter().map(|j| j.attach()).collect(),
        }
    }

    /// Add a job, enforcing single-job and signer constraints
    pub fn add_job(&mut self, job: &JobHandle) -> AddResult {
        if self.contains(job) {
            return AddResult::Full;
        }

        // Evaluate the queue before locking the new job
        let queued_single = self
            .jobs
            .iter()
            .any(|j| j.lock().flags().contains(JobFlags::SINGLE));
        let signers = self.signers();

        let mut j = job.lock();

        if !self.jobs.is_empty() {
            if queued_single || j.flags().contains(JobFlags::SINGLE) {
                debug!("Queue full: single job {}", j.name());
                return AddResult::Full;
            }

            let same_type = self.jobs.iter().filter(|q| q.lock().code() == j.code()).count();
            if j.jobs_per_msg() > 0 && same_type >= j.jobs_per_msg() as usize {
                debug!("Queue full: {} jobs of type {}", same_type, j.code());
                return AddResult::Full;
            }

            if signers.iter().ne(j.signers().iter()) {
                debug!("Queue incompatible: signers differ for job {}", j.name());
                return AddResult::Incompatible;
            }
        }

        j.set_status(JobStatus::Enqueued);
        drop(j);

        self.jobs.push(job.attach());

        AddResult::Added
    }

    /// Add an auxiliary (TAN) job without queue checks
    pub fn add_aux_job(&mut self, job: &JobHandle) {
        job.lock().set_status(JobStatus::Enqueued);
        self.jobs.push(job.attach());
    }

    pub fn jobs(&self) -> &[JobHandle] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, job: &JobHandle) -> bool {
        self.jobs.iter().any(|j| j.ptr_eq(job))
    }

    /// Check whether any queued job requires a TAN
    pub fn needs_tan(&self) -> bool {
        self.any_flag(JobFlags::NEED_TAN)
    }

    pub fn needs_sign(&self) -> bool {
        self.any_flag(JobFlags::SIGN)
    }

    pub fn needs_crypt(&self) -> bool {
        self.any_flag(JobFlags::CRYPT)
    }

    /// Signers of the first queued job
    pub fn signers(&self) -> Vec<String> {
        self.jobs
            .first()
            .map(|j| j.lock().signers().to_vec())
            .unwrap_or_default()
    }

    fn any_flag(&self, f: JobFlags) -> bool {
        self.jobs.iter().any(|j| j.lock().flags().contains(f))
    }
}

/// Copy the outbox results of `src` to every other non-TAN job in `queue`
///
/// Results are duplicated, returns the number of jobs updated. Jobs encoded
/// into the same message as `src` already hold its message results and only
/// receive segment results.
pub fn copy_results_to_queue(src: &JobHandle, queue: &JobQueue) -> usize {
    let (results, src_msg) = {
        let s = src.lock();
        (s.outbox_results().to_vec(), s.msg_num())
    };
    let mut updated = 0;

    for j in queue.jobs() {
        if j.ptr_eq(src) {
            continue;
        }

        let mut j = j.lock();
        if j.flags().contains(JobFlags::TAN_JOB) {
            continue;
        }

        let same_msg = src_msg != 0 && j.msg_num() == src_msg;
        for r in &results {
            if same_msg && r.scope() == ResultScope::Message {
                continue;
            }
            j.copy_result(r.clone());
        }
        updated += 1;
    }

    debug!("Copied {} results to {} jobs", results.len(), updated);

    updated
}
