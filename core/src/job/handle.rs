// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use super::Job;

/// Shared reference to a [Job]
///
/// Each stored reference is a separate handle: [JobHandle::attach] creates
/// one and [JobHandle::release] consumes it. The job is dropped exactly
/// once, with the last handle, and a handle cannot be released twice.
#[derive(Clone)]
pub struct JobHandle(Arc<Mutex<Job>>);

impl JobHandle {
    pub fn new(job: Job) -> Self {
        Self(Arc::new(Mutex::new(job)))
    }

    /// Attach a new reference to the job
    pub fn attach(&self) -> Self {
        self.clone()
    }

    /// Release this reference to the job
    pub fn release(self) {
        drop(self)
    }

    /// Number of live references
    pub fn usage(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Lock the job for access
    pub fn lock(&self) -> MutexGuard<'_, Job> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check whether two handles refer to the same job
    pub fn ptr_eq(&self, other: &JobHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Create a non-owning reference, eg. to observe job destruction
    pub fn downgrade(&self) -> WeakJob {
        WeakJob(Arc::downgrade(&self.0))
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_lock() {
            Ok(j) => write!(f, "JobHandle({} #{}, {})", j.name(), j.id(), j.status()),
            Err(_) => write!(f, "JobHandle(<locked>)"),
        }
    }
}

/// Non-owning job reference
#[derive(Clone, Debug)]
pub struct WeakJob(Weak<Mutex<Job>>);

impl WeakJob {
    pub fn upgrade(&self) -> Option<JobHandle> {
        self.0.upgrade().map(JobHandle)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}
