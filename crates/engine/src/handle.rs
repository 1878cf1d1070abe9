// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Shared, serialized access to one session

use crate::runner::JobRunner;
use crate::session::{SessionError, SessionState};
use parking_lot::Mutex;
use std::sync::Arc;
use tb_core::{JobId, JobResult, SessionConfig};

/// Clonable handle to a session. All mutation goes through one lock.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionHandle {
    pub fn new(state: SessionState) -> Self {
        Self { inner: Arc::new(Mutex::new(state)) }
    }

    pub fn with<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        f(&self.inner.lock())
    }

    pub fn with_mut<T>(&self, f: impl FnOnce(&mut SessionState) -> T) -> T {
        f(&mut self.inner.lock())
    }

    /// Run `job_id` with `runner` and commit its result. The lock is held
    /// from start until the result is stored, so no other mutation can
    /// interleave with a running job.
    pub fn run_job<R: JobRunner + ?Sized>(
        &self,
        runner: &R,
        job_id: &JobId,
        config: &SessionConfig,
    ) -> Result<JobResult, SessionError> {
        let mut state = self.inner.lock();
        let job_state = state.job_state(job_id).ok_or_else(|| SessionError::UnknownJob(job_id.clone()))?;
        let job = Arc::clone(job_state.job());
        tracing::debug!(job_id = %job_id, plugin = %job.plugin(), "running job");
        let result = runner.run(&job, job_state, config);
        state.update_job_result(job_id, result.clone())?;
        Ok(result)
    }

    /// Unwrap the state if this is the last handle.
    pub fn into_inner(self) -> Result<SessionState, Self> {
        Arc::try_unwrap(self.inner).map(Mutex::into_inner).map_err(|inner| Self { inner })
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
