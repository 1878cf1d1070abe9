// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Run loop
//!
//! [`SessionRunner`] drives a session to completion: it repeatedly takes
//! the first run-list job that can start, runs it through a [`JobRunner`]
//! and commits the result. Jobs generated by a desired local job are
//! adopted into the desired list and the run list is re-polled instead of
//! being mutated mid-iteration.

use crate::handle::SessionHandle;
use crate::metadata::SessionFlag;
use crate::session::{SessionError, SessionState};
use std::collections::HashSet;
use tb_core::{Clock, JobDefinition, JobId, JobResult, JobState, Outcome, SessionConfig, SystemClock};

/// Executes a single job. Duration and mechanism are up to the runner;
/// only the returned result is consumed.
pub trait JobRunner: Send + Sync {
    fn run(&self, job: &JobDefinition, state: &JobState, config: &SessionConfig) -> JobResult;
}

impl<F> JobRunner for F
where
    F: Fn(&JobDefinition, &JobState, &SessionConfig) -> JobResult + Send + Sync,
{
    fn run(&self, job: &JobDefinition, state: &JobState, config: &SessionConfig) -> JobResult {
        self(job, state, config)
    }
}

/// What one call to [`SessionRunner::run`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Jobs run, in order, with their outcome.
    pub ran: Vec<(JobId, Outcome)>,
    /// Jobs settled as not supported because a dependency or resource
    /// requirement failed.
    pub not_supported: Vec<JobId>,
    /// Run-list jobs still without a result when the loop stopped,
    /// including jobs whose runner returned no outcome.
    pub unfinished: Vec<JobId>,
}

pub struct SessionRunner<R, C = SystemClock> {
    runner: R,
    config: SessionConfig,
    clock: C,
}

impl<R: JobRunner> SessionRunner<R> {
    pub fn new(runner: R, config: SessionConfig) -> Self {
        Self { runner, config, clock: SystemClock }
    }
}

impl<R: JobRunner, C: Clock> SessionRunner<R, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> SessionRunner<R, C2> {
        SessionRunner { runner: self.runner, config: self.config, clock }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn run(&self, handle: &SessionHandle) -> Result<RunReport, SessionError> {
        self.run_with_checkpoint(handle, &mut |_| {})
    }

    /// Run until nothing on the run list can start. `checkpoint` is called
    /// before each job starts and after its result is committed.
    pub fn run_with_checkpoint(
        &self,
        handle: &SessionHandle,
        checkpoint: &mut dyn FnMut(&SessionState),
    ) -> Result<RunReport, SessionError> {
        let mut report = RunReport::default();
        // Each job is attempted at most once per run, even if its runner
        // left it without an outcome.
        let mut attempted: HashSet<JobId> = HashSet::new();
        handle.with_mut(|state| state.metadata_mut().set_flag(SessionFlag::Incomplete));

        loop {
            report.not_supported.extend(handle.with_mut(|state| self.settle_blocked(state))?);

            let next = handle.with(|state| state.runnable_jobs().find(|id| !attempted.contains(*id)).cloned());
            let Some(job_id) = next else {
                break;
            };
            attempted.insert(job_id.clone());

            handle.with_mut(|state| {
                let metadata = state.metadata_mut();
                metadata.running_job_name = Some(job_id.clone());
                metadata.last_job_start_time = Some(self.clock.now());
                checkpoint(state);
            });

            let result = handle.run_job(&self.runner, &job_id, &self.config)?;
            if result.outcome.is_none() {
                tracing::warn!(job_id = %job_id, "job finished without an outcome");
            } else {
                tracing::info!(job_id = %job_id, outcome = %result.outcome, "job finished");
            }
            report.ran.push((job_id.clone(), result.outcome));

            handle.with_mut(|state| {
                state.metadata_mut().running_job_name = None;
                if self.config.adopt_generated_jobs {
                    adopt_generated_jobs(state, &job_id);
                }
                checkpoint(state);
            });
        }

        handle.with_mut(|state| {
            report.unfinished = state.pending_jobs().cloned().collect();
            if report.unfinished.is_empty() {
                state.metadata_mut().clear_flag(SessionFlag::Incomplete);
            } else {
                tracing::warn!(remaining = report.unfinished.len(), "run loop stopped with unfinished jobs");
            }
            checkpoint(state);
        });
        Ok(report)
    }

    /// Give every pending run-list job whose inhibitors are all failures a
    /// not-supported result. Repeats until no such job is left, since each
    /// settled job can fail its dependents.
    fn settle_blocked(&self, state: &mut SessionState) -> Result<Vec<JobId>, SessionError> {
        let mut settled = Vec::new();
        loop {
            let blocked: Vec<(JobId, String)> = state
                .pending_jobs()
                .filter_map(|id| state.job_state(id).map(|job_state| (id, job_state)))
                .filter(|(_, job_state)| {
                    let inhibitors = job_state.readiness_inhibitors();
                    !inhibitors.is_empty() && inhibitors.iter().all(|i| i.cause().is_failure())
                })
                .map(|(id, job_state)| (id.clone(), job_state.readiness_description()))
                .collect();
            if blocked.is_empty() {
                return Ok(settled);
            }
            for (job_id, description) in blocked {
                tracing::info!(job_id = %job_id, reason = %description, "job cannot run");
                let result = JobResult::new(Outcome::NotSupported).comments(description);
                state.update_job_result(&job_id, result)?;
                settled.push(job_id);
            }
        }
    }
}

/// Append the jobs `generator` produced to the desired list when the
/// generator itself was desired.
fn adopt_generated_jobs(state: &mut SessionState, generator: &JobId) {
    if !state.desired_job_list().contains(generator) {
        return;
    }
    let adopted: Vec<JobId> = state
        .job_state_map()
        .iter()
        .filter(|(id, job_state)| {
            job_state.via() == Some(generator) && !state.desired_job_list().contains(*id)
        })
        .map(|(id, _)| id.clone())
        .collect();
    if adopted.is_empty() {
        return;
    }
    tracing::debug!(via = %generator, count = adopted.len(), "adopting generated jobs");
    let mut desired = state.desired_job_list().to_vec();
    desired.extend(adopted);
    for problem in state.update_desired_job_list(&desired) {
        tracing::warn!(job_id = %problem.affected_job(), error = %problem, "generated job cannot run");
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
