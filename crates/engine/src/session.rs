// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Session state
//!
//! [`SessionState`] owns the job catalog and one [`JobState`] per job,
//! the resource map and the desired and run lists. Every mutation leaves
//! the inhibitor lists recomputed, except `add_job` with
//! `recompute = false`.
//!
//! The catalog is an id-indexed arena in insertion order. Adding jobs
//! never disturbs the position of existing ones.

use crate::controller::SessionController;
use crate::metadata::SessionMetadata;
use crate::solver::{DependencyError, DependencySolver};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tb_core::{
    EventSink, JobDefinition, JobId, JobResult, JobState, NullSink, Outcome, PluginKind,
    ReadinessInhibitor, Resource, ResourceMap, SessionEvent,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("job {0} is not part of the session")]
    UnknownJob(JobId),

    #[error("cannot remove job {0}: it is on the run list")]
    JobOnRunList(JobId),

    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

/// Estimated duration in seconds of the automated and manual parts of the
/// run list. Either part is `None` when some job lacks an estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationEstimate {
    pub automated: Option<f64>,
    pub manual: Option<f64>,
}

pub struct SessionState {
    jobs: IndexMap<JobId, JobState>,
    resource_map: ResourceMap,
    desired_job_list: Vec<JobId>,
    mandatory_job_list: Vec<JobId>,
    run_list: Vec<JobId>,
    metadata: SessionMetadata,
    controller: Arc<SessionController>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("jobs", &self.jobs.len())
            .field("desired_job_list", &self.desired_job_list)
            .field("run_list", &self.run_list)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl SessionState {
    /// New session over `job_list`. Identical duplicates are dropped;
    /// differing duplicates are an error.
    pub fn new(job_list: Vec<Arc<JobDefinition>>) -> Result<Self, DependencyError> {
        let mut jobs: IndexMap<JobId, JobState> = IndexMap::with_capacity(job_list.len());
        for job in job_list {
            match jobs.get(job.id()) {
                Some(existing) if existing.job().is_identical(&job) => {}
                Some(_) => return Err(DependencyError::Duplicate { job: job.id().clone() }),
                None => {
                    jobs.insert(job.id().clone(), JobState::new(job));
                }
            }
        }
        Ok(Self {
            jobs,
            resource_map: ResourceMap::new(),
            desired_job_list: Vec::new(),
            mandatory_job_list: Vec::new(),
            run_list: Vec::new(),
            metadata: SessionMetadata::default(),
            controller: Arc::new(SessionController::default()),
            events: Arc::new(NullSink),
        })
    }

    pub fn with_controller(mut self, controller: Arc<SessionController>) -> Self {
        self.controller = controller;
        self.recompute_job_readiness();
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    // ── Accessors ──────────────────────────────────────────────────────

    /// All known jobs in insertion order.
    pub fn job_list(&self) -> impl Iterator<Item = &Arc<JobDefinition>> {
        self.jobs.values().map(JobState::job)
    }

    pub fn job_state_map(&self) -> &IndexMap<JobId, JobState> {
        &self.jobs
    }

    pub fn job_state(&self, id: &str) -> Option<&JobState> {
        self.jobs.get(id)
    }

    pub fn job(&self, id: &str) -> Option<&Arc<JobDefinition>> {
        self.jobs.get(id).map(JobState::job)
    }

    pub fn desired_job_list(&self) -> &[JobId] {
        &self.desired_job_list
    }

    pub fn mandatory_job_list(&self) -> &[JobId] {
        &self.mandatory_job_list
    }

    /// Desired jobs and their dependencies, dependencies first.
    pub fn run_list(&self) -> &[JobId] {
        &self.run_list
    }

    pub fn resource_map(&self) -> &ResourceMap {
        &self.resource_map
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut SessionMetadata {
        &mut self.metadata
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    // ── Selection ──────────────────────────────────────────────────────

    /// Replace the desired list (mandatory jobs first) and recompute the
    /// run list. Jobs that cannot be solved are dropped from the desired
    /// list; one problem is returned per dropped job.
    pub fn update_desired_job_list(&mut self, desired: &[JobId]) -> Vec<DependencyError> {
        self.update_desired_job_list_with(desired, true)
    }

    pub fn update_desired_job_list_with(
        &mut self,
        desired: &[JobId],
        include_mandatory: bool,
    ) -> Vec<DependencyError> {
        let mut desired_job_list: Vec<JobId> = Vec::new();
        let mandatory = if include_mandatory { self.mandatory_job_list.as_slice() } else { &[] };
        for id in mandatory.iter().chain(desired) {
            if !desired_job_list.contains(id) {
                desired_job_list.push(id.clone());
            }
        }

        let mut job_list: Vec<Arc<JobDefinition>> = self.job_list().cloned().collect();
        let mut problems = Vec::new();
        let mut run_list = Vec::new();
        while !desired_job_list.is_empty() {
            match DependencySolver::resolve_dependencies(&job_list, &desired_job_list) {
                Ok(solved) => {
                    run_list = solved.iter().map(|job| job.id().clone()).collect();
                    break;
                }
                Err(problem) => {
                    tracing::warn!(
                        job_id = %problem.affected_job(),
                        error = %problem,
                        "dropping desired job"
                    );
                    let affected = problem.affected_job().clone();
                    desired_job_list.retain(|id| *id != affected);
                    job_list.retain(|job| *job.id() != affected);
                    problems.push(problem);
                }
            }
        }

        self.desired_job_list = desired_job_list;
        self.run_list = run_list;
        self.emit(SessionEvent::DesiredListChanged {
            desired: self.desired_job_list.clone(),
            run_list: self.run_list.clone(),
        });
        self.recompute_job_readiness();
        problems
    }

    /// Jobs prepended to every desired list. Takes effect on the next
    /// `update_desired_job_list`.
    pub fn update_mandatory_job_list(&mut self, mandatory: Vec<JobId>) {
        self.mandatory_job_list = mandatory;
    }

    // ── Results ────────────────────────────────────────────────────────

    /// Record `result` for `job_id`, apply its side effects and recompute
    /// readiness.
    pub fn update_job_result(&mut self, job_id: &str, result: JobResult) -> Result<(), SessionError> {
        let job = self
            .job(job_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownJob(JobId::new(job_id)))?;
        let controller = Arc::clone(&self.controller);
        controller.observe_result(self, &job, result);
        self.recompute_job_readiness();
        Ok(())
    }

    pub(crate) fn store_result(&mut self, job_id: &JobId, result: JobResult) {
        if let Some(state) = self.jobs.get_mut(job_id) {
            state.set_result(result);
        }
    }

    /// Replace the resources of `job_id`.
    pub fn set_resource_list(&mut self, job_id: JobId, resources: Vec<Resource>) {
        self.resource_map.set(job_id, resources);
    }

    // ── Catalog ────────────────────────────────────────────────────────

    /// Add `job` to the catalog. An identical job with the same id is kept
    /// and only its provenance is updated; a differing one is an error and
    /// leaves the session untouched. New jobs start undesired.
    pub fn add_job(
        &mut self,
        job: Arc<JobDefinition>,
        recompute: bool,
        via: Option<JobId>,
    ) -> Result<Arc<JobDefinition>, DependencyError> {
        let added = match self.jobs.get_mut(job.id()) {
            Some(existing) if existing.job().is_identical(&job) => {
                if via.is_some() {
                    existing.set_via(via);
                }
                Arc::clone(existing.job())
            }
            Some(_) => return Err(DependencyError::Duplicate { job: job.id().clone() }),
            None => {
                let mut state = JobState::new(Arc::clone(&job));
                state.set_via(via.clone());
                self.jobs.insert(job.id().clone(), state);
                self.emit(SessionEvent::JobStateMapChanged);
                self.emit(SessionEvent::JobAdded { job_id: job.id().clone(), via });
                job
            }
        };
        if recompute {
            self.recompute_job_readiness();
        }
        Ok(added)
    }

    /// Remove every job matching `predicate`, with its resources. Fails
    /// without removing anything if a matching job is on the run list.
    pub fn trim_job_list(
        &mut self,
        predicate: impl Fn(&JobDefinition) -> bool,
    ) -> Result<Vec<JobId>, SessionError> {
        let remove: Vec<JobId> =
            self.job_list().filter(|job| predicate(job)).map(|job| job.id().clone()).collect();
        if let Some(id) = remove.iter().find(|id| self.run_list.contains(id)) {
            return Err(SessionError::JobOnRunList(id.clone()));
        }
        for id in &remove {
            self.jobs.shift_remove(id);
            self.resource_map.remove(id);
            self.emit(SessionEvent::JobRemoved { job_id: id.clone() });
        }
        if !remove.is_empty() {
            self.emit(SessionEvent::JobStateMapChanged);
            self.recompute_job_readiness();
        }
        Ok(remove)
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// Estimate the run list, adding `manual_overhead` seconds per manual
    /// job.
    pub fn get_estimated_duration(&self, manual_overhead: f64) -> DurationEstimate {
        let mut automated = Some(0.0);
        let mut manual = Some(0.0);
        for job in self.run_list.iter().filter_map(|id| self.job(id)) {
            if job.automated() {
                automated = match (automated, job.estimated_duration()) {
                    (Some(total), Some(estimate)) => Some(total + estimate),
                    _ => None,
                };
            } else if let Some(total) = manual {
                manual = match job.estimated_duration() {
                    Some(estimate) => Some(total + manual_overhead + estimate),
                    None if job.command().is_some() => None,
                    None => Some(total + manual_overhead),
                };
            }
        }
        DurationEstimate { automated, manual }
    }

    /// Number of jobs per outcome, ignoring jobs that have not run.
    pub fn get_outcome_stats(&self) -> BTreeMap<Outcome, usize> {
        self.outcome_stats(|_| true)
    }

    /// Like [`Self::get_outcome_stats`] but without resource and attachment
    /// jobs.
    pub fn get_test_outcome_stats(&self) -> BTreeMap<Outcome, usize> {
        self.outcome_stats(|job| !matches!(job.plugin(), PluginKind::Resource | PluginKind::Attachment))
    }

    fn outcome_stats(&self, include: impl Fn(&JobDefinition) -> bool) -> BTreeMap<Outcome, usize> {
        let mut stats = BTreeMap::new();
        for state in self.jobs.values() {
            if state.outcome().is_none() || !include(state.job()) {
                continue;
            }
            *stats.entry(state.outcome()).or_insert(0) += 1;
        }
        stats
    }

    /// Run-list jobs that can start and have not run yet, in run order.
    pub fn runnable_jobs(&self) -> impl Iterator<Item = &JobId> {
        self.run_list.iter().filter(|id| {
            self.jobs.get(*id).is_some_and(|state| state.can_start() && state.outcome().is_none())
        })
    }

    /// First run-list job that can start and has not run yet.
    pub fn next_runnable(&self) -> Option<&JobId> {
        self.runnable_jobs().next()
    }

    /// Run-list jobs without a result.
    pub fn pending_jobs(&self) -> impl Iterator<Item = &JobId> {
        self.run_list.iter().filter(|id| self.jobs.get(*id).is_some_and(|state| state.outcome().is_none()))
    }

    // ── Readiness ──────────────────────────────────────────────────────

    /// Recompute every inhibitor list in one pass over the run list.
    /// Jobs off the run list only carry `Undesired`.
    pub fn recompute_job_readiness(&mut self) {
        for state in self.jobs.values_mut() {
            state.set_readiness_inhibitors(vec![ReadinessInhibitor::undesired()]);
        }
        let this: &SessionState = self;
        let computed: Vec<(JobId, Vec<ReadinessInhibitor>)> = this
            .run_list
            .iter()
            .filter_map(|id| this.job(id).map(|job| (id.clone(), this.controller.inhibitor_list(this, job))))
            .collect();
        for (id, inhibitors) in computed {
            if let Some(state) = self.jobs.get_mut(&id) {
                state.set_readiness_inhibitors(inhibitors);
            }
        }
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        self.events.emit(&event);
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
