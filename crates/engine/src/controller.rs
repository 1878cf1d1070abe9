// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Readiness and result policy
//!
//! The controller answers two questions for the session: what keeps a job
//! from starting, and what side effects a job's result has. The side
//! effects depend on the job's plugin and are dispatched over a closed set
//! of [`ResultPolicy`] variants.

use crate::session::SessionState;
use crate::solver::DependencyType;
use std::collections::BTreeSet;
use std::sync::Arc;
use tb_core::{
    parse_records, Evaluation, JobDefinition, JobId, JobOrigin, JobResult, Outcome, PluginKind,
    ReadinessInhibitor, RequirementEvaluator, Resource, SessionEvent, SimpleEvaluator,
};

/// What happens after a job's result is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultPolicy {
    /// Store the result and notify.
    Default,
    /// Also replace the job's resources with its parsed output.
    ResourceObserving,
    /// Also add the job definitions printed by the job to the session.
    LocalGenerating,
}

impl ResultPolicy {
    pub fn for_plugin(plugin: PluginKind) -> Self {
        match plugin {
            PluginKind::Resource => ResultPolicy::ResourceObserving,
            PluginKind::Local => ResultPolicy::LocalGenerating,
            _ => ResultPolicy::Default,
        }
    }
}

/// Computes inhibitors and applies result side effects.
pub struct SessionController {
    evaluator: Arc<dyn RequirementEvaluator>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new(Arc::new(SimpleEvaluator))
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController").finish_non_exhaustive()
    }
}

impl SessionController {
    pub fn new(evaluator: Arc<dyn RequirementEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Every job `job` needs to have run, with the edge kind.
    pub fn dependency_set(&self, job: &JobDefinition) -> BTreeSet<(DependencyType, JobId)> {
        let direct = job.direct_dependencies().iter().map(|id| (DependencyType::Direct, id.clone()));
        let resource = job.resource_dependencies().into_iter().map(|id| (DependencyType::Resource, id));
        direct.chain(resource).collect()
    }

    /// Reasons `job` cannot start, resource requirements first and then
    /// direct dependencies in sorted order.
    pub fn inhibitor_list(&self, session: &SessionState, job: &JobDefinition) -> Vec<ReadinessInhibitor> {
        let mut inhibitors = Vec::new();
        let outcome_of = |id: &JobId| session.job_state(id).map(|state| state.outcome());

        if let Some(program) = job.resource_program() {
            for expression in program.expressions() {
                match self.evaluator.evaluate(expression, session.resource_map()) {
                    Evaluation::Satisfied => {}
                    Evaluation::CannotEvaluate { .. } => {
                        for resource_id in expression.resource_ids() {
                            if outcome_of(resource_id) == Some(Outcome::Pass) {
                                continue;
                            }
                            inhibitors.push(ReadinessInhibitor::pending_resource(
                                resource_id.clone(),
                                expression.text(),
                            ));
                        }
                    }
                    Evaluation::Unsatisfied => {
                        for resource_id in expression.resource_ids() {
                            inhibitors.push(ReadinessInhibitor::failed_resource(
                                resource_id.clone(),
                                expression.text(),
                            ));
                        }
                    }
                }
            }
        }

        for dep in job.direct_dependencies() {
            match outcome_of(dep) {
                None | Some(Outcome::None) => inhibitors.push(ReadinessInhibitor::pending_dep(dep.clone())),
                Some(Outcome::Pass) => {}
                Some(_) => inhibitors.push(ReadinessInhibitor::failed_dep(dep.clone())),
            }
        }
        inhibitors
    }

    /// Store `result` on the job and apply its plugin's side effects.
    pub fn observe_result(&self, session: &mut SessionState, job: &Arc<JobDefinition>, result: JobResult) {
        let outcome = result.outcome;
        let stdout = match ResultPolicy::for_plugin(job.plugin()) {
            ResultPolicy::Default => None,
            _ if outcome.is_none() => None,
            _ => Some(result.stdout()),
        };
        session.store_result(job.id(), result);
        session.emit(SessionEvent::JobStateMapChanged);
        session.emit(SessionEvent::JobResultChanged { job_id: job.id().clone(), outcome });

        let Some(stdout) = stdout else {
            return;
        };
        match ResultPolicy::for_plugin(job.plugin()) {
            ResultPolicy::Default => {}
            ResultPolicy::ResourceObserving => self.store_resources(session, job, &stdout),
            ResultPolicy::LocalGenerating => self.generate_jobs(session, job, &stdout),
        }
    }

    fn store_resources(&self, session: &mut SessionState, job: &JobDefinition, stdout: &str) {
        let parsed = parse_records(stdout, &format!("output of {}", job.id()));
        if let Some(error) = &parsed.error {
            tracing::warn!(job_id = %job.id(), %error, "resource job returned invalid record data");
        }
        let mut resources: Vec<Resource> = parsed.records.into_iter().map(Resource::from).collect();
        for resource in &resources {
            tracing::debug!(job_id = %job.id(), attributes = resource.len(), "storing resource record");
        }
        if resources.is_empty() {
            resources.push(Resource::empty());
        }
        session.set_resource_list(job.id().clone(), resources);
    }

    fn generate_jobs(&self, session: &mut SessionState, job: &JobDefinition, stdout: &str) {
        let parsed = parse_records(stdout, &format!("output of {}", job.id()));
        if let Some(error) = &parsed.error {
            tracing::warn!(job_id = %job.id(), %error, "local job returned invalid record data");
        }
        for record in &parsed.records {
            let origin = JobOrigin::Generated {
                via: job.id().clone(),
                line_start: record.origin.line_start,
                line_end: record.origin.line_end,
            };
            let child = match JobDefinition::from_record(record, job.namespace(), origin) {
                Ok(child) => Arc::new(child),
                Err(error) => {
                    tracing::warn!(job_id = %job.id(), %error, "local job produced an invalid definition");
                    continue;
                }
            };
            match session.add_job(Arc::clone(&child), false, Some(job.id().clone())) {
                Ok(_) => tracing::info!(job_id = %child.id(), via = %job.id(), "storing generated job"),
                Err(error) => tracing::warn!(
                    job_id = %child.id(),
                    via = %job.id(),
                    %error,
                    "generated job collides with an existing job and was discarded"
                ),
            }
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
