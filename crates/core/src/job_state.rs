// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Per-session mutable state of one job

use crate::id::JobId;
use crate::inhibitor::ReadinessInhibitor;
use crate::job::JobDefinition;
use crate::result::{JobResult, Outcome};
use std::sync::Arc;

/// Latest result and computed readiness of one job.
///
/// The inhibitor list is derived data: it is recomputed by the session
/// after every change and never persisted.
#[derive(Debug, Clone)]
pub struct JobState {
    job: Arc<JobDefinition>,
    result: JobResult,
    result_history: Vec<JobResult>,
    via: Option<JobId>,
    readiness_inhibitors: Vec<ReadinessInhibitor>,
}

impl JobState {
    pub fn new(job: Arc<JobDefinition>) -> Self {
        Self {
            job,
            result: JobResult::default(),
            result_history: Vec::new(),
            via: None,
            readiness_inhibitors: vec![ReadinessInhibitor::undesired()],
        }
    }

    pub fn job(&self) -> &Arc<JobDefinition> {
        &self.job
    }

    pub fn result(&self) -> &JobResult {
        &self.result
    }

    pub fn outcome(&self) -> Outcome {
        self.result.outcome
    }

    /// Every non-hollow result this job received, oldest first.
    pub fn result_history(&self) -> &[JobResult] {
        &self.result_history
    }

    /// Replace the current result; non-hollow results are also recorded
    /// in the history.
    pub fn set_result(&mut self, result: JobResult) {
        if !result.is_hollow() {
            self.result_history.push(result.clone());
        }
        self.result = result;
    }

    /// The local job that most recently generated this one.
    pub fn via(&self) -> Option<&JobId> {
        self.via.as_ref()
    }

    pub fn set_via(&mut self, via: Option<JobId>) {
        self.via = via;
    }

    pub fn readiness_inhibitors(&self) -> &[ReadinessInhibitor] {
        &self.readiness_inhibitors
    }

    pub fn set_readiness_inhibitors(&mut self, inhibitors: Vec<ReadinessInhibitor>) {
        self.readiness_inhibitors = inhibitors;
    }

    pub fn can_start(&self) -> bool {
        self.readiness_inhibitors.is_empty()
    }

    pub fn readiness_description(&self) -> String {
        if self.can_start() {
            return "job can be started".to_string();
        }
        let reasons: Vec<String> = self.readiness_inhibitors.iter().map(ToString::to_string).collect();
        format!("job cannot be started: {}", reasons.join(", "))
    }
}

#[cfg(test)]
#[path = "job_state_tests.rs"]
mod tests;
