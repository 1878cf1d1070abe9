// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Shared helpers for session specs

pub use std::sync::Arc;
pub use tb_core::{
    parse_records, InhibitionCause, JobDefinition, JobId, JobOrigin, JobResult, JobState, Outcome,
    SessionConfig,
};
pub use tb_engine::{SessionHandle, SessionRunner, SessionState};

use parking_lot::Mutex;
use std::collections::HashMap;

/// Parse job definition records into a catalog.
pub fn catalog(text: &str) -> Vec<Arc<JobDefinition>> {
    let parsed = parse_records(text, "catalog.pxu");
    assert!(parsed.error.is_none(), "catalog does not parse: {:?}", parsed.error);
    parsed
        .records
        .iter()
        .map(|record| {
            let origin = JobOrigin::File(record.origin.clone());
            Arc::new(JobDefinition::from_record(record, None, origin).unwrap())
        })
        .collect()
}

pub fn ids(list: &[&str]) -> Vec<JobId> {
    list.iter().map(|id| JobId::new(*id)).collect()
}

pub fn id_strs(list: &[JobId]) -> Vec<&str> {
    list.iter().map(JobId::as_str).collect()
}

pub fn stdout(outcome: Outcome, text: &str) -> JobResult {
    JobResult::with_stdout(outcome, text)
}

/// Job runner answering from canned results, `Pass` for anything else.
#[derive(Default)]
pub struct Script {
    results: HashMap<String, JobResult>,
    ran: Mutex<Vec<String>>,
}

impl Script {
    pub fn answer(mut self, id: &str, result: JobResult) -> Self {
        self.results.insert(id.to_string(), result);
        self
    }

    pub fn ran(&self) -> Vec<String> {
        self.ran.lock().clone()
    }
}

impl tb_engine::JobRunner for Script {
    fn run(&self, job: &JobDefinition, _state: &JobState, _config: &SessionConfig) -> JobResult {
        self.ran.lock().push(job.id().to_string());
        self.results.get(job.id().as_str()).cloned().unwrap_or_else(|| JobResult::new(Outcome::Pass))
    }
}
