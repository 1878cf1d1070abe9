// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Session snapshots
//!
//! A snapshot records what a session needs to be rebuilt over a fresh job
//! catalog: the checksums of the jobs that matter, their result history,
//! the desired and mandatory lists and the metadata. Readiness is never
//! stored. Results of resource jobs are left out so their facts are
//! rediscovered on the next run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tb_core::{Clock, JobId, JobResult, PluginKind};
use tb_engine::{SessionMetadata, SessionState};
use thiserror::Error;

/// Current snapshot schema version
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version
    #[serde(rename = "v")]
    pub version: u32,
    pub created_at: DateTime<Utc>,
    /// Checksum of every job that has a result or is on the run list.
    pub jobs: BTreeMap<JobId, String>,
    /// Result history of every job that has one.
    pub results: BTreeMap<JobId, Vec<JobResult>>,
    pub desired_job_list: Vec<JobId>,
    pub mandatory_job_list: Vec<JobId>,
    pub metadata: SessionMetadata,
}

/// Capture `state` as a snapshot stamped with `clock`.
pub fn suspend(state: &SessionState, clock: &impl Clock) -> Snapshot {
    let run_list: HashSet<&JobId> = state.run_list().iter().collect();
    let mut jobs = BTreeMap::new();
    let mut results = BTreeMap::new();

    for (id, job_state) in state.job_state_map() {
        let job = job_state.job();
        if !job_state.result().is_hollow() || run_list.contains(id) {
            jobs.insert(id.clone(), job.checksum().to_string());
        }
        if job.plugin() == PluginKind::Resource {
            continue;
        }
        if !job_state.result_history().is_empty() {
            results.insert(id.clone(), job_state.result_history().to_vec());
        }
    }

    tracing::debug!(jobs = jobs.len(), results = results.len(), "suspending session");
    Snapshot {
        version: CURRENT_SNAPSHOT_VERSION,
        created_at: clock.now(),
        jobs,
        results,
        desired_job_list: state.desired_job_list().to_vec(),
        mandatory_job_list: state.mandatory_job_list().to_vec(),
        metadata: state.metadata().clone(),
    }
}

/// Serialize as zstd-compressed JSON.
pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, SnapshotError> {
    let json = serde_json::to_vec(snapshot)?;
    Ok(zstd::encode_all(json.as_slice(), ZSTD_LEVEL)?)
}

pub fn decode(data: &[u8]) -> Result<Snapshot, SnapshotError> {
    let json = zstd::decode_all(data)?;
    Ok(serde_json::from_slice(&json)?)
}

#[derive(Deserialize)]
struct MetadataOnly {
    metadata: SessionMetadata,
}

/// Read only the metadata of an encoded snapshot.
pub fn peek(data: &[u8]) -> Result<SessionMetadata, SnapshotError> {
    let json = zstd::decode_all(data)?;
    let MetadataOnly { metadata } = serde_json::from_slice(&json)?;
    Ok(metadata)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
