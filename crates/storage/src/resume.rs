// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Resuming a session from a snapshot
//!
//! The session is rebuilt over a caller-supplied catalog. Stored results
//! are replayed through `update_job_result` so local jobs regenerate their
//! children; results of jobs that only a later replay can produce are
//! retried until no progress is made. Readiness is recomputed from scratch.

use crate::snapshot::{decode, Snapshot, CURRENT_SNAPSHOT_VERSION};
use crate::storage::{SessionStorage, StorageError};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use tb_core::{JobDefinition, JobId, SessionConfig};
use tb_engine::{DependencyError, SessionState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("session data is corrupted: {0}")]
    Corrupted(String),

    #[error("snapshot version {found} is not supported (expected {expected})")]
    IncompatibleVersion { found: u32, expected: u32 },

    #[error("session {field} is {found:?}, expected {expected:?}")]
    MetadataMismatch { field: &'static str, expected: String, found: Option<String> },

    #[error("definition of job {0} has changed")]
    IncompatibleJob(JobId),

    #[error("job catalog is invalid: {0}")]
    Catalog(#[from] DependencyError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeOptions {
    /// Refuse snapshots stored by a different application.
    pub expected_app_id: Option<String>,
    /// Refuse snapshots with a different title.
    pub expected_title: Option<String>,
    /// Accept jobs whose definition changed since the snapshot.
    pub ignore_job_checksums: bool,
}

impl ResumeOptions {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            expected_app_id: config.app_id.clone(),
            expected_title: config.title.clone(),
            ignore_job_checksums: config.ignore_job_checksums,
        }
    }
}

/// Rebuild a session from encoded snapshot `data` over `job_list`.
pub fn resume(
    data: &[u8],
    job_list: Vec<Arc<JobDefinition>>,
    options: &ResumeOptions,
) -> Result<SessionState, ResumeError> {
    let snapshot = decode(data).map_err(|e| ResumeError::Corrupted(e.to_string()))?;
    if snapshot.version != CURRENT_SNAPSHOT_VERSION {
        return Err(ResumeError::IncompatibleVersion {
            found: snapshot.version,
            expected: CURRENT_SNAPSHOT_VERSION,
        });
    }
    check_metadata("app_id", options.expected_app_id.as_deref(), snapshot.metadata.app_id.as_deref())?;
    check_metadata("title", options.expected_title.as_deref(), snapshot.metadata.title.as_deref())?;

    let mut session = SessionState::new(job_list)?;
    restore_jobs_and_results(&mut session, &snapshot, options)?;
    *session.metadata_mut() = snapshot.metadata.clone();
    restore_job_lists(&mut session, &snapshot)?;
    trim_unreferenced(&mut session, &snapshot)?;
    tracing::info!(
        jobs = session.job_state_map().len(),
        run_list = session.run_list().len(),
        "session resumed"
    );
    Ok(session)
}

/// Load the last checkpoint of `storage` and resume it.
pub fn resume_storage(
    storage: &SessionStorage,
    job_list: Vec<Arc<JobDefinition>>,
    options: &ResumeOptions,
) -> Result<SessionState, ResumeError> {
    let data = storage.load_checkpoint()?;
    if data.is_empty() {
        return Err(ResumeError::Corrupted(format!("session {} was never saved", storage.id())));
    }
    resume(&data, job_list, options)
}

fn check_metadata(field: &'static str, expected: Option<&str>, found: Option<&str>) -> Result<(), ResumeError> {
    match expected {
        Some(expected) if found != Some(expected) => Err(ResumeError::MetadataMismatch {
            field,
            expected: expected.to_string(),
            found: found.map(str::to_string),
        }),
        _ => Ok(()),
    }
}

enum Replay {
    Done,
    /// Job is not in the session yet; a later replay may generate it.
    NotYetKnown,
}

fn restore_jobs_and_results(
    session: &mut SessionState,
    snapshot: &Snapshot,
    options: &ResumeOptions,
) -> Result<(), ResumeError> {
    let first_pass: BTreeSet<&JobId> = snapshot.jobs.keys().chain(snapshot.results.keys()).collect();
    let mut leftover: VecDeque<&JobId> = VecDeque::new();
    for job_id in first_pass {
        if let Replay::NotYetKnown = replay_job(session, snapshot, options, job_id)? {
            leftover.push_back(job_id);
        }
    }

    while !leftover.is_empty() {
        let mut progressed = false;
        for _ in 0..leftover.len() {
            let Some(job_id) = leftover.pop_front() else {
                break;
            };
            match replay_job(session, snapshot, options, job_id)? {
                Replay::Done => progressed = true,
                Replay::NotYetKnown => {
                    tracing::debug!(job_id = %job_id, "job not known yet, retrying later");
                    leftover.push_back(job_id);
                }
            }
        }
        if !progressed {
            let remaining: Vec<&str> = leftover.iter().map(|id| id.as_str()).collect();
            return Err(ResumeError::Corrupted(format!("unknown jobs remaining: {}", remaining.join(", "))));
        }
    }
    Ok(())
}

fn replay_job(
    session: &mut SessionState,
    snapshot: &Snapshot,
    options: &ResumeOptions,
    job_id: &JobId,
) -> Result<Replay, ResumeError> {
    let checksum = snapshot
        .jobs
        .get(job_id)
        .ok_or_else(|| ResumeError::Corrupted(format!("job {job_id} has results but no checksum")))?;
    let Some(job) = session.job(job_id) else {
        return Ok(Replay::NotYetKnown);
    };
    if job.checksum() != checksum.as_str() {
        if !options.ignore_job_checksums {
            return Err(ResumeError::IncompatibleJob(job_id.clone()));
        }
        tracing::warn!(job_id = %job_id, "ignoring changes to job definition");
    }

    for result in snapshot.results.get(job_id).into_iter().flatten() {
        session
            .update_job_result(job_id, result.clone())
            .map_err(|e| ResumeError::Corrupted(e.to_string()))?;
    }
    Ok(Replay::Done)
}

fn known_ids<'a>(session: &SessionState, ids: &'a [JobId], field: &str) -> Result<&'a [JobId], ResumeError> {
    match ids.iter().find(|id| session.job(id).is_none()) {
        Some(unknown) => Err(ResumeError::Corrupted(format!("'{field}' refers to unknown job {unknown}"))),
        None => Ok(ids),
    }
}

fn restore_job_lists(session: &mut SessionState, snapshot: &Snapshot) -> Result<(), ResumeError> {
    let mandatory = known_ids(session, &snapshot.mandatory_job_list, "mandatory_job_list")?.to_vec();
    let desired = known_ids(session, &snapshot.desired_job_list, "desired_job_list")?;
    session.update_mandatory_job_list(mandatory);
    for problem in session.update_desired_job_list(desired) {
        tracing::warn!(job_id = %problem.affected_job(), error = %problem, "desired job cannot run after resume");
    }
    Ok(())
}

/// Drop every job that is neither on the run list nor in the snapshot.
fn trim_unreferenced(session: &mut SessionState, snapshot: &Snapshot) -> Result<(), ResumeError> {
    let keep: HashSet<JobId> =
        session.run_list().iter().cloned().chain(snapshot.jobs.keys().cloned()).collect();
    let removed = session
        .trim_job_list(|job| !keep.contains(job.id()))
        .map_err(|e| ResumeError::Corrupted(e.to_string()))?;
    if !removed.is_empty() {
        tracing::debug!(count = removed.len(), "trimmed jobs not referenced by the snapshot");
    }
    Ok(())
}

#[cfg(test)]
#[path = "resume_tests.rs"]
mod tests;
