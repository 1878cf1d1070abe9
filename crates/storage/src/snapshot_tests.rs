// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

use super::*;
use std::sync::Arc;
use tb_core::test_support::{depending_job, output, pass, requiring_job, resource_job, shell_job};
use tb_core::{FakeClock, Outcome};
use tb_engine::SessionFlag;

fn sample_session() -> SessionState {
    let jobs = vec![requiring_job("a", "r.ok == 'yes'"), resource_job("r"), shell_job("idle"), depending_job("b", "a")];
    let mut state = SessionState::new(jobs.into_iter().map(Arc::new).collect()).unwrap();
    state.update_desired_job_list(&[JobId::new("a")]);
    state.update_job_result("r", output(Outcome::Pass, "ok: yes\n")).unwrap();
    state.update_job_result("a", pass()).unwrap();
    state.metadata_mut().title = Some("smoke".to_string());
    state.metadata_mut().set_flag(SessionFlag::Incomplete);
    state
}

#[test]
fn suspend_records_relevant_jobs() {
    let state = sample_session();
    let snapshot = suspend(&state, &FakeClock::new());

    let ids: Vec<&str> = snapshot.jobs.keys().map(JobId::as_str).collect();
    assert_eq!(ids, vec!["a", "r"]);
    assert_eq!(snapshot.jobs[&JobId::new("a")], state.job("a").unwrap().checksum());
    assert_eq!(snapshot.desired_job_list, vec![JobId::new("a")]);
    assert_eq!(snapshot.version, CURRENT_SNAPSHOT_VERSION);
    assert_eq!(snapshot.created_at, FakeClock::new().now());
}

#[test]
fn suspend_drops_resource_results() {
    let snapshot = suspend(&sample_session(), &FakeClock::new());
    assert!(snapshot.results.contains_key(&JobId::new("a")));
    assert!(!snapshot.results.contains_key(&JobId::new("r")));
}

#[test]
fn encoded_snapshot_is_zstd_and_decodes() {
    let snapshot = suspend(&sample_session(), &FakeClock::new());
    let data = encode(&snapshot).unwrap();
    assert_eq!(&data[..4], b"\x28\xb5\x2f\xfd");
    assert_eq!(decode(&data).unwrap(), snapshot);
}

#[test]
fn peek_reads_metadata_only() {
    let data = encode(&suspend(&sample_session(), &FakeClock::new())).unwrap();
    let metadata = peek(&data).unwrap();
    assert_eq!(metadata.title.as_deref(), Some("smoke"));
    assert!(metadata.has_flag(SessionFlag::Incomplete));
}

#[yare::parameterized(
    not_zstd     = { b"{\"v\": 1}".as_slice() },
    bad_payload  = { b"\x28\xb5\x2f\xfd\x00\x00CORRUPT".as_slice() },
)]
fn garbage_fails_to_decode(data: &[u8]) {
    assert!(decode(data).is_err());
    assert!(peek(data).is_err());
}

#[test]
fn invalid_json_is_a_json_error() {
    let data = zstd::encode_all(b"not json".as_slice(), 3).unwrap();
    assert!(matches!(decode(&data), Err(SnapshotError::Json(_))));
}
