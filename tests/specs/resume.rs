// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Save and resume specs
//!
//! Verify sessions survive a round trip through on-disk storage.

use crate::prelude::*;
use tb_core::{Clock, FakeClock};
use tb_storage::{encode, peek, resume_storage, suspend, ResumeError, ResumeOptions, SessionRepository};

const REQUIREMENT_CATALOG: &str = "\
id: A
plugin: shell
command: true
requires: R.ok == 'yes'

id: R
plugin: resource
command: probe
";

const SUITE_CATALOG: &str = "\
id: setup
plugin: shell
command: prepare

id: test-1
plugin: shell
command: check one
depends: setup

id: test-2
plugin: shell
command: check two
depends: setup
";

#[test]
fn resource_results_are_dropped_and_test_results_kept() {
    let dir = tempfile::tempdir().unwrap();
    let repository = SessionRepository::in_state_dir(dir.path());
    let storage = repository.create_storage("tb-").unwrap();

    let mut state = SessionState::new(catalog(REQUIREMENT_CATALOG)).unwrap();
    state.update_desired_job_list(&ids(&["A"]));
    state.update_job_result("R", stdout(Outcome::Pass, "ok: yes\n")).unwrap();
    state.update_job_result("A", JobResult::new(Outcome::Pass)).unwrap();
    storage.save_checkpoint(&encode(&suspend(&state, &FakeClock::new())).unwrap()).unwrap();

    let listed = repository.get_storage_list().unwrap();
    assert_eq!(listed.len(), 1);
    let resumed = resume_storage(&listed[0], catalog(REQUIREMENT_CATALOG), &ResumeOptions::default()).unwrap();

    assert_eq!(resumed.job_state("R").unwrap().outcome(), Outcome::None);
    let a = resumed.job_state("A").unwrap();
    assert_eq!(a.outcome(), Outcome::Pass);
    assert_eq!(a.readiness_inhibitors()[0].cause(), InhibitionCause::PendingResource);
    assert_eq!(id_strs(resumed.run_list()), vec!["R", "A"]);
}

#[test]
fn interrupted_run_continues_where_it_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let storage = SessionRepository::in_state_dir(dir.path()).create_storage("tb-").unwrap();
    let clock = FakeClock::new();

    let mut state = SessionState::new(catalog(SUITE_CATALOG)).unwrap();
    state.update_desired_job_list(&ids(&["test-1", "test-2"]));
    let handle = SessionHandle::new(state);
    handle.run_job(&Script::default(), &JobId::new("setup"), &SessionConfig::default()).unwrap();
    handle.with(|state| storage.save_checkpoint(&encode(&suspend(state, &clock)).unwrap()).unwrap());
    drop(handle);

    let resumed = resume_storage(&storage, catalog(SUITE_CATALOG), &ResumeOptions::default()).unwrap();
    let handle = SessionHandle::new(resumed);
    let runner = SessionRunner::new(Script::default(), SessionConfig::default());
    let report = runner
        .run_with_checkpoint(&handle, &mut |state| {
            storage.save_checkpoint(&encode(&suspend(state, &clock)).unwrap()).unwrap();
        })
        .unwrap();

    assert_eq!(runner.runner().ran(), vec!["test-1", "test-2"]);
    assert!(report.unfinished.is_empty());
    let metadata = peek(&storage.load_checkpoint().unwrap()).unwrap();
    assert!(metadata.flags.is_empty());
    assert_eq!(metadata.running_job_name, None);
}

#[test]
fn checkpoint_taken_mid_job_names_the_running_job() {
    let clock = FakeClock::new();
    let mut state = SessionState::new(catalog(SUITE_CATALOG)).unwrap();
    state.update_desired_job_list(&ids(&["test-1"]));
    let handle = SessionHandle::new(state);
    let runner = SessionRunner::new(Script::default(), SessionConfig::default()).with_clock(clock.clone());

    let mut first = None;
    runner
        .run_with_checkpoint(&handle, &mut |state| {
            if first.is_none() {
                first = Some(encode(&suspend(state, &clock)).unwrap());
            }
        })
        .unwrap();

    let metadata = peek(&first.unwrap()).unwrap();
    assert_eq!(metadata.running_job_name, Some(JobId::new("setup")));
    assert_eq!(metadata.last_job_start_time, Some(clock.now()));
}

#[test]
fn changed_catalog_refuses_to_resume() {
    let mut state = SessionState::new(catalog(SUITE_CATALOG)).unwrap();
    state.update_job_result("setup", JobResult::new(Outcome::Pass)).unwrap();
    let data = encode(&suspend(&state, &FakeClock::new())).unwrap();

    let changed = SUITE_CATALOG.replace("command: prepare", "command: prepare --fast");
    let err = tb_storage::resume(&data, catalog(&changed), &ResumeOptions::default()).unwrap_err();
    assert!(matches!(err, ResumeError::IncompatibleJob(id) if id == "setup"));
}
