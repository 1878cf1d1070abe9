// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

use super::*;
use crate::snapshot::{encode, suspend};
use tb_core::test_support::{
    fail, generated_job, local_job, local_output, output, pass, requiring_job, resource_job, shell_job,
};
use tb_core::{FakeClock, Outcome, ReadinessInhibitor};

fn catalog(jobs: Vec<JobDefinition>) -> Vec<Arc<JobDefinition>> {
    jobs.into_iter().map(Arc::new).collect()
}

fn ids(list: &[&str]) -> Vec<JobId> {
    list.iter().map(|id| JobId::new(*id)).collect()
}

fn save(state: &SessionState) -> Vec<u8> {
    encode(&suspend(state, &FakeClock::new())).unwrap()
}

fn requirement_catalog() -> Vec<Arc<JobDefinition>> {
    catalog(vec![requiring_job("a", "r.ok == 'yes'"), resource_job("r")])
}

#[test]
fn resource_results_are_rediscovered() {
    let mut state = SessionState::new(requirement_catalog()).unwrap();
    state.update_desired_job_list(&ids(&["a"]));
    state.update_job_result("r", output(Outcome::Pass, "ok: yes\n")).unwrap();
    state.update_job_result("a", pass()).unwrap();

    let resumed = resume(&save(&state), requirement_catalog(), &ResumeOptions::default()).unwrap();
    assert_eq!(resumed.job_state("r").unwrap().outcome(), Outcome::None);
    assert_eq!(resumed.job_state("a").unwrap().outcome(), Outcome::Pass);
    assert!(resumed.resource_map().is_empty());
    assert_eq!(resumed.run_list(), ids(&["r", "a"]).as_slice());
    assert_eq!(
        resumed.job_state("a").unwrap().readiness_inhibitors(),
        &[ReadinessInhibitor::pending_resource(JobId::new("r"), "r.ok == 'yes'")]
    );
}

#[test]
fn result_history_is_replayed_in_order() {
    let mut state = SessionState::new(catalog(vec![shell_job("a")])).unwrap();
    state.update_job_result("a", fail()).unwrap();
    state.update_job_result("a", pass()).unwrap();

    let resumed = resume(&save(&state), catalog(vec![shell_job("a")]), &ResumeOptions::default()).unwrap();
    let history: Vec<Outcome> =
        resumed.job_state("a").unwrap().result_history().iter().map(|r| r.outcome).collect();
    assert_eq!(history, vec![Outcome::Fail, Outcome::Pass]);
}

#[test]
fn generated_jobs_are_regenerated_before_their_results() {
    let mut state = SessionState::new(catalog(vec![local_job("gen")])).unwrap();
    state.update_job_result("gen", output(Outcome::Pass, &local_output(&["child"]))).unwrap();
    state.update_job_result("child", pass()).unwrap();
    state.update_desired_job_list(&ids(&["gen", "child"]));

    let resumed = resume(&save(&state), catalog(vec![local_job("gen")]), &ResumeOptions::default()).unwrap();
    let child = resumed.job_state("child").unwrap();
    assert_eq!(child.outcome(), Outcome::Pass);
    assert_eq!(child.via().map(JobId::as_str), Some("gen"));
    assert_eq!(resumed.desired_job_list(), ids(&["gen", "child"]).as_slice());
}

#[test]
fn results_for_jobs_nothing_generates_are_corruption() {
    let mut state = SessionState::new(catalog(vec![shell_job("a"), shell_job("gone")])).unwrap();
    state.update_job_result("gone", pass()).unwrap();

    let err = resume(&save(&state), catalog(vec![shell_job("a")]), &ResumeOptions::default()).unwrap_err();
    assert!(matches!(&err, ResumeError::Corrupted(msg) if msg.contains("gone")), "{err}");
}

#[test]
fn changed_definition_is_incompatible_unless_ignored() {
    let mut state = SessionState::new(catalog(vec![shell_job("a")])).unwrap();
    state.update_job_result("a", pass()).unwrap();
    let data = save(&state);
    let changed = || catalog(vec![generated_job("a", "gen", "new command")]);

    let err = resume(&data, changed(), &ResumeOptions::default()).unwrap_err();
    assert!(matches!(err, ResumeError::IncompatibleJob(id) if id == "a"));

    let lenient = ResumeOptions { ignore_job_checksums: true, ..ResumeOptions::default() };
    let resumed = resume(&data, changed(), &lenient).unwrap();
    assert_eq!(resumed.job_state("a").unwrap().outcome(), Outcome::Pass);
}

#[yare::parameterized(
    app_id_differs = { Some("other.app"), None, "app_id" },
    title_differs  = { None, Some("other title"), "title" },
)]
fn metadata_mismatch_is_not_resumable(app_id: Option<&str>, title: Option<&str>, expected_field: &str) {
    let mut state = SessionState::new(catalog(vec![shell_job("a")])).unwrap();
    state.metadata_mut().app_id = Some("com.example.app".to_string());
    state.metadata_mut().title = Some("nightly".to_string());

    let options = ResumeOptions {
        expected_app_id: app_id.map(str::to_string),
        expected_title: title.map(str::to_string),
        ignore_job_checksums: false,
    };
    let err = resume(&save(&state), catalog(vec![shell_job("a")]), &options).unwrap_err();
    assert!(matches!(err, ResumeError::MetadataMismatch { field, .. } if field == expected_field));
}

#[test]
fn matching_metadata_is_restored() {
    let mut state = SessionState::new(catalog(vec![shell_job("a")])).unwrap();
    state.metadata_mut().app_id = Some("com.example.app".to_string());
    state.metadata_mut().running_job_name = Some(JobId::new("a"));
    state.metadata_mut().app_blob = Some(vec![0, 159, 255]);

    let options = ResumeOptions { expected_app_id: Some("com.example.app".to_string()), ..ResumeOptions::default() };
    let resumed = resume(&save(&state), catalog(vec![shell_job("a")]), &options).unwrap();
    assert_eq!(resumed.metadata(), state.metadata());
}

#[test]
fn unsupported_version_is_rejected() {
    let state = SessionState::new(catalog(vec![shell_job("a")])).unwrap();
    let mut snapshot = suspend(&state, &FakeClock::new());
    snapshot.version = CURRENT_SNAPSHOT_VERSION + 1;

    let err = resume(&encode(&snapshot).unwrap(), catalog(vec![shell_job("a")]), &ResumeOptions::default())
        .unwrap_err();
    assert!(matches!(err, ResumeError::IncompatibleVersion { found, .. } if found == CURRENT_SNAPSHOT_VERSION + 1));
}

#[test]
fn garbage_is_corrupted() {
    let err = resume(b"garbage", catalog(vec![]), &ResumeOptions::default()).unwrap_err();
    assert!(matches!(err, ResumeError::Corrupted(_)));
}

#[test]
fn desired_job_missing_from_catalog_is_corrupted() {
    let mut state = SessionState::new(catalog(vec![shell_job("a"), shell_job("b")])).unwrap();
    state.update_desired_job_list(&ids(&["a", "b"]));
    let data = save(&state);

    let mut snapshot = crate::snapshot::decode(&data).unwrap();
    snapshot.jobs.clear();
    let err = resume(&encode(&snapshot).unwrap(), catalog(vec![shell_job("a")]), &ResumeOptions::default())
        .unwrap_err();
    assert!(matches!(&err, ResumeError::Corrupted(msg) if msg.contains("desired_job_list")), "{err}");
}

#[test]
fn unreferenced_jobs_are_trimmed() {
    let jobs = || catalog(vec![shell_job("a"), shell_job("ran"), shell_job("unused")]);
    let mut state = SessionState::new(jobs()).unwrap();
    state.update_desired_job_list(&ids(&["a"]));
    state.update_job_result("ran", pass()).unwrap();

    let resumed = resume(&save(&state), jobs(), &ResumeOptions::default()).unwrap();
    let remaining: Vec<&str> = resumed.job_list().map(|job| job.id().as_str()).collect();
    assert_eq!(remaining, vec!["a", "ran"]);
}

#[test]
fn duplicate_catalog_is_a_catalog_error() {
    let state = SessionState::new(catalog(vec![shell_job("a")])).unwrap();
    let duplicated = catalog(vec![shell_job("a"), generated_job("a", "gen", "other")]);
    let err = resume(&save(&state), duplicated, &ResumeOptions::default()).unwrap_err();
    assert!(matches!(err, ResumeError::Catalog(DependencyError::Duplicate { .. })));
}

#[test]
fn resume_from_storage() {
    let dir = tempfile::tempdir().unwrap();
    let storage = SessionStorage::create(dir.path(), "tb-").unwrap();
    let err = resume_storage(&storage, catalog(vec![shell_job("a")]), &ResumeOptions::default()).unwrap_err();
    assert!(matches!(err, ResumeError::Corrupted(_)));

    let mut state = SessionState::new(catalog(vec![shell_job("a")])).unwrap();
    state.update_job_result("a", pass()).unwrap();
    storage.save_checkpoint(&save(&state)).unwrap();

    let resumed = resume_storage(&storage, catalog(vec![shell_job("a")]), &ResumeOptions::default()).unwrap();
    assert_eq!(resumed.job_state("a").unwrap().outcome(), Outcome::Pass);
}

#[test]
fn options_follow_config() {
    let config = SessionConfig {
        app_id: Some("com.example.app".to_string()),
        ignore_job_checksums: true,
        ..SessionConfig::default()
    };
    let options = ResumeOptions::from_config(&config);
    assert_eq!(options.expected_app_id.as_deref(), Some("com.example.app"));
    assert_eq!(options.expected_title, None);
    assert!(options.ignore_job_checksums);
}
