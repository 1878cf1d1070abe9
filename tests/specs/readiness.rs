// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Readiness specs
//!
//! Verify how results of dependencies and resource jobs decide which jobs
//! can start.

use crate::prelude::*;

const REQUIREMENT_CATALOG: &str = "\
id: A
plugin: shell
command: true
requires: R.ok == 'yes'

id: R
plugin: resource
command: probe
";

const CHAIN_CATALOG: &str = "\
id: X
plugin: shell
command: run-x
depends: Y

id: Y
plugin: shell
command: run-y
";

fn session(text: &str, desired: &[&str]) -> SessionState {
    let mut state = SessionState::new(catalog(text)).unwrap();
    let problems = state.update_desired_job_list(&ids(desired));
    assert!(problems.is_empty(), "unexpected problems: {problems:?}");
    state
}

fn causes(state: &SessionState, id: &str) -> Vec<(InhibitionCause, String)> {
    state
        .job_state(id)
        .unwrap()
        .readiness_inhibitors()
        .iter()
        .map(|i| (i.cause(), i.related_job().map(JobId::to_string).unwrap_or_default()))
        .collect()
}

#[test]
fn resource_job_runs_before_the_job_requiring_it() {
    let state = session(REQUIREMENT_CATALOG, &["A"]);
    similar_asserts::assert_eq!(id_strs(state.run_list()), vec!["R", "A"]);
    assert_eq!(causes(&state, "A"), vec![(InhibitionCause::PendingResource, "R".to_string())]);
    assert!(state.job_state("R").unwrap().can_start());
}

#[test]
fn matching_resource_makes_job_startable() {
    let mut state = session(REQUIREMENT_CATALOG, &["A"]);
    state.update_job_result("R", stdout(Outcome::Pass, "ok: yes\n")).unwrap();
    assert!(state.job_state("A").unwrap().can_start());
    assert_eq!(state.job_state("A").unwrap().readiness_description(), "job can be started");
}

#[test]
fn mismatching_resource_fails_requirement() {
    let mut state = session(REQUIREMENT_CATALOG, &["A"]);
    state.update_job_result("R", stdout(Outcome::Pass, "ok: no\n")).unwrap();
    assert_eq!(causes(&state, "A"), vec![(InhibitionCause::FailedResource, "R".to_string())]);
    assert_eq!(
        state.job_state("A").unwrap().readiness_description(),
        "job cannot be started: resource expression \"R.ok == 'yes'\" evaluates to false"
    );
}

#[test]
fn any_matching_record_satisfies_requirement() {
    let mut state = session(REQUIREMENT_CATALOG, &["A"]);
    state.update_job_result("R", stdout(Outcome::Pass, "ok: no\n\nok: yes\n")).unwrap();
    assert!(state.job_state("A").unwrap().can_start());
}

#[test]
fn dependency_outcome_propagates() {
    let mut state = session(CHAIN_CATALOG, &["X"]);
    assert_eq!(causes(&state, "X"), vec![(InhibitionCause::PendingDep, "Y".to_string())]);

    state.update_job_result("Y", JobResult::new(Outcome::Fail)).unwrap();
    assert_eq!(causes(&state, "X"), vec![(InhibitionCause::FailedDep, "Y".to_string())]);

    state.update_job_result("Y", JobResult::new(Outcome::Pass)).unwrap();
    assert!(causes(&state, "X").is_empty());
}

#[test]
fn jobs_outside_the_selection_stay_undesired() {
    let state = session(CHAIN_CATALOG, &["Y"]);
    assert_eq!(causes(&state, "X"), vec![(InhibitionCause::Undesired, String::new())]);
}

#[test]
fn broken_jobs_are_reported_and_dropped() {
    let text = format!("{CHAIN_CATALOG}\nid: broken\nplugin: shell\ncommand: x\ndepends: nowhere\n");
    let mut state = SessionState::new(catalog(&text)).unwrap();
    let problems = state.update_desired_job_list(&ids(&["broken", "X"]));

    let messages: Vec<String> = problems.iter().map(ToString::to_string).collect();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("nowhere"), "{}", messages[0]);
    similar_asserts::assert_eq!(id_strs(state.run_list()), vec!["Y", "X"]);
}
