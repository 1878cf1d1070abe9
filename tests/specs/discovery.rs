// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Runtime job discovery specs
//!
//! Verify that jobs printed by a local job join the session and run when
//! their generator was selected.

use crate::prelude::*;
use tb_core::{ChannelSink, SessionEvent};

const DISCOVERY_CATALOG: &str = "\
id: probe
plugin: resource
command: list-devices

id: discover
plugin: local
command: generate-tests
";

const GENERATED: &str = "\
id: disk-read
plugin: shell
command: dd
requires: probe.type == 'disk'

id: gpu-render
plugin: shell
command: glxgears
requires: probe.type == 'gpu'
";

fn script() -> Script {
    Script::default()
        .answer("discover", stdout(Outcome::Pass, GENERATED))
        .answer("probe", stdout(Outcome::Pass, "type: disk\n"))
}

#[test]
fn generated_jobs_are_run_or_settled() {
    let mut state = SessionState::new(catalog(DISCOVERY_CATALOG)).unwrap();
    state.update_desired_job_list(&ids(&["discover"]));
    let handle = SessionHandle::new(state);
    let runner = SessionRunner::new(script(), SessionConfig::default());

    let report = runner.run(&handle).unwrap();

    assert_eq!(runner.runner().ran(), vec!["discover", "probe", "disk-read"]);
    assert_eq!(report.not_supported, ids(&["gpu-render"]));
    assert!(report.unfinished.is_empty());
    handle.with(|state| {
        similar_asserts::assert_eq!(id_strs(state.run_list()), vec!["discover", "probe", "disk-read", "gpu-render"]);
        let gpu = state.job_state("gpu-render").unwrap();
        assert_eq!(gpu.outcome(), Outcome::NotSupported);
        assert_eq!(gpu.via().map(JobId::as_str), Some("discover"));
    });
}

#[test]
fn discovery_is_announced() {
    let (sink, events) = ChannelSink::new();
    let mut state = SessionState::new(catalog(DISCOVERY_CATALOG)).unwrap().with_event_sink(Arc::new(sink));
    state.update_job_result("discover", stdout(Outcome::Pass, GENERATED)).unwrap();
    drop(state);

    let added: Vec<String> = events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::JobAdded { job_id, via } => Some(format!("{job_id} via {}", via.map(|v| v.to_string()).unwrap_or_default())),
            _ => None,
        })
        .collect();
    assert_eq!(added, vec!["disk-read via discover", "gpu-render via discover"]);
}

#[test]
fn events_serialize_with_type_tag() {
    let event = SessionEvent::JobAdded { job_id: JobId::new("disk-read"), via: Some(JobId::new("discover")) };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "session:job-added");
    assert_eq!(json["job_id"], "disk-read");
}

#[test]
fn generators_outside_the_selection_do_not_widen_it() {
    let text = format!("{DISCOVERY_CATALOG}\nid: report\nplugin: shell\ncommand: summarize\ndepends: discover\n");
    let mut state = SessionState::new(catalog(&text)).unwrap();
    state.update_desired_job_list(&ids(&["report"]));
    let handle = SessionHandle::new(state);
    let runner = SessionRunner::new(script(), SessionConfig::default());

    runner.run(&handle).unwrap();
    assert_eq!(runner.runner().ran(), vec!["discover", "report"]);
    assert!(handle.with(|state| state.job_state("disk-read").is_some()));
}
