// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

use super::*;
use crate::rfc822::parse_records;

fn ids(set: &BTreeSet<JobId>) -> Vec<&str> {
    set.iter().map(JobId::as_str).collect()
}

#[test]
fn builder_qualifies_id_and_dependencies() {
    let job = JobDefinition::builder("disk/read", PluginKind::Shell)
        .namespace("com.example")
        .depends("disk/detect, other::setup\tusb/detect")
        .after("warmup")
        .requires("block_device.state == 'active'")
        .build()
        .unwrap();

    assert_eq!(job.id(), "com.example::disk/read");
    assert_eq!(job.partial_id(), "disk/read");
    assert_eq!(job.namespace(), Some("com.example"));
    assert_eq!(
        ids(job.direct_dependencies()),
        vec!["com.example::disk/detect", "com.example::usb/detect", "other::setup"]
    );
    assert_eq!(ids(job.after_dependencies()), vec!["com.example::warmup"]);
    assert_eq!(ids(&job.resource_dependencies()), vec!["com.example::block_device"]);
}

#[test]
fn summary_falls_back_to_partial_id() {
    let bare = JobDefinition::builder("a", PluginKind::Shell).build().unwrap();
    assert_eq!(bare.summary(), "a");
    let named = JobDefinition::builder("a", PluginKind::Shell).summary("Check A").build().unwrap();
    assert_eq!(named.summary(), "Check A");
}

#[test]
fn checksum_ignores_origin_but_not_content() {
    let a = JobDefinition::builder("a", PluginKind::Shell).command("true").build().unwrap();
    let b = JobDefinition::builder("a", PluginKind::Shell)
        .command("true")
        .origin(JobOrigin::Generated { via: JobId::new("gen"), line_start: 1, line_end: 3 })
        .build()
        .unwrap();
    let c = JobDefinition::builder("a", PluginKind::Shell).command("false").build().unwrap();

    assert_eq!(a.checksum(), b.checksum());
    assert!(a.is_identical(&b));
    assert_ne!(a.checksum(), c.checksum());
    assert!(!a.is_identical(&c));
    assert_eq!(a.checksum().len(), 64);
}

#[test]
fn from_record_strips_translation_prefix() {
    let parsed = parse_records("id: probe\n_summary: Probe it\nplugin: resource\ncommand: echo\n", "units");
    let record = &parsed.records[0];
    let job = JobDefinition::from_record(record, Some("ns"), JobOrigin::File(record.origin.clone())).unwrap();
    assert_eq!(job.id(), "ns::probe");
    assert_eq!(job.summary(), "Probe it");
    assert_eq!(job.plugin(), PluginKind::Resource);
    assert!(matches!(job.origin(), JobOrigin::File(o) if o.line_start == 1));
}

#[yare::parameterized(
    no_id       = { "plugin: shell\n" },
    no_plugin   = { "id: x\n" },
    bad_plugin  = { "id: x\nplugin: teleport\n" },
    bad_requires = { "id: x\nplugin: shell\nrequires: r.a ==\n" },
    bad_duration = { "id: x\nplugin: shell\nestimated_duration: soon\n" },
)]
fn invalid_records(text: &str) {
    let parsed = parse_records(text, "t");
    assert!(JobDefinition::from_record(&parsed.records[0], None, JobOrigin::Unknown).is_err());
}

#[yare::parameterized(
    plain_seconds = { "90", Some(90.0) },
    fractional    = { "1.5", Some(1.5) },
    hours_minutes = { "1h 30m", Some(5400.0) },
    colon_form    = { "2m:10s", Some(130.0) },
    seconds_only  = { "45s", Some(45.0) },
    wrong_order   = { "10s 1m", None },
    repeated_unit = { "1m 2m", None },
    garbage       = { "soon", None },
    negative      = { "-5", None },
)]
fn durations(text: &str, expected: Option<f64>) {
    assert_eq!(parse_duration(text), expected);
}

#[yare::parameterized(
    shell      = { PluginKind::Shell, true },
    resource   = { PluginKind::Resource, true },
    attachment = { PluginKind::Attachment, true },
    local      = { PluginKind::Local, false },
    manual     = { PluginKind::Manual, false },
    verify     = { PluginKind::UserInteractVerify, false },
)]
fn automation_split(plugin: PluginKind, automated: bool) {
    assert_eq!(plugin.is_automated(), automated);
    assert_eq!(plugin.to_string().parse::<PluginKind>(), Ok(plugin));
}
