// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

// Factories build from literals; a bad literal is a bug in the calling test.
#![allow(clippy::expect_used)]

use crate::job::{JobDefinition, JobOrigin, PluginKind};
use crate::result::{JobResult, Outcome};
use crate::JobId;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for job catalogs.
pub mod strategies {
    use super::*;
    use proptest::prelude::*;
    use proptest::sample::Index;

    /// Catalog of `job-N` definitions where each job may only reference
    /// jobs with a lower index, so the graph is acyclic. References to a
    /// resource job go through `requires`, all others through `depends`.
    pub fn arb_acyclic_catalog() -> impl Strategy<Value = Vec<JobDefinition>> {
        (1usize..12)
            .prop_flat_map(|n| {
                (
                    prop::collection::vec(prop::collection::vec(any::<Index>(), 0..3), n),
                    prop::collection::vec(any::<bool>(), n),
                )
            })
            .prop_map(|(picks, resource_flags)| catalog_from_picks(&picks, &resource_flags))
    }

    /// Acyclic catalog plus a non-empty desired subset of its ids.
    pub fn arb_catalog_and_desired() -> impl Strategy<Value = (Vec<JobDefinition>, Vec<JobId>)> {
        arb_acyclic_catalog().prop_flat_map(|catalog| {
            let n = catalog.len();
            let ids: Vec<JobId> = catalog.iter().map(|job| job.id().clone()).collect();
            (Just(catalog), prop::sample::subsequence(ids, 1..=n))
        })
    }

    fn catalog_from_picks(picks: &[Vec<Index>], resource_flags: &[bool]) -> Vec<JobDefinition> {
        let name = |i: usize| format!("job-{i}");
        (0..picks.len())
            .map(|i| {
                let plugin = if resource_flags[i] { PluginKind::Resource } else { PluginKind::Shell };
                let mut depends = Vec::new();
                let mut requires = Vec::new();
                if i > 0 {
                    for pick in &picks[i] {
                        let j = pick.index(i);
                        if resource_flags[j] {
                            requires.push(format!("{}.ok == 'yes'", name(j)));
                        } else {
                            depends.push(name(j));
                        }
                    }
                }
                let mut builder = JobDefinition::builder(name(i), plugin);
                if !depends.is_empty() {
                    builder = builder.depends(depends.join(" "));
                }
                if !requires.is_empty() {
                    builder = builder.requires(requires.join("\n"));
                }
                builder.build().expect("generated definition")
            })
            .collect()
    }
}

// ── Job factory functions ───────────────────────────────────────────────

pub fn shell_job(id: &str) -> JobDefinition {
    JobDefinition::builder(id, PluginKind::Shell).command("true").build().expect("shell job")
}

pub fn depending_job(id: &str, depends: &str) -> JobDefinition {
    JobDefinition::builder(id, PluginKind::Shell)
        .command("true")
        .depends(depends)
        .build()
        .expect("depending job")
}

pub fn requiring_job(id: &str, requires: &str) -> JobDefinition {
    JobDefinition::builder(id, PluginKind::Shell)
        .command("true")
        .requires(requires)
        .build()
        .expect("requiring job")
}

pub fn ordered_job(id: &str, after: &str) -> JobDefinition {
    JobDefinition::builder(id, PluginKind::Shell)
        .command("true")
        .after(after)
        .build()
        .expect("ordered job")
}

pub fn resource_job(id: &str) -> JobDefinition {
    JobDefinition::builder(id, PluginKind::Resource).command("probe").build().expect("resource job")
}

pub fn local_job(id: &str) -> JobDefinition {
    JobDefinition::builder(id, PluginKind::Local).command("generate").build().expect("local job")
}

pub fn manual_job(id: &str, estimate: Option<&str>) -> JobDefinition {
    let mut builder = JobDefinition::builder(id, PluginKind::Manual);
    if let Some(estimate) = estimate {
        builder = builder.estimated_duration(estimate);
    }
    builder.build().expect("manual job")
}

/// Definition as a local job named `via` would generate it.
pub fn generated_job(id: &str, via: &str, command: &str) -> JobDefinition {
    JobDefinition::builder(id, PluginKind::Shell)
        .command(command)
        .origin(JobOrigin::Generated { via: JobId::new(via), line_start: 1, line_end: 3 })
        .build()
        .expect("generated job")
}

// ── Result factory functions ────────────────────────────────────────────

pub fn pass() -> JobResult {
    JobResult::new(Outcome::Pass)
}

pub fn fail() -> JobResult {
    JobResult::new(Outcome::Fail)
}

pub fn output(outcome: Outcome, stdout: &str) -> JobResult {
    JobResult::with_stdout(outcome, stdout)
}

/// `id: …` / `plugin: shell` records in local job output form.
pub fn local_output(ids: &[&str]) -> String {
    ids.iter()
        .map(|id| format!("id: {id}\nplugin: shell\ncommand: run {id}\n"))
        .collect::<Vec<_>>()
        .join("\n")
}
