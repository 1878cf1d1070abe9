// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Dependency solver
//!
//! Computes a run list for a set of desired jobs: the desired jobs plus
//! all their transitive direct and resource dependencies, ordered so that
//! no job precedes something it depends on.
//!
//! The walk is a depth-first search from each desired job in turn.
//! Dependencies of a job are visited in catalog order, which keeps the
//! output stable across runs over the same input. `after` edges only
//! order jobs that are already part of the run list.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tb_core::{JobDefinition, JobId};
use thiserror::Error;

/// Kind of edge a missing dependency was reached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    Direct,
    Resource,
}

tb_core::simple_display! {
    DependencyType {
        Direct => "direct",
        Resource => "resource",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("job {job} is not known")]
    Unknown { job: JobId },

    #[error("job {job} has a missing {dep_type} dependency on {missing}")]
    Missing { job: JobId, missing: JobId, dep_type: DependencyType },

    /// `trail` starts and ends on `job`.
    #[error("dependency cycle detected: {}", format_trail(.trail))]
    Cycle { job: JobId, trail: Vec<JobId> },

    #[error("job {job} is defined twice with different content")]
    Duplicate { job: JobId },
}

fn format_trail(trail: &[JobId]) -> String {
    trail.iter().map(JobId::as_str).collect::<Vec<_>>().join(" -> ")
}

impl DependencyError {
    /// Job whose own declaration caused the problem.
    pub fn affected_job(&self) -> &JobId {
        match self {
            DependencyError::Unknown { job }
            | DependencyError::Missing { job, .. }
            | DependencyError::Cycle { job, .. }
            | DependencyError::Duplicate { job } => job,
        }
    }

    /// Job the affected job points at, if the problem has one.
    pub fn affecting_job(&self) -> Option<&JobId> {
        match self {
            DependencyError::Missing { missing, .. } => Some(missing),
            DependencyError::Cycle { trail, .. } => trail.get(1),
            DependencyError::Unknown { .. } | DependencyError::Duplicate { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colour {
    White,
    Gray,
    Black,
}

/// Solver over one catalog snapshot.
#[derive(Debug)]
pub struct DependencySolver {
    jobs: IndexMap<JobId, Arc<JobDefinition>>,
}

impl DependencySolver {
    /// Index the catalog. Identical duplicates collapse into one entry;
    /// differing duplicates are fatal.
    pub fn new(job_list: &[Arc<JobDefinition>]) -> Result<Self, DependencyError> {
        let mut jobs: IndexMap<JobId, Arc<JobDefinition>> = IndexMap::with_capacity(job_list.len());
        for job in job_list {
            match jobs.get(job.id()) {
                Some(existing) if existing.is_identical(job) => continue,
                Some(_) => return Err(DependencyError::Duplicate { job: job.id().clone() }),
                None => {
                    jobs.insert(job.id().clone(), Arc::clone(job));
                }
            }
        }
        Ok(Self { jobs })
    }

    /// Solve `visit_list` against `job_list`.
    pub fn resolve_dependencies(
        job_list: &[Arc<JobDefinition>],
        visit_list: &[JobId],
    ) -> Result<Vec<Arc<JobDefinition>>, DependencyError> {
        Self::new(job_list)?.solve(visit_list)
    }

    pub fn solve(&self, visit_list: &[JobId]) -> Result<Vec<Arc<JobDefinition>>, DependencyError> {
        let roots = visit_list
            .iter()
            .map(|id| self.jobs.get_index_of(id).ok_or_else(|| DependencyError::Unknown { job: id.clone() }))
            .collect::<Result<Vec<_>, _>>()?;

        let mut closure = Closure {
            solver: self,
            colour: vec![Colour::White; self.jobs.len()],
            trail: Vec::new(),
            hard: vec![Vec::new(); self.jobs.len()],
            order: Vec::new(),
        };
        for &root in &roots {
            if closure.colour[root] == Colour::White {
                closure.visit(root)?;
            }
        }

        // Transitive hard dependencies, filled bottom-up along the
        // post-order of the first walk.
        let mut reach: Vec<HashSet<usize>> = vec![HashSet::new(); self.jobs.len()];
        for &idx in &closure.order {
            let mut set = HashSet::new();
            for &dep in &closure.hard[idx] {
                set.insert(dep);
                set.extend(reach[dep].iter().copied());
            }
            reach[idx] = set;
        }

        let in_closure: Vec<bool> = closure.colour.iter().map(|c| *c == Colour::Black).collect();
        let mut ordering = Ordering {
            solver: self,
            hard: &closure.hard,
            reach: &reach,
            in_closure: &in_closure,
            colour: vec![Colour::White; self.jobs.len()],
            stack: Vec::new(),
            order: Vec::with_capacity(closure.order.len()),
        };
        for &root in &roots {
            if ordering.colour[root] == Colour::White {
                ordering.visit(root);
            }
        }

        tracing::debug!(
            desired = visit_list.len(),
            run_list = ordering.order.len(),
            "solved dependencies"
        );
        Ok(ordering.order.into_iter().filter_map(|idx| self.job_at(idx)).collect())
    }

    fn job_at(&self, idx: usize) -> Option<Arc<JobDefinition>> {
        self.jobs.get_index(idx).map(|(_, job)| Arc::clone(job))
    }
}

/// First walk: hard edges only. Finds missing jobs and cycles and records
/// the hard adjacency of every reachable job.
struct Closure<'a> {
    solver: &'a DependencySolver,
    colour: Vec<Colour>,
    trail: Vec<usize>,
    hard: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl Closure<'_> {
    fn visit(&mut self, idx: usize) -> Result<(), DependencyError> {
        let solver = self.solver;
        let Some((id, job)) = solver.jobs.get_index(idx) else {
            return Ok(());
        };
        tracing::trace!(job_id = %id, "visiting");
        self.colour[idx] = Colour::Gray;
        self.trail.push(idx);

        let resource_deps = job.resource_dependencies();
        let edges = job
            .direct_dependencies()
            .iter()
            .map(|dep| (dep, DependencyType::Direct))
            .chain(
                resource_deps
                    .iter()
                    .filter(|dep| !job.direct_dependencies().contains(*dep))
                    .map(|dep| (dep, DependencyType::Resource)),
            );
        let mut deps = Vec::new();
        for (dep, dep_type) in edges {
            let target = solver.jobs.get_index_of(dep).ok_or_else(|| DependencyError::Missing {
                job: id.clone(),
                missing: dep.clone(),
                dep_type,
            })?;
            deps.push(target);
        }
        deps.sort_unstable();
        deps.dedup();

        for &dep in &deps {
            match self.colour[dep] {
                Colour::White => self.visit(dep)?,
                Colour::Gray => return Err(self.cycle(dep, id)),
                Colour::Black => {}
            }
        }

        self.hard[idx] = deps;
        self.trail.pop();
        self.colour[idx] = Colour::Black;
        self.order.push(idx);
        Ok(())
    }

    fn cycle(&self, back_to: usize, current: &JobId) -> DependencyError {
        let start = self.trail.iter().position(|&i| i == back_to).unwrap_or(0);
        let trail: Vec<JobId> = self.trail[start..]
            .iter()
            .chain(std::iter::once(&back_to))
            .filter_map(|&i| self.solver.jobs.get_index(i).map(|(id, _)| id.clone()))
            .collect();
        let job = trail.first().unwrap_or(current).clone();
        DependencyError::Cycle { job, trail }
    }
}

/// Second walk: hard edges plus admissible `after` edges, producing the
/// final order.
struct Ordering<'a> {
    solver: &'a DependencySolver,
    hard: &'a [Vec<usize>],
    reach: &'a [HashSet<usize>],
    in_closure: &'a [bool],
    colour: Vec<Colour>,
    stack: Vec<usize>,
    order: Vec<usize>,
}

impl Ordering<'_> {
    fn visit(&mut self, idx: usize) {
        let solver = self.solver;
        self.colour[idx] = Colour::Gray;
        self.stack.push(idx);

        let mut edges: Vec<(usize, bool)> = self.hard[idx].iter().map(|&dep| (dep, false)).collect();
        if let Some((_, job)) = solver.jobs.get_index(idx) {
            for dep in job.after_dependencies() {
                match solver.jobs.get_index_of(dep) {
                    Some(target) if self.in_closure[target] && !self.hard[idx].contains(&target) => {
                        edges.push((target, true));
                    }
                    _ => {}
                }
            }
        }
        edges.sort_unstable();

        for (target, soft) in edges {
            match self.colour[target] {
                Colour::Black => {}
                // Only an `after` edge can reach the stack
                Colour::Gray => self.skip_edge(idx, target),
                Colour::White if soft && self.closes_cycle(target) => self.skip_edge(idx, target),
                Colour::White => self.visit(target),
            }
        }

        self.stack.pop();
        self.colour[idx] = Colour::Black;
        self.order.push(idx);
    }

    fn skip_edge(&self, idx: usize, target: usize) {
        let name = |i: usize| self.solver.jobs.get_index(i).map(|(id, _)| id.as_str()).unwrap_or("?");
        tracing::debug!(
            job_id = name(idx),
            after = name(target),
            "ignoring ordering edge that would close a cycle"
        );
    }

    /// Would entering `target` lead back to a job on the stack through
    /// hard edges?
    fn closes_cycle(&self, target: usize) -> bool {
        self.stack.iter().any(|on_stack| self.reach[target].contains(on_stack))
    }
}

#[cfg(test)]
#[path = "solver_tests.rs"]
mod tests;
