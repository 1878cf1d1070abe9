// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Readiness inhibitors: typed reasons a job cannot start.

use crate::id::JobId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InhibitionCause {
    /// Not on the run list
    Undesired,
    PendingDep,
    FailedDep,
    PendingResource,
    FailedResource,
}

crate::simple_display! {
    InhibitionCause {
        Undesired => "UNDESIRED",
        PendingDep => "PENDING_DEP",
        FailedDep => "FAILED_DEP",
        PendingResource => "PENDING_RESOURCE",
        FailedResource => "FAILED_RESOURCE",
    }
}

impl InhibitionCause {
    /// Causes that can never clear without a result changing to PASS.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::FailedDep | Self::FailedResource)
    }
}

/// One reason a job cannot start.
///
/// Only the resource causes carry an expression and `Undesired` carries
/// nothing; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadinessInhibitor {
    cause: InhibitionCause,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    related_job: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    related_expression: Option<String>,
}

impl ReadinessInhibitor {
    pub fn undesired() -> Self {
        Self { cause: InhibitionCause::Undesired, related_job: None, related_expression: None }
    }

    pub fn pending_dep(job: JobId) -> Self {
        Self { cause: InhibitionCause::PendingDep, related_job: Some(job), related_expression: None }
    }

    pub fn failed_dep(job: JobId) -> Self {
        Self { cause: InhibitionCause::FailedDep, related_job: Some(job), related_expression: None }
    }

    pub fn pending_resource(job: JobId, expression: impl Into<String>) -> Self {
        Self {
            cause: InhibitionCause::PendingResource,
            related_job: Some(job),
            related_expression: Some(expression.into()),
        }
    }

    pub fn failed_resource(job: JobId, expression: impl Into<String>) -> Self {
        Self {
            cause: InhibitionCause::FailedResource,
            related_job: Some(job),
            related_expression: Some(expression.into()),
        }
    }

    pub fn cause(&self) -> InhibitionCause {
        self.cause
    }

    pub fn related_job(&self) -> Option<&JobId> {
        self.related_job.as_ref()
    }

    pub fn related_expression(&self) -> Option<&str> {
        self.related_expression.as_deref()
    }
}

impl fmt::Display for ReadinessInhibitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let job = self.related_job.as_ref().map(JobId::as_str).unwrap_or("?");
        let expression = self.related_expression.as_deref().unwrap_or("?");
        match self.cause {
            InhibitionCause::Undesired => f.write_str("undesired"),
            InhibitionCause::PendingDep => write!(f, "required dependency {job:?} did not run yet"),
            InhibitionCause::FailedDep => write!(f, "required dependency {job:?} has failed"),
            InhibitionCause::PendingResource => write!(
                f,
                "resource expression {expression:?} could not be evaluated because the resource it depends on did not run yet"
            ),
            InhibitionCause::FailedResource => {
                write!(f, "resource expression {expression:?} evaluates to false")
            }
        }
    }
}

#[cfg(test)]
#[path = "inhibitor_tests.rs"]
mod tests;
