// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Session metadata carried alongside job state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tb_core::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionFlag {
    /// Work remains; cleared once every run-list job has a result.
    Incomplete,
    /// Results have been submitted somewhere.
    Submitted,
    /// The session is still discovering its job list.
    Bootstrapping,
    /// The desired list was picked by hand rather than from a test plan.
    Testplanless,
}

tb_core::simple_display! {
    SessionFlag {
        Incomplete => "incomplete",
        Submitted => "submitted",
        Bootstrapping => "bootstrapping",
        Testplanless => "testplanless",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionMetadata {
    pub title: Option<String>,
    pub flags: BTreeSet<SessionFlag>,
    /// Job that was running when the session was last saved.
    pub running_job_name: Option<JobId>,
    /// Opaque application data.
    pub app_blob: Option<Vec<u8>>,
    pub app_id: Option<String>,
    pub custom_joblist: bool,
    pub rejected_jobs: Vec<JobId>,
    pub last_job_start_time: Option<DateTime<Utc>>,
}

impl SessionMetadata {
    pub fn has_flag(&self, flag: SessionFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn set_flag(&mut self, flag: SessionFlag) {
        self.flags.insert(flag);
    }

    pub fn clear_flag(&mut self, flag: SessionFlag) {
        self.flags.remove(&flag);
    }
}
