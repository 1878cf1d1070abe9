// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Job results and captured I/O

use serde::{Deserialize, Serialize};

/// Outcome of running a job. `None` means the job has not run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    #[default]
    None,
    Pass,
    Fail,
    Skip,
    NotSupported,
    NotImplemented,
    Undecided,
    Crash,
}

crate::simple_display! {
    Outcome {
        None => "none",
        Pass => "pass",
        Fail => "fail",
        Skip => "skip",
        NotSupported => "not-supported",
        NotImplemented => "not-implemented",
        Undecided => "undecided",
        Crash => "crash",
    }
}

impl Outcome {
    pub const ALL: [Outcome; 8] = [
        Outcome::None,
        Outcome::Pass,
        Outcome::Fail,
        Outcome::Skip,
        Outcome::NotSupported,
        Outcome::NotImplemented,
        Outcome::Undecided,
        Outcome::Crash,
    ];

    pub fn is_none(self) -> bool {
        self == Outcome::None
    }
}

/// Stream a captured chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoStream {
    Stdout,
    Stderr,
}

/// One chunk of captured output, `delay` seconds after the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoLogRecord {
    pub delay: f64,
    pub stream: IoStream,
    pub data: Vec<u8>,
}

impl IoLogRecord {
    pub fn stdout(data: impl Into<Vec<u8>>) -> Self {
        Self { delay: 0.0, stream: IoStream::Stdout, data: data.into() }
    }

    pub fn stderr(data: impl Into<Vec<u8>>) -> Self {
        Self { delay: 0.0, stream: IoStream::Stderr, data: data.into() }
    }
}

/// Structured result of one job execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub io_log: Vec<IoLogRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_duration: Option<f64>,
}

impl JobResult {
    pub fn new(outcome: Outcome) -> Self {
        Self { outcome, ..Self::default() }
    }

    /// Result with a single stdout chunk.
    pub fn with_stdout(outcome: Outcome, stdout: impl Into<String>) -> Self {
        Self { outcome, io_log: vec![IoLogRecord::stdout(stdout.into())], ..Self::default() }
    }

    crate::setters! {
        set { io_log: Vec<IoLogRecord> }
        option {
            return_code: i32,
            comments: String,
            execution_duration: f64,
        }
    }

    /// True for the placeholder result of a job that never ran.
    pub fn is_hollow(&self) -> bool {
        self.outcome.is_none()
            && self.return_code.is_none()
            && self.comments.is_none()
            && self.io_log.is_empty()
            && self.execution_duration.is_none()
    }

    /// Captured stdout, decoded lossily.
    pub fn stdout(&self) -> String {
        let bytes: Vec<u8> = self
            .io_log
            .iter()
            .filter(|record| record.stream == IoStream::Stdout)
            .flat_map(|record| record.data.iter().copied())
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
