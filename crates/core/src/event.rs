// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Session change notifications
//!
//! Every mutating session operation emits one or more [`SessionEvent`]s to
//! the session's [`EventSink`]. Sinks must not call back into the session.

use crate::id::JobId;
use crate::result::Outcome;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;

/// Serializes with `{"type": "session:name", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    #[serde(rename = "session:job-state-map-changed")]
    JobStateMapChanged,

    #[serde(rename = "session:job-result-changed")]
    JobResultChanged { job_id: JobId, outcome: Outcome },

    #[serde(rename = "session:job-added")]
    JobAdded {
        job_id: JobId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        via: Option<JobId>,
    },

    #[serde(rename = "session:job-removed")]
    JobRemoved { job_id: JobId },

    #[serde(rename = "session:desired-list-changed")]
    DesiredListChanged { desired: Vec<JobId>, run_list: Vec<JobId> },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::JobStateMapChanged => "session:job-state-map-changed",
            SessionEvent::JobResultChanged { .. } => "session:job-result-changed",
            SessionEvent::JobAdded { .. } => "session:job-added",
            SessionEvent::JobRemoved { .. } => "session:job-removed",
            SessionEvent::DesiredListChanged { .. } => "session:desired-list-changed",
        }
    }

    /// Job the event is about, if any.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            SessionEvent::JobResultChanged { job_id, .. }
            | SessionEvent::JobAdded { job_id, .. }
            | SessionEvent::JobRemoved { job_id } => Some(job_id),
            SessionEvent::JobStateMapChanged | SessionEvent::DesiredListChanged { .. } => None,
        }
    }
}

/// Receiver of session events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SessionEvent);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &SessionEvent) {}
}

/// Forwards events over a channel to another thread.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Mutex<mpsc::Sender<SessionEvent>>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: Mutex::new(tx) }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &SessionEvent) {
        if self.tx.lock().send(event.clone()).is_err() {
            tracing::debug!(event = event.name(), "event receiver dropped");
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<SessionEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &SessionEvent) {
        self.events.lock().push(event.clone());
    }
}

impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    fn emit(&self, event: &SessionEvent) {
        (**self).emit(event);
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
