// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tb-core: job definitions, results, resources and readiness types shared
//! by the testbench session engine.

pub mod macros;

pub mod clock;
pub mod config;
pub mod event;
pub mod expression;
pub mod id;
pub mod inhibitor;
pub mod job;
pub mod job_state;
pub mod resource;
pub mod result;
pub mod rfc822;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, SessionConfig, DEFAULT_MANUAL_OVERHEAD_SECS};
pub use event::{ChannelSink, EventSink, NullSink, RecordingSink, SessionEvent};
pub use expression::{
    Evaluation, ExpressionError, RequirementEvaluator, RequirementProgram, ResourceExpression,
    SimpleEvaluator,
};
pub use id::{qualify, JobId, SessionId};
pub use inhibitor::{InhibitionCause, ReadinessInhibitor};
pub use job::{JobDefinition, JobDefinitionBuilder, JobDefinitionError, JobOrigin, PluginKind};
pub use job_state::JobState;
pub use resource::{Resource, ResourceMap};
pub use result::{IoLogRecord, IoStream, JobResult, Outcome};
pub use rfc822::{parse_records, ParsedRecords, Record, RecordOrigin, Rfc822Error};
