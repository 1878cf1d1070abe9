// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tb-engine: dependency solving, readiness and the session aggregate.

pub mod controller;
pub mod handle;
pub mod metadata;
pub mod runner;
pub mod session;
pub mod solver;

pub use controller::{ResultPolicy, SessionController};
pub use handle::SessionHandle;
pub use metadata::{SessionFlag, SessionMetadata};
pub use runner::{JobRunner, RunReport, SessionRunner};
pub use session::{DurationEstimate, SessionError, SessionState};
pub use solver::{DependencyError, DependencySolver, DependencyType};
