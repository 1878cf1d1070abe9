// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tb-storage: session snapshots, resume and on-disk checkpoints.

pub mod env;
mod resume;
mod snapshot;
mod storage;

pub use resume::{resume, resume_storage, ResumeError, ResumeOptions};
pub use snapshot::{
    decode, encode, peek, suspend, Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION,
};
pub use storage::{SessionRepository, SessionStorage, StorageError};
