// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! On-disk session storage
//!
//! Each session lives in `<repository>/<id>.session/`. A checkpoint is
//! written to `session.next`, synced, then renamed over `session`. The
//! `session.next` file is created exclusively and doubles as a write lock.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tb_core::SessionId;
use thiserror::Error;

const SESSION_FILE: &str = "session";
const SESSION_FILE_NEXT: &str = "session.next";
const SESSION_DIR_SUFFIX: &str = ".session";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session storage {0} is locked by another writer")]
    Locked(PathBuf),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io { path: path.to_path_buf(), source }
}

/// Storage of one session's checkpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStorage {
    id: SessionId,
    location: PathBuf,
}

impl SessionStorage {
    /// Create a fresh storage directory under `repository` with a new
    /// `{prefix}{nanoid}` id.
    pub fn create(repository: &Path, prefix: &str) -> Result<Self, StorageError> {
        let id = SessionId::with_prefix(prefix);
        let location = repository.join(format!("{id}{SESSION_DIR_SUFFIX}"));
        fs::create_dir_all(&location).map_err(io_error(&location))?;
        tracing::debug!(session_id = %id, location = %location.display(), "created session storage");
        Ok(Self { id, location })
    }

    /// Storage for an existing session directory.
    pub fn open(location: impl Into<PathBuf>) -> Self {
        let location = location.into();
        let name = location.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let id = SessionId::new(name.strip_suffix(SESSION_DIR_SUFFIX).unwrap_or(&name));
        Self { id, location }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn session_file(&self) -> PathBuf {
        self.location.join(SESSION_FILE)
    }

    /// Data of the last checkpoint. A session that was never saved reads
    /// as empty.
    pub fn load_checkpoint(&self) -> Result<Vec<u8>, StorageError> {
        let path = self.session_file();
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(io_error(&path)(e)),
        }
    }

    /// Atomically replace the checkpoint with `data`.
    pub fn save_checkpoint(&self, data: &[u8]) -> Result<(), StorageError> {
        let next = self.location.join(SESSION_FILE_NEXT);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&next) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(StorageError::Locked(next)),
            Err(e) => return Err(io_error(&next)(e)),
        };

        let written = file.write_all(data).and_then(|()| file.sync_all());
        drop(file);
        if let Err(e) = written {
            self.discard_next(&next);
            return Err(io_error(&next)(e));
        }

        let session = self.session_file();
        if let Err(e) = fs::rename(&next, &session) {
            self.discard_next(&next);
            return Err(io_error(&session)(e));
        }

        // The rename is only durable once the directory is synced
        if let Err(e) = File::open(&self.location).and_then(|dir| dir.sync_all()) {
            tracing::warn!(location = %self.location.display(), error = %e, "failed to sync session directory");
        }
        tracing::debug!(session_id = %self.id, bytes = data.len(), "saved checkpoint");
        Ok(())
    }

    /// Remove a stale `session.next` left by an interrupted writer.
    pub fn break_lock(&self) -> Result<(), StorageError> {
        let next = self.location.join(SESSION_FILE_NEXT);
        match fs::remove_file(&next) {
            Ok(()) => {
                tracing::warn!(session_id = %self.id, "broke session storage lock");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&next)(e)),
        }
    }

    pub fn remove(self) -> Result<(), StorageError> {
        fs::remove_dir_all(&self.location).map_err(io_error(&self.location))
    }

    fn discard_next(&self, next: &Path) {
        if let Err(e) = fs::remove_file(next) {
            tracing::warn!(path = %next.display(), error = %e, "failed to remove partial checkpoint");
        }
    }
}

/// Directory holding all session storages.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    location: PathBuf,
}

impl SessionRepository {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self { location: location.into() }
    }

    /// Repository at `<state_dir>/sessions`.
    pub fn in_state_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join("sessions"))
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn create_storage(&self, prefix: &str) -> Result<SessionStorage, StorageError> {
        SessionStorage::create(&self.location, prefix)
    }

    /// Stored sessions, most recently modified first. A missing repository
    /// directory holds no sessions.
    pub fn get_storage_list(&self) -> Result<Vec<SessionStorage>, StorageError> {
        let entries = match fs::read_dir(&self.location) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.location)(e)),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_error(&self.location))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !name.ends_with(SESSION_DIR_SUFFIX) {
                continue;
            }
            // file_type does not follow symlinks
            let file_type = entry.file_type().map_err(io_error(&entry.path()))?;
            if !file_type.is_dir() {
                continue;
            }
            let modified = entry.metadata().and_then(|m| m.modified()).map_err(io_error(&entry.path()))?;
            found.push((modified, SessionStorage::open(entry.path())));
        }
        found.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(found.into_iter().map(|(_, storage)| storage).collect())
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
