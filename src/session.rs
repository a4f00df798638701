//! Session allocation.
//!
//! Every scan writes into a fresh `<base_dir>/<prefix>_<id>` folder. The id
//! is one more than the highest id already present, so numbering only ever
//! grows, even when older sessions have been deleted from the middle.
//!
//! ## Concurrency
//!
//! Allocation assumes a single writer. The folder is created with a
//! non-recursive `create_dir`, so two allocators racing for the same id
//! cannot both succeed; the loser moves on to the next id. That keeps
//! sessions isolated, but running concurrent scans is still unsupported: the
//! rig itself is a single device.

use crate::naming::{parse_session_id, session_folder_name};
use crate::types::Session;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// How many consecutive ids to try when the chosen folder already exists.
const MAX_COLLISION_RETRIES: u32 = 16;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("cannot list session directory {path}: {source}")]
    List { path: PathBuf, source: io::Error },
    #[error("cannot create session folder {path}: {source}")]
    FolderCreation { path: PathBuf, source: io::Error },
    #[error("session ids exhausted under {0}")]
    Exhausted(PathBuf),
}

/// Id the next session under `base_dir` would receive. Creates nothing.
pub fn next_session_id(base_dir: &Path, prefix: &str) -> Result<u32, SessionError> {
    let entries = fs::read_dir(base_dir).map_err(|source| SessionError::List {
        path: base_dir.to_path_buf(),
        source,
    })?;

    let mut highest: Option<u32> = None;
    for entry in entries {
        let entry = entry.map_err(|source| SessionError::List {
            path: base_dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        match parse_session_id(&name, prefix) {
            Some(id) => highest = Some(highest.map_or(id, |h| h.max(id))),
            None if name.starts_with(prefix) => {
                debug!(entry = %name, "ignoring entry without a numeric session suffix");
            }
            None => {}
        }
    }

    match highest {
        None => Ok(0),
        Some(id) => id
            .checked_add(1)
            .ok_or_else(|| SessionError::Exhausted(base_dir.to_path_buf())),
    }
}

/// Allocate and create the folder for a new session.
///
/// A missing `base_dir` is an error: it usually means the capture drive is
/// not mounted, and silently creating it would fill the root filesystem.
pub fn allocate_session(base_dir: &Path, prefix: &str) -> Result<Session, SessionError> {
    let mut id = next_session_id(base_dir, prefix)?;

    for _ in 0..MAX_COLLISION_RETRIES {
        let directory = base_dir.join(session_folder_name(prefix, id));
        match fs::create_dir(&directory) {
            Ok(()) => {
                info!(session = id, path = %directory.display(), "created session folder");
                return Ok(Session { id, directory });
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(session = id, "session folder already exists, trying next id");
                id = id
                    .checked_add(1)
                    .ok_or_else(|| SessionError::Exhausted(base_dir.to_path_buf()))?;
            }
            Err(source) => {
                return Err(SessionError::FolderCreation {
                    path: directory,
                    source,
                });
            }
        }
    }

    Err(SessionError::FolderCreation {
        path: base_dir.join(session_folder_name(prefix, id)),
        source: io::Error::new(
            io::ErrorKind::AlreadyExists,
            "too many concurrent session folders",
        ),
    })
}
