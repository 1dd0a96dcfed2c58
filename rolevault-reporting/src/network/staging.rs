// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The staging directory shared by worker processes.
//!
//! Each test writes its batch of records to a file it alone owns. Nothing
//! ever opens another writer's file for writing, so no locking is needed as
//! long as file names never collide. The aggregator is the only reader and
//! runs after all workers have finished.

use super::record::{HttpRequestRecord, TestIdentity};
use crate::{
    errors::{CleanupError, StagingReadError, StagingWriteError},
    helpers::sanitize_for_file_name,
};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use rand::{RngExt, distr::Alphanumeric};
use std::{fs, io::Write};
use tracing::debug;

/// Extension of staging files.
pub const STAGING_FILE_EXTENSION: &str = "json";

/// Maximum number of title characters in a staging file name.
pub const MAX_TITLE_LEN: usize = 100;

/// Number of random characters appended to each staging file name.
const NONCE_LEN: usize = 6;

/// A staging file written by [`StagingDir::write_batch`].
#[derive(Clone, Debug)]
pub struct StagedBatch {
    /// Where the batch was written.
    pub path: Utf8PathBuf,

    /// The serialized batch, suitable for attaching to the test result.
    pub json: String,
}

/// Counts of what [`StagingDir::clean_up`] removed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Entries removed from the directory.
    pub files_removed: usize,

    /// Whether the directory existed and was removed.
    pub dir_removed: bool,
}

/// Handle to the staging directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagingDir {
    dir: Utf8PathBuf,
}

impl StagingDir {
    /// Creates a handle. The directory is not created until a batch is written.
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The staging directory path.
    pub fn path(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns true if the directory exists.
    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// Serializes `records` and writes them to a new staging file for the test.
    pub fn write_batch(
        &self,
        identity: &TestIdentity,
        records: &[HttpRequestRecord],
    ) -> Result<StagedBatch, StagingWriteError> {
        self.write_batch_at(identity, records, Utc::now())
    }

    pub(crate) fn write_batch_at(
        &self,
        identity: &TestIdentity,
        records: &[HttpRequestRecord],
        now: DateTime<Utc>,
    ) -> Result<StagedBatch, StagingWriteError> {
        fs::create_dir_all(&self.dir).map_err(|error| StagingWriteError::CreateDir {
            dir: self.dir.clone(),
            error,
        })?;

        let json = serde_json::to_string_pretty(records).map_err(StagingWriteError::Serialize)?;

        let file_name = staging_file_name(
            identity.worker_index,
            &identity.test_title,
            now.timestamp_millis(),
            &random_nonce(),
        );
        let path = self.dir.join(file_name);

        // DisallowOverwrite turns a name collision into an error instead of
        // silently replacing another test's batch.
        AtomicFile::new(&path, OverwriteBehavior::DisallowOverwrite)
            .write(|file| file.write_all(json.as_bytes()))
            .map_err(|error| StagingWriteError::Write {
                path: path.clone(),
                error: match error {
                    atomicwrites::Error::Internal(error) | atomicwrites::Error::User(error) => {
                        error
                    }
                },
            })?;

        debug!("wrote {} network records to `{path}`", records.len());
        Ok(StagedBatch { path, json })
    }

    /// Lists staging files, sorted by name.
    ///
    /// Returns `Ok(None)` if the directory does not exist.
    pub fn list_batches(&self) -> Result<Option<Vec<Utf8PathBuf>>, StagingReadError> {
        let entries = match self.dir.read_dir_utf8() {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(StagingReadError::ReadDir {
                    dir: self.dir.clone(),
                    error,
                });
            }
        };

        let mut batches = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| StagingReadError::ReadDir {
                dir: self.dir.clone(),
                error,
            })?;
            let path = entry.path();
            if path.extension() == Some(STAGING_FILE_EXTENSION) && path.is_file() {
                batches.push(path.to_owned());
            }
        }
        batches.sort_unstable();
        Ok(Some(batches))
    }

    /// Reads and parses one staging file.
    pub fn read_batch(path: &Utf8Path) -> Result<Vec<HttpRequestRecord>, StagingReadError> {
        let contents = fs::read_to_string(path).map_err(|error| StagingReadError::ReadFile {
            path: path.to_owned(),
            error,
        })?;
        serde_json::from_str(&contents).map_err(|error| StagingReadError::Parse {
            path: path.to_owned(),
            error,
        })
    }

    /// Removes every file in the staging directory, then the directory itself.
    ///
    /// Does nothing if the directory does not exist.
    pub fn clean_up(&self) -> Result<CleanupSummary, CleanupError> {
        let entries = match self.dir.read_dir_utf8() {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CleanupSummary::default());
            }
            Err(error) => {
                return Err(CleanupError::ReadDir {
                    dir: self.dir.clone(),
                    error,
                });
            }
        };

        let mut files_removed = 0;
        for entry in entries {
            let entry = entry.map_err(|error| CleanupError::ReadDir {
                dir: self.dir.clone(),
                error,
            })?;
            let path = entry.path();
            let res = if path.is_dir() {
                fs::remove_dir_all(path)
            } else {
                fs::remove_file(path)
            };
            match res {
                Ok(()) => files_removed += 1,
                // Already removed by a concurrent cleanup.
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => {
                    return Err(CleanupError::RemoveFile {
                        path: path.to_owned(),
                        error,
                    });
                }
            }
        }

        let dir_removed = match fs::remove_dir(&self.dir) {
            Ok(()) => true,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => false,
            Err(error) => {
                return Err(CleanupError::RemoveDir {
                    dir: self.dir.clone(),
                    error,
                });
            }
        };

        Ok(CleanupSummary {
            files_removed,
            dir_removed,
        })
    }
}

/// Builds the staging file name for a test execution:
/// `test_<worker>_<sanitized title>_<epoch ms>_<nonce>.json`.
///
/// The sanitized title is cut to [`MAX_TITLE_LEN`] characters so the name
/// stays within file system limits.
pub fn staging_file_name(
    worker_index: usize,
    test_title: &str,
    epoch_ms: i64,
    nonce: &str,
) -> String {
    let mut title = sanitize_for_file_name(test_title);
    // Sanitized titles are ASCII, so this cuts on a character boundary.
    title.truncate(MAX_TITLE_LEN);
    format!("test_{worker_index}_{title}_{epoch_ms}_{nonce}.{STAGING_FILE_EXTENSION}")
}

fn random_nonce() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}
