// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the reporting pipeline.
//!
//! Most of these never escape the crate's public entry points: observation,
//! persistence and aggregation failures are logged where they happen. The
//! exception is [`ReconcileError`], which the test-plan reporter returns to its
//! caller.

use camino::Utf8PathBuf;
use std::{borrow::Cow, error::Error, fmt};
use thiserror::Error;

/// Displays an error along with its chain of causes.
///
/// Useful for logging errors on a single `tracing` event.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        if source.is_some() {
            write!(f, "\n  caused by:")?;
        }
        while let Some(error) = source {
            write!(f, "\n  - {error}")?;
            source = error.source();
        }

        Ok(())
    }
}

/// An error reading request or response data from the browser automation
/// layer.
///
/// Produced by implementations of
/// [`ObservedRequest`](crate::network::ObservedRequest).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ObservationError {
    /// The page, context or request went away before data could be read.
    #[error("target closed before `{url}` could be inspected")]
    TargetClosed {
        /// The URL of the request being inspected.
        url: String,
    },

    /// Reading a particular piece of data failed.
    #[error("failed to read {what} for `{url}`: {message}")]
    Read {
        /// What was being read, e.g. "timing" or "response".
        what: &'static str,

        /// The URL of the request being inspected.
        url: String,

        /// The message reported by the automation layer.
        message: String,
    },
}

/// An error that occurred while writing a staging file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StagingWriteError {
    /// The staging directory could not be created.
    #[error("failed to create staging directory `{dir}`")]
    CreateDir {
        /// The staging directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The record batch could not be serialized.
    #[error("failed to serialize network records")]
    Serialize(#[source] serde_json::Error),

    /// The staging file could not be written.
    #[error("failed to write staging file `{path}`")]
    Write {
        /// The staging file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },
}

/// An error that occurred while reading staging data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StagingReadError {
    /// The staging directory could not be listed.
    #[error("failed to read staging directory `{dir}`")]
    ReadDir {
        /// The staging directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A staging file could not be read.
    #[error("failed to read staging file `{path}`")]
    ReadFile {
        /// The staging file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A staging file is not a JSON array of request records.
    #[error("staging file `{path}` is not a valid array of request records")]
    Parse {
        /// The staging file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },
}

/// An error that occurred while removing staging data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CleanupError {
    /// The staging directory could not be listed.
    #[error("failed to read staging directory `{dir}`")]
    ReadDir {
        /// The staging directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A file in the staging directory could not be removed.
    #[error("failed to remove staging file `{path}`")]
    RemoveFile {
        /// The file that could not be removed.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The staging directory itself could not be removed.
    #[error("failed to remove staging directory `{dir}`")]
    RemoveDir {
        /// The staging directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },
}

/// An error that aborted network report aggregation.
///
/// Errors scoped to a single staging file do not abort aggregation; they are
/// recorded as skipped batches instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AggregateError {
    /// The staging directory could not be listed.
    #[error("failed to list staging data")]
    ListStaging(#[source] StagingReadError),

    /// Merged records could not be converted to CSV.
    #[error("failed to convert network records to CSV")]
    Csv(#[source] serde_json::Error),

    /// The reports directory could not be created.
    #[error("failed to create reports directory `{dir}`")]
    CreateReportsDir {
        /// The reports directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The CSV report could not be written.
    #[error("failed to write network report `{path}`")]
    WriteReport {
        /// The report path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },
}

/// An error parsing CSV text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CsvParseError {
    /// A quoted field was not closed before the end of input.
    #[error("unterminated quoted field starting on line {line}")]
    UnterminatedQuote {
        /// The 1-based line the field started on.
        line: usize,
    },

    /// A closing quote was followed by something other than a separator.
    #[error("unexpected character {found:?} after closing quote on line {line}")]
    TrailingAfterQuote {
        /// The 1-based line.
        line: usize,

        /// The unexpected character.
        found: char,
    },
}

/// An error reading the test-plan mapping file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestPlanReadError {
    /// The file could not be read.
    #[error("failed to read test plan `{path}`")]
    Read {
        /// The test-plan path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The file is not a valid test plan.
    #[error("failed to parse test plan `{path}`")]
    Parse {
        /// The test-plan path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },
}

/// An error produced while reconciling a test completion.
///
/// Unlike every other failure in this crate, this is returned to the caller: a
/// result without a test-case id has nowhere to go.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReconcileError {
    /// The test title has no entry in the test plan.
    #[error(
        "test `{title}` is not mapped to a test case in plan `{plan_name}` \
         ({known_cases} known test cases)"
    )]
    UnmappedTestTitle {
        /// The display title of the test.
        title: String,

        /// The test plan name.
        plan_name: String,

        /// The number of test cases in the plan.
        known_cases: usize,
    },
}

/// An error writing the reconciled results report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportWriteError {
    /// The report's parent directory could not be created.
    #[error("failed to create report directory `{dir}`")]
    CreateDir {
        /// The directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The report could not be serialized.
    #[error("failed to serialize test results report")]
    Serialize(#[source] serde_json::Error),

    /// The report could not be written.
    #[error("failed to write test results report `{path}`")]
    Write {
        /// The report path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },
}

/// An error that occurs while parsing a [`ShardSpec`](crate::run_mode::ShardSpec).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("shard must be in the format \"M/N\": {message}")]
pub struct ShardParseError {
    message: Cow<'static, str>,
}

impl ShardParseError {
    pub(crate) fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An error creating test data files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestDataError {
    /// The test files directory could not be created.
    #[error("failed to create test files directory `{dir}`")]
    CreateDir {
        /// The directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A test file could not be written.
    #[error("failed to write test file `{path}`")]
    Write {
        /// The file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A test file could not be removed.
    #[error("failed to remove test file `{path}`")]
    Remove {
        /// The file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },
}

/// An error resolving the report root directory.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportPathsError {
    /// The current directory could not be determined.
    #[error("failed to determine the current directory")]
    CurrentDir(#[source] std::io::Error),

    /// The current directory is not valid UTF-8.
    #[error("current directory `{}` is not valid UTF-8", .path.display())]
    NonUtf8 {
        /// The offending path.
        path: std::path::PathBuf,
    },
}
