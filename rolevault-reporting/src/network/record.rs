// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::helpers::millis_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status code recorded for a request that failed before any response arrived.
pub const FAILED_REQUEST_STATUS: u16 = 0;

/// One observed network request within a test.
///
/// Field order is significant: it determines the column order of the CSV
/// report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestRecord {
    /// When the request was recorded.
    #[serde(with = "millis_timestamp")]
    pub timestamp: DateTime<Utc>,

    /// The browser project the test ran under, e.g. `chromium`.
    pub project_name: String,

    /// The test file.
    pub test_file: String,

    /// The enclosing describe blocks.
    pub test_suite: String,

    /// The test title.
    pub test_title: String,

    /// The HTTP method.
    pub method: String,

    /// The full URL.
    pub url: String,

    /// The HTTP status, or [`FAILED_REQUEST_STATUS`] if the request never
    /// produced a response.
    pub status_code: u16,

    /// Time from request start to response end, in milliseconds.
    pub response_time_in_ms: u64,
}

impl HttpRequestRecord {
    /// Returns true if the request failed at the network level.
    pub fn is_network_failure(&self) -> bool {
        self.status_code == FAILED_REQUEST_STATUS
    }
}

/// Identifies the test a batch of records belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestIdentity {
    /// The browser project name.
    pub project_name: String,

    /// The test file, e.g. `e2e/auth.spec.ts`.
    pub test_file: String,

    /// Enclosing describe blocks, joined with ` > `. Empty for top-level tests.
    pub test_suite: String,

    /// The test's own title.
    pub test_title: String,

    /// The index of the worker slot running the test.
    pub worker_index: usize,
}

impl TestIdentity {
    /// Builds an identity from the host's title path: the file first, then any
    /// describe blocks, then the test title.
    pub fn from_title_path<S: AsRef<str>>(
        project_name: impl Into<String>,
        title_path: &[S],
        worker_index: usize,
    ) -> Self {
        let (test_file, rest) = match title_path {
            [] => (String::new(), &[][..]),
            [file, rest @ ..] => (file.as_ref().to_owned(), rest),
        };
        let (test_title, describes) = match rest {
            [] => (String::new(), &[][..]),
            [describes @ .., title] => (title.as_ref().to_owned(), describes),
        };
        let test_suite = describes
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(" > ");

        Self {
            project_name: project_name.into(),
            test_file,
            test_suite,
            test_title,
            worker_index,
        }
    }
}
