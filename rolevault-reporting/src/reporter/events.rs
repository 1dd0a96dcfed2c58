// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::outcome::TestOutcome;
use std::{fmt, str::FromStr, time::Duration};
use thiserror::Error;

/// The status the host test runner reports for one test execution.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HostTestStatus {
    /// The test passed.
    Passed,

    /// The test failed.
    Failed,

    /// The test exceeded its timeout.
    TimedOut,

    /// The test was skipped.
    Skipped,

    /// The run was interrupted while the test was executing.
    Interrupted,
}

impl HostTestStatus {
    /// The status as the host test runner spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::TimedOut => "timedOut",
            Self::Skipped => "skipped",
            Self::Interrupted => "interrupted",
        }
    }

    /// Maps the status to a test-plan outcome.
    pub fn outcome(self) -> TestOutcome {
        match self {
            Self::Passed => TestOutcome::Passed,
            Self::Failed | Self::TimedOut => TestOutcome::Failed,
            Self::Skipped | Self::Interrupted => TestOutcome::Error,
        }
    }
}

impl fmt::Display for HostTestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`HostTestStatus`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown test status `{0}`")]
pub struct UnknownHostStatus(pub String);

impl FromStr for HostTestStatus {
    type Err = UnknownHostStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passed" => Ok(Self::Passed),
            "failed" => Ok(Self::Failed),
            "timedOut" => Ok(Self::TimedOut),
            "skipped" => Ok(Self::Skipped),
            "interrupted" => Ok(Self::Interrupted),
            other => Err(UnknownHostStatus(other.to_owned())),
        }
    }
}

/// The test a completion belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCaseInfo {
    /// The test's own title, used to look up its test-plan id.
    pub title: String,

    /// The browser project the test ran under, if the host reports one.
    pub project_name: Option<String>,
}

/// The result of one test execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestRunResult {
    /// The host status. `None` if the host did not report one.
    pub status: Option<HostTestStatus>,

    /// How long the execution took.
    pub duration: Duration,

    /// The error message, which may contain ANSI escape sequences.
    pub error_message: Option<String>,
}

impl TestRunResult {
    /// The outcome this result maps to.
    pub fn outcome(&self) -> TestOutcome {
        self.status
            .map_or(TestOutcome::Unspecified, HostTestStatus::outcome)
    }
}

/// The overall status of a run, as reported by the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// Every test passed.
    Passed,

    /// At least one test failed.
    Failed,

    /// The run hit its global timeout.
    TimedOut,

    /// The run was interrupted.
    Interrupted,
}

impl RunStatus {
    /// The status in upper case, as written to the log.
    pub fn as_upper_str(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::TimedOut => "TIMEDOUT",
            Self::Interrupted => "INTERRUPTED",
        }
    }
}

/// An event delivered to the test-plan reporter by the host test runner.
#[derive(Clone, Debug)]
pub enum ReporterEvent<'a> {
    /// A test execution finished. Retries and other projects produce further
    /// events for the same test.
    TestEnd {
        /// The test.
        test: &'a TestCaseInfo,

        /// The execution's result.
        result: &'a TestRunResult,
    },

    /// The whole run finished.
    RunEnd {
        /// The overall status.
        status: RunStatus,
    },
}
