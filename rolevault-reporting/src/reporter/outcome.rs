// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// The outcome recorded against a test case in the test plan.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestOutcome {
    /// Every execution passed.
    Passed,

    /// Every execution failed.
    Failed,

    /// Every execution was skipped or interrupted.
    Error,

    /// The host reported no status.
    Unspecified,

    /// Executions disagreed.
    Inconclusive,
}

impl TestOutcome {
    /// Combines this outcome with a later execution's outcome.
    ///
    /// Agreement keeps the outcome, any disagreement is inconclusive. Once
    /// inconclusive, the combined outcome stays inconclusive.
    pub fn combine(self, next: TestOutcome) -> TestOutcome {
        if self == next {
            self
        } else {
            TestOutcome::Inconclusive
        }
    }

    /// The outcome's name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::Error => "Error",
            Self::Unspecified => "Unspecified",
            Self::Inconclusive => "Inconclusive",
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution of a test case, as recorded in
/// [`TestOutcomeRecord::iteration_details`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationDetails {
    /// 1-based position in the history.
    pub id: usize,

    /// The execution's comment.
    pub comment: String,

    /// The execution's outcome.
    pub outcome: TestOutcome,

    /// The execution's duration.
    pub duration_in_ms: u64,

    /// The execution's error message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// The reconciled result for one test case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcomeRecord {
    /// Describes what was run.
    pub comment: String,

    /// The combined outcome.
    pub outcome: TestOutcome,

    /// Total duration across executions.
    pub duration_in_ms: u64,

    /// The error message of a single execution, or an empty string once there
    /// is more than one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Every execution, present once there is more than one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_details: Option<Vec<IterationDetails>>,
}

impl TestOutcomeRecord {
    /// Creates the record for a test case's first execution.
    pub fn single(
        project_name: &str,
        title: &str,
        outcome: TestOutcome,
        duration: Duration,
        error_message: Option<String>,
    ) -> Self {
        Self {
            comment: format!("Project: {project_name} <=> Test Name: {title}"),
            outcome,
            duration_in_ms: duration_millis(duration),
            error_message,
            iteration_details: None,
        }
    }

    /// Returns the number of executions folded into this record.
    pub fn executions(&self) -> usize {
        self.iteration_details.as_ref().map_or(1, Vec::len)
    }

    /// Folds a later execution of the same test case into this record.
    ///
    /// `current` must be a single-execution record, as built by
    /// [`Self::single`]. The second execution turns the record into a
    /// two-entry history; later executions are appended to it.
    pub fn merge(&mut self, title: &str, current: TestOutcomeRecord) {
        let outcome = self.outcome.combine(current.outcome);
        let duration_in_ms = self.duration_in_ms.saturating_add(current.duration_in_ms);

        if let Some(iterations) = &mut self.iteration_details {
            let id = iterations.len() + 1;
            iterations.push(current.into_iteration(id));
            self.outcome = outcome;
            self.duration_in_ms = duration_in_ms;
            return;
        }

        let first = std::mem::replace(
            self,
            Self {
                comment: format!("Test Name: {title}"),
                outcome,
                duration_in_ms,
                error_message: Some(String::new()),
                iteration_details: None,
            },
        );
        self.iteration_details = Some(vec![first.into_iteration(1), current.into_iteration(2)]);
    }

    fn into_iteration(self, id: usize) -> IterationDetails {
        IterationDetails {
            id,
            comment: self.comment,
            outcome: self.outcome,
            duration_in_ms: self.duration_in_ms,
            error_message: self.error_message,
        }
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn run(outcome: TestOutcome, ms: u64, error: Option<&str>) -> TestOutcomeRecord {
        TestOutcomeRecord::single(
            "chromium",
            "Admin can create role",
            outcome,
            Duration::from_millis(ms),
            error.map(str::to_owned),
        )
    }

    #[test]
    fn combine() {
        use TestOutcome::*;
        assert_eq!(Passed.combine(Passed), Passed);
        assert_eq!(Passed.combine(Failed), Inconclusive);
        assert_eq!(Inconclusive.combine(Passed), Inconclusive);
        assert_eq!(Error.combine(Error), Error);
    }

    #[test]
    fn single_execution_json() {
        let record = run(TestOutcome::Passed, 1200, None);
        assert_eq!(record.executions(), 1);
        assert_eq!(
            serde_json::to_string_pretty(&record).expect("serializes"),
            indoc! {r#"
                {
                  "comment": "Project: chromium <=> Test Name: Admin can create role",
                  "outcome": "Passed",
                  "durationInMs": 1200
                }"#},
        );
    }

    #[test]
    fn second_execution_starts_history() {
        let mut record = run(TestOutcome::Failed, 500, Some("timeout"));
        record.merge("Admin can create role", run(TestOutcome::Passed, 300, None));

        assert_eq!(record.executions(), 2);
        assert_eq!(
            serde_json::to_string_pretty(&record).expect("serializes"),
            indoc! {r#"
                {
                  "comment": "Test Name: Admin can create role",
                  "outcome": "Inconclusive",
                  "durationInMs": 800,
                  "errorMessage": "",
                  "iterationDetails": [
                    {
                      "id": 1,
                      "comment": "Project: chromium <=> Test Name: Admin can create role",
                      "outcome": "Failed",
                      "durationInMs": 500,
                      "errorMessage": "timeout"
                    },
                    {
                      "id": 2,
                      "comment": "Project: chromium <=> Test Name: Admin can create role",
                      "outcome": "Passed",
                      "durationInMs": 300
                    }
                  ]
                }"#},
        );
    }

    #[test]
    fn later_executions_append() {
        let mut record = run(TestOutcome::Passed, 10, None);
        record.merge("Admin can create role", run(TestOutcome::Passed, 20, None));
        assert_eq!(record.outcome, TestOutcome::Passed);
        record.merge("Admin can create role", run(TestOutcome::Passed, 30, None));

        assert_eq!(record.outcome, TestOutcome::Passed);
        assert_eq!(record.duration_in_ms, 60);
        assert_eq!(record.comment, "Test Name: Admin can create role");
        let ids: Vec<_> = record
            .iteration_details
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|iteration| (iteration.id, iteration.duration_in_ms))
            .collect();
        assert_eq!(ids, vec![(1, 10), (2, 20), (3, 30)]);
    }
}
