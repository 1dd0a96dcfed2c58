// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    events::{ReporterEvent, RunStatus, TestCaseInfo, TestRunResult},
    outcome::TestOutcomeRecord,
    test_plan::{TestCaseId, TestPlan},
};
use crate::{
    errors::{DisplayErrorChain, ReconcileError, ReportWriteError},
    helpers::{plural, strip_ansi},
};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::Serialize;
use std::{fs, io::Write};
use tracing::{debug, error, info};

/// Project name used when the host does not report one.
pub const DEFAULT_PROJECT_NAME: &str = "default";

/// The report written at the end of the run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultsReport<'a> {
    /// The test plan name.
    pub test_plan_name: &'a str,

    /// The test suite name.
    pub test_suite_name: &'a str,

    /// Reconciled results, in the order test cases were first seen.
    pub test_results: &'a IndexMap<TestCaseId, TestOutcomeRecord>,
}

/// Folds every execution of a test case into a single record keyed by its
/// test-plan id, and writes the records out when the run ends.
#[derive(Clone, Debug)]
pub struct OutcomeReconciler {
    plan: TestPlan,
    report_path: Utf8PathBuf,
    results: IndexMap<TestCaseId, TestOutcomeRecord>,
}

impl OutcomeReconciler {
    /// Creates a reconciler that writes its report to `report_path`.
    pub fn new(plan: TestPlan, report_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            plan,
            report_path: report_path.into(),
            results: IndexMap::new(),
        }
    }

    /// The reconciled results so far.
    pub fn results(&self) -> &IndexMap<TestCaseId, TestOutcomeRecord> {
        &self.results
    }

    /// Handles a reporter event.
    pub fn write_event(&mut self, event: ReporterEvent<'_>) -> Result<(), ReconcileError> {
        match event {
            ReporterEvent::TestEnd { test, result } => self.on_test_end(test, result),
            ReporterEvent::RunEnd { status } => {
                self.on_run_end(status);
                Ok(())
            }
        }
    }

    /// Records one execution of a test.
    ///
    /// Returns an error if the test title is not in the test plan. Nothing is
    /// recorded in that case.
    pub fn on_test_end(
        &mut self,
        test: &TestCaseInfo,
        result: &TestRunResult,
    ) -> Result<(), ReconcileError> {
        let Some(id) = self.plan.test_case_id(&test.title) else {
            return Err(ReconcileError::UnmappedTestTitle {
                title: test.title.clone(),
                plan_name: self.plan.test_plan_name.clone(),
                known_cases: self.plan.test_cases.len(),
            });
        };

        let project_name = test.project_name.as_deref().unwrap_or(DEFAULT_PROJECT_NAME);
        let current = TestOutcomeRecord::single(
            project_name,
            &test.title,
            result.outcome(),
            result.duration,
            result.error_message.as_deref().map(strip_ansi),
        );

        match self.results.get_mut(id) {
            Some(existing) => {
                existing.merge(&test.title, current);
                debug!(
                    "test case {id} now has {} executions, outcome {}",
                    existing.executions(),
                    existing.outcome,
                );
            }
            None => {
                debug!("test case {id} first execution: {}", current.outcome);
                self.results.insert(id.clone(), current);
            }
        }
        Ok(())
    }

    /// Logs the final status and writes the report.
    ///
    /// A failure to write the report is logged, not returned.
    pub fn on_run_end(&self, status: RunStatus) -> Option<&Utf8Path> {
        info!("final suite status - {}", status.as_upper_str());
        match self.write_report() {
            Ok(()) => {
                info!(
                    "generated test results report with {} test {} at `{}`",
                    self.results.len(),
                    plural(self.results.len(), "case", "cases"),
                    self.report_path,
                );
                Some(&self.report_path)
            }
            Err(err) => {
                error!(
                    "error generating test results report: {}",
                    DisplayErrorChain::new(&err)
                );
                None
            }
        }
    }

    fn write_report(&self) -> Result<(), ReportWriteError> {
        let report = TestResultsReport {
            test_plan_name: &self.plan.test_plan_name,
            test_suite_name: &self.plan.test_suite_name,
            test_results: &self.results,
        };
        let json = serde_json::to_string_pretty(&report).map_err(ReportWriteError::Serialize)?;

        if let Some(dir) = self.report_path.parent()
            && !dir.as_str().is_empty()
        {
            fs::create_dir_all(dir).map_err(|error| ReportWriteError::CreateDir {
                dir: dir.to_owned(),
                error,
            })?;
        }

        AtomicFile::new(&self.report_path, OverwriteBehavior::AllowOverwrite)
            .write(|file| file.write_all(json.as_bytes()))
            .map_err(|error| ReportWriteError::Write {
                path: self.report_path.clone(),
                error: match error {
                    atomicwrites::Error::Internal(error) | atomicwrites::Error::User(error) => {
                        error
                    }
                },
            })
    }
}
