// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::{Result, ensure};
use indoc::indoc;
use rolevault_reporting::{
    errors::ReconcileError,
    paths::ReportPaths,
    reporter::{
        HostTestStatus, OutcomeReconciler, ReporterEvent, RunStatus, TestCaseInfo, TestPlan,
        TestRunResult,
    },
};
use serde_json::{Value, json};
use std::{fs, time::Duration};

const PLAN: &str = indoc! {r#"
    {
      "testPlanName": "RoleVault Regression",
      "testSuiteName": "UI Smoke",
      "testCases": {
        "Admin can create role": { "testCaseId": 4711 },
        "Viewer sees read-only dashboard": { "testCaseId": "4712" }
      }
    }
"#};

fn execution(
    title: &str,
    project: &str,
    status: &str,
    ms: u64,
    error: Option<&str>,
) -> Result<(TestCaseInfo, TestRunResult)> {
    Ok((
        TestCaseInfo {
            title: title.to_owned(),
            project_name: Some(project.to_owned()),
        },
        TestRunResult {
            status: Some(status.parse::<HostTestStatus>()?),
            duration: Duration::from_millis(ms),
            error_message: error.map(str::to_owned),
        },
    ))
}

#[test]
fn reconciled_report_on_disk() -> Result<()> {
    let temp = Utf8TempDir::new()?;
    let paths = ReportPaths::new(temp.path());
    fs::create_dir_all(temp.path().join("custom-reporter"))?;
    fs::write(paths.test_plan(), PLAN)?;

    let mut reconciler = OutcomeReconciler::new(
        TestPlan::from_path(&paths.test_plan())?,
        paths.test_results_report(),
    );

    const ADMIN: &str = "Admin can create role";
    const VIEWER: &str = "Viewer sees read-only dashboard";
    let executions = [
        execution(
            ADMIN,
            "chromium",
            "failed",
            900,
            Some("\u{1b}[2mexpect(\u{1b}[22mlocator).toBeVisible()"),
        ),
        execution(VIEWER, "chromium", "passed", 400, None),
        execution(ADMIN, "chromium", "passed", 700, None),
        execution(
            ADMIN,
            "firefox",
            "timedOut",
            30_000,
            Some("Test timeout of 30000ms exceeded."),
        ),
        execution(VIEWER, "firefox", "passed", 450, None),
    ];
    for execution in executions {
        let (test, result) = execution?;
        reconciler.write_event(ReporterEvent::TestEnd {
            test: &test,
            result: &result,
        })?;
    }

    let unmapped = execution("Scratch test", "chromium", "passed", 1, None)?;
    let err = reconciler
        .write_event(ReporterEvent::TestEnd {
            test: &unmapped.0,
            result: &unmapped.1,
        })
        .expect_err("unmapped title");
    ensure!(matches!(err, ReconcileError::UnmappedTestTitle { .. }));

    reconciler.write_event(ReporterEvent::RunEnd {
        status: RunStatus::Failed,
    })?;

    let written: Value = serde_json::from_str(&fs::read_to_string(paths.test_results_report())?)?;
    let expected = json!({
        "testPlanName": "RoleVault Regression",
        "testSuiteName": "UI Smoke",
        "testResults": {
            "4711": {
                "comment": "Test Name: Admin can create role",
                "outcome": "Inconclusive",
                "durationInMs": 31_600,
                "errorMessage": "",
                "iterationDetails": [
                    {
                        "id": 1,
                        "comment": "Project: chromium <=> Test Name: Admin can create role",
                        "outcome": "Failed",
                        "durationInMs": 900,
                        "errorMessage": "expect(locator).toBeVisible()"
                    },
                    {
                        "id": 2,
                        "comment": "Project: chromium <=> Test Name: Admin can create role",
                        "outcome": "Passed",
                        "durationInMs": 700
                    },
                    {
                        "id": 3,
                        "comment": "Project: firefox <=> Test Name: Admin can create role",
                        "outcome": "Failed",
                        "durationInMs": 30_000,
                        "errorMessage": "Test timeout of 30000ms exceeded."
                    }
                ]
            },
            "4712": {
                "comment": "Test Name: Viewer sees read-only dashboard",
                "outcome": "Passed",
                "durationInMs": 850,
                "errorMessage": "",
                "iterationDetails": [
                    {
                        "id": 1,
                        "comment": "Project: chromium <=> Test Name: Viewer sees read-only dashboard",
                        "outcome": "Passed",
                        "durationInMs": 400
                    },
                    {
                        "id": 2,
                        "comment": "Project: firefox <=> Test Name: Viewer sees read-only dashboard",
                        "outcome": "Passed",
                        "durationInMs": 450
                    }
                ]
            }
        }
    });
    ensure!(written == expected, "unexpected report:\n{written:#}");

    let keys: Vec<_> = written["testResults"]
        .as_object()
        .map(|results| results.keys().cloned().collect())
        .unwrap_or_default();
    ensure!(keys == ["4711", "4712"], "results out of order: {keys:?}");
    Ok(())
}
