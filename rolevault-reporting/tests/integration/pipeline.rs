// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::{Result, bail, ensure};
use rolevault_reporting::{
    lifecycle::GlobalHooks,
    network::{
        AggregateOutcome, NetworkAggregator, ObservedRequest, StagingDir, TestIdentity, parse_csv,
    },
    paths::ReportPaths,
    run_mode::{RunMode, ShardMode},
};
use std::{fs, thread};

const API: &str = "http://localhost:5001/api";

fn run_test(
    hooks: &GlobalHooks,
    worker: usize,
    title: &str,
    requests: &[PageRequest],
) -> Result<()> {
    let identity = TestIdentity::from_title_path(
        "chromium",
        &["e2e/roles.spec.ts", "Role Management", title],
        worker,
    );
    let monitor = hooks.network_monitor(identity);
    for request in requests {
        match request.response()? {
            Some(_) => monitor.recorder().on_request_finished(request),
            None => monitor.recorder().on_request_failed(request),
        };
    }

    let mut sink = TestResultAttachments::default();
    let staged = monitor.attach_report(&mut sink);
    ensure!(staged.is_some(), "batch for `{title}` was not staged");
    ensure!(
        sink.attachments.len() == 1,
        "expected one attachment, got {}",
        sink.attachments.len()
    );
    Ok(())
}

#[test]
fn full_run_produces_one_report() -> Result<()> {
    let temp = Utf8TempDir::new()?;
    let paths = ReportPaths::new(temp.path());

    // Leftovers from an interrupted earlier run are removed by global setup.
    let stale = StagingDir::new(paths.staging_dir());
    fs::create_dir_all(stale.path())?;
    fs::write(stale.path().join("test_0_stale_1_abcdef.json"), "[]")?;

    let hooks = GlobalHooks::setup_with_mode(paths.clone(), RunMode::UNSHARDED);
    ensure!(!stale.exists(), "stale staging data was not cleaned up");

    thread::scope(|scope| -> Result<()> {
        let workers: Vec<_> = (0..3)
            .map(|worker| {
                let hooks = &hooks;
                scope.spawn(move || {
                    let requests = [
                        PageRequest::finished("GET", &format!("{API}/roles"), 200, 12.4),
                        PageRequest::finished("POST", &format!("{API}/roles?x=a,b"), 201, 30.0),
                        PageRequest::failed("GET", "http://cdn.example/font.woff2"),
                    ];
                    run_test(hooks, worker, &format!("creates role {worker}"), &requests)
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker did not panic")?;
        }
        Ok(())
    })?;

    let outcome = hooks.global_teardown();
    let Some(report) = outcome.report() else {
        bail!("expected a report, got {outcome:?}");
    };
    ensure!(
        report.files_merged == 3,
        "merged {} files",
        report.files_merged
    );
    ensure!(report.records == 9, "wrote {} records", report.records);
    ensure!(report.staging_cleaned, "staging was not cleaned");
    ensure!(report.path.starts_with(paths.reports_dir()));

    let rows = parse_csv(&fs::read_to_string(&report.path)?)?;
    ensure!(rows.len() == 10, "unexpected row count {}", rows.len());
    ensure!(
        rows[0].join(",")
            == "TIMESTAMP,PROJECTNAME,TESTFILE,TESTSUITE,TESTTITLE,METHOD,URL,STATUSCODE,RESPONSETIMEINMS"
    );
    let failures = rows[1..].iter().filter(|row| row[7] == "0").count();
    ensure!(failures == 3, "expected 3 network failures, got {failures}");
    ensure!(
        rows[1..]
            .iter()
            .filter(|row| row[6] == "http://localhost:5001/api/roles?x=a,b")
            .count()
            == 3,
        "quoted URL did not round-trip"
    );

    // Nothing is left to merge.
    ensure!(matches!(
        hooks.global_teardown(),
        AggregateOutcome::NoStagingDir
    ));
    Ok(())
}

#[test]
fn sharded_run_defers_to_manual_merge() -> Result<()> {
    let temp = Utf8TempDir::new()?;
    let paths = ReportPaths::new(temp.path());
    let mode = RunMode::detect(["--shard=1/2"], |_| None);
    ensure!(mode.is_sharded());

    let hooks = GlobalHooks::setup_with_mode(paths.clone(), mode);
    run_test(
        &hooks,
        0,
        "edits role",
        &[PageRequest::finished("PUT", &format!("{API}/roles/7"), 200, 5.0)],
    )?;
    ensure!(matches!(
        hooks.global_teardown(),
        AggregateOutcome::SkippedSharded
    ));

    // The second shard's setup must not wipe the first shard's data.
    let second_mode = RunMode::detect(["--shard", "2/2"], |_| None);
    let second = GlobalHooks::setup_with_mode(paths.clone(), second_mode);
    ensure!(StagingDir::new(paths.staging_dir()).exists());
    run_test(
        &second,
        0,
        "deletes role",
        &[PageRequest::failed("DELETE", &format!("{API}/roles/7"))],
    )?;

    // The manual merge ignores sharding.
    let outcome = NetworkAggregator::new(&paths, mode).merge(true);
    let Some(report) = outcome.report() else {
        bail!("expected a report, got {outcome:?}");
    };
    ensure!(report.records == 2);
    ensure!(report.staging_cleaned);
    ensure!(matches!(second.run_mode().shard, ShardMode::Sharded(Some(_))));
    Ok(())
}

// The only test in this binary that installs the process-wide run mode.
#[test]
fn global_setup_installs_mode_for_workers() -> Result<()> {
    let temp = Utf8TempDir::new()?;
    let paths = ReportPaths::new(temp.path());

    let hooks = GlobalHooks::global_setup(paths.clone(), ["--headed", "--shard", "2/3"]);
    let mode = hooks.run_mode();
    ensure!(mode.headed);
    let ShardMode::Sharded(Some(spec)) = mode.shard else {
        bail!("expected a parsed shard, got {mode:?}");
    };
    ensure!(spec.to_string() == "2/3");
    let worker_env = mode.worker_env();
    ensure!(worker_env == [("PW_SHARDED", "1"), ("PW_HEADED", "1")]);

    let worker = GlobalHooks::for_worker(paths.clone());
    let worker_mode = worker.run_mode();
    ensure!(worker_mode == mode, "worker saw {worker_mode:?}");

    // A later setup in the same process keeps the first mode.
    let again = GlobalHooks::global_setup(paths, std::iter::empty::<&str>());
    ensure!(again.run_mode() == mode);
    Ok(())
}
