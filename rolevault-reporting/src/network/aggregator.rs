// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merges staged batches into the CSV network report.

use super::{
    csv::records_to_csv,
    record::HttpRequestRecord,
    staging::{CleanupSummary, StagingDir},
};
use crate::{
    errors::{AggregateError, CleanupError, DisplayErrorChain},
    helpers::{file_name_timestamp, plural},
    paths::ReportPaths,
    run_mode::RunMode,
};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use std::{fs, io::Write};
use tracing::{debug, error, info, warn};

/// Prefix of CSV report file names.
pub const NETWORK_REPORT_PREFIX: &str = "network-report-";

/// A CSV report written by [`NetworkAggregator::generate_network_report_csv`].
#[derive(Debug)]
pub struct NetworkReport {
    /// Where the report was written.
    pub path: Utf8PathBuf,

    /// The number of staging files merged into the report.
    pub files_merged: usize,

    /// The number of rows in the report, excluding the header.
    pub records: usize,

    /// Staging files that could not be read or parsed.
    pub skipped: Vec<Utf8PathBuf>,

    /// Whether the staging directory was removed afterwards.
    pub staging_cleaned: bool,
}

/// The result of an aggregation attempt.
///
/// Aggregation never fails its caller: every outcome, including errors, is
/// logged before being returned.
#[derive(Debug)]
pub enum AggregateOutcome {
    /// The run is sharded, so aggregation is left for a manual step.
    SkippedSharded,

    /// The staging directory does not exist.
    NoStagingDir,

    /// The staging directory contains no batch files.
    NoFiles,

    /// Batch files were found but together held no records.
    NoRecords {
        /// Staging files that could not be read or parsed.
        skipped: Vec<Utf8PathBuf>,
    },

    /// A report was written.
    Written(NetworkReport),

    /// Aggregation stopped because of an error.
    Failed(AggregateError),
}

impl AggregateOutcome {
    /// Returns the written report, if any.
    pub fn report(&self) -> Option<&NetworkReport> {
        match self {
            Self::Written(report) => Some(report),
            _ => None,
        }
    }

    /// Returns the staging files that were skipped as unreadable.
    pub fn skipped(&self) -> &[Utf8PathBuf] {
        match self {
            Self::NoRecords { skipped } => skipped,
            Self::Written(report) => &report.skipped,
            _ => &[],
        }
    }
}

/// Merges every staged batch into one CSV report, then cleans up staging.
#[derive(Clone, Debug)]
pub struct NetworkAggregator {
    staging: StagingDir,
    reports_dir: Utf8PathBuf,
    run_mode: RunMode,
}

impl NetworkAggregator {
    /// Creates an aggregator over the given locations.
    pub fn new(paths: &ReportPaths, run_mode: RunMode) -> Self {
        Self {
            staging: StagingDir::new(paths.staging_dir()),
            reports_dir: paths.reports_dir(),
            run_mode,
        }
    }

    /// Overrides the staging directory.
    pub fn with_staging(mut self, staging: StagingDir) -> Self {
        self.staging = staging;
        self
    }

    /// Overrides the directory the report is written to.
    pub fn with_reports_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.reports_dir = dir.into();
        self
    }

    /// The staging directory.
    pub fn staging(&self) -> &StagingDir {
        &self.staging
    }

    /// Merges staged batches into
    /// `<reports>/network-report-<timestamp>.csv`.
    ///
    /// Does nothing in a sharded run. Files that cannot be read or parsed are
    /// skipped and left in place, along with the rest of the staging data.
    pub fn generate_network_report_csv(&self) -> AggregateOutcome {
        if self.run_mode.is_sharded() {
            info!(
                "skipping network report generation in sharded mode; \
                 use `rolevault-report merge-network` after all shards finish"
            );
            return AggregateOutcome::SkippedSharded;
        }
        self.generate_at(Utc::now(), true)
    }

    /// Like [`Self::generate_network_report_csv`], but ignores sharding.
    ///
    /// Staging data is removed afterwards only if `clean_up` is true.
    pub fn merge(&self, clean_up: bool) -> AggregateOutcome {
        self.generate_at(Utc::now(), clean_up)
    }

    /// Removes the staging directory and everything in it.
    ///
    /// Does nothing in a sharded run, since other shards may still be writing.
    pub fn clean_up_temp_network_data(&self) -> Option<CleanupSummary> {
        if self.run_mode.is_sharded() {
            info!("skipping network data cleanup in sharded mode, consider manual cleanup");
            return None;
        }
        self.clean_up_staging()
    }

    /// Removes staging data regardless of run mode. Failures are logged.
    pub fn clean_up_staging(&self) -> Option<CleanupSummary> {
        match self.staging.clean_up() {
            Ok(summary) => {
                debug!(
                    "removed {} {} from `{}`",
                    summary.files_removed,
                    plural(summary.files_removed, "entry", "entries"),
                    self.staging.path(),
                );
                Some(summary)
            }
            Err(err) => {
                log_cleanup_error(&err);
                None
            }
        }
    }

    pub(crate) fn generate_at(&self, now: DateTime<Utc>, clean_up: bool) -> AggregateOutcome {
        let batches = match self.staging.list_batches() {
            Ok(Some(batches)) => batches,
            Ok(None) => {
                info!("no network data files found");
                return AggregateOutcome::NoStagingDir;
            }
            Err(err) => return failed(AggregateError::ListStaging(err)),
        };
        if batches.is_empty() {
            info!("no network data to merge");
            return AggregateOutcome::NoFiles;
        }

        info!(
            "merging {} network data {}",
            batches.len(),
            plural(batches.len(), "file", "files"),
        );

        let mut records: Vec<HttpRequestRecord> = Vec::new();
        let mut skipped = Vec::new();
        for path in &batches {
            match StagingDir::read_batch(path) {
                Ok(batch) => records.extend(batch),
                Err(err) => {
                    warn!(
                        "skipping network data file: {}",
                        DisplayErrorChain::new(&err)
                    );
                    skipped.push(path.clone());
                }
            }
        }
        let files_merged = batches.len() - skipped.len();

        if records.is_empty() {
            info!("no valid network data found");
            return AggregateOutcome::NoRecords { skipped };
        }

        let path = match self.write_report(&records, now) {
            Ok(path) => path,
            Err(err) => return failed(err),
        };
        info!(
            "network report generation completed: {} {} written to `{path}`",
            records.len(),
            plural(records.len(), "request", "requests"),
        );

        let staging_cleaned = if !skipped.is_empty() {
            warn!(
                "{} network data {} could not be read, leaving `{}` in place",
                skipped.len(),
                plural(skipped.len(), "file", "files"),
                self.staging.path(),
            );
            false
        } else if clean_up {
            self.clean_up_staging()
                .is_some_and(|summary| summary.dir_removed)
        } else {
            false
        };

        AggregateOutcome::Written(NetworkReport {
            path,
            files_merged,
            records: records.len(),
            skipped,
            staging_cleaned,
        })
    }

    fn write_report(
        &self,
        records: &[HttpRequestRecord],
        now: DateTime<Utc>,
    ) -> Result<Utf8PathBuf, AggregateError> {
        let csv = records_to_csv(records).map_err(AggregateError::Csv)?;

        fs::create_dir_all(&self.reports_dir).map_err(|error| {
            AggregateError::CreateReportsDir {
                dir: self.reports_dir.clone(),
                error,
            }
        })?;

        let path = report_path(&self.reports_dir, now);
        AtomicFile::new(&path, OverwriteBehavior::AllowOverwrite)
            .write(|file| file.write_all(csv.as_bytes()))
            .map_err(|error| AggregateError::WriteReport {
                path: path.clone(),
                error: match error {
                    atomicwrites::Error::Internal(error) | atomicwrites::Error::User(error) => {
                        error
                    }
                },
            })?;
        Ok(path)
    }
}

fn report_path(reports_dir: &Utf8Path, now: DateTime<Utc>) -> Utf8PathBuf {
    reports_dir.join(format!(
        "{NETWORK_REPORT_PREFIX}{}.csv",
        file_name_timestamp(now)
    ))
}

fn failed(err: AggregateError) -> AggregateOutcome {
    error!(
        "error generating network report: {}",
        DisplayErrorChain::new(&err)
    );
    AggregateOutcome::Failed(err)
}

fn log_cleanup_error(err: &CleanupError) {
    warn!(
        "failed to clean up network data: {}",
        DisplayErrorChain::new(err)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        network::{csv::parse_csv, recorder::test_helpers::identity},
        run_mode::{ShardMode, ShardSpec},
    };
    use camino_tempfile::Utf8TempDir;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 34, 56)
            .single()
            .expect("valid date")
    }

    fn record(url: &str, status_code: u16) -> HttpRequestRecord {
        HttpRequestRecord {
            timestamp: now(),
            project_name: "chromium".to_owned(),
            test_file: "e2e/auth.spec.ts".to_owned(),
            test_suite: "Authentication".to_owned(),
            test_title: "login, then logout".to_owned(),
            method: "GET".to_owned(),
            url: url.to_owned(),
            status_code,
            response_time_in_ms: 3,
        }
    }

    fn batch(prefix: &str, count: usize) -> Vec<HttpRequestRecord> {
        (0..count)
            .map(|i| record(&format!("http://app/{prefix}/{i}"), 200))
            .collect()
    }

    struct Fixture {
        temp: Utf8TempDir,
        aggregator: NetworkAggregator,
    }

    impl Fixture {
        fn new(run_mode: RunMode) -> Self {
            let temp = Utf8TempDir::new().expect("created temp dir");
            let aggregator = NetworkAggregator::new(&ReportPaths::new(temp.path()), run_mode);
            Self { temp, aggregator }
        }

        fn stage(&self, records: &[HttpRequestRecord]) -> Utf8PathBuf {
            self.aggregator
                .staging()
                .write_batch(&identity(), records)
                .expect("staged batch")
                .path
        }

        fn reports(&self) -> Vec<Utf8PathBuf> {
            let dir = self.temp.path().join("network-reports");
            let Ok(entries) = dir.read_dir_utf8() else {
                return Vec::new();
            };
            let mut reports: Vec<_> = entries
                .map(|entry| entry.expect("read entry").into_path())
                .filter(|path| path.extension() == Some("csv"))
                .collect();
            reports.sort();
            reports
        }
    }

    #[test]
    fn merges_every_batch() {
        let fixture = Fixture::new(RunMode::UNSHARDED);
        fixture.stage(&batch("a", 2));
        fixture.stage(&[]);
        fixture.stage(&batch("c", 5));

        let outcome = fixture.aggregator.generate_at(now(), true);
        let report = outcome.report().expect("report written");
        assert_eq!(report.files_merged, 3);
        assert_eq!(report.records, 7);
        assert!(report.skipped.is_empty());
        assert!(report.staging_cleaned);
        assert_eq!(
            report.path,
            fixture
                .temp
                .path()
                .join("network-reports/network-report-2024-05-01T12-34-56-000Z.csv")
        );
        assert!(!fixture.aggregator.staging().exists());

        let csv = fs::read_to_string(&report.path).expect("read report");
        let rows = parse_csv(&csv).expect("parsed report");
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0][0], "TIMESTAMP");
        let mut urls: Vec<_> = rows[1..].iter().map(|row| row[6].as_str()).collect();
        urls.sort_unstable();
        assert_eq!(
            urls,
            vec![
                "http://app/a/0",
                "http://app/a/1",
                "http://app/c/0",
                "http://app/c/1",
                "http://app/c/2",
                "http://app/c/3",
                "http://app/c/4",
            ]
        );
    }

    #[test]
    fn failed_requests_are_reported() {
        let fixture = Fixture::new(RunMode::UNSHARDED);
        fixture.stage(&[record("http://cdn/down", 0), record("http://app/", 200)]);

        let outcome = fixture.aggregator.generate_at(now(), true);
        let report = outcome.report().expect("report written");
        let rows = parse_csv(&fs::read_to_string(&report.path).expect("read report"))
            .expect("parsed report");
        let statuses: Vec<_> = rows[1..].iter().map(|row| row[7].as_str()).collect();
        assert_eq!(statuses, vec!["0", "200"]);
    }

    #[test]
    fn nothing_staged() {
        let fixture = Fixture::new(RunMode::UNSHARDED);
        assert!(matches!(
            fixture.aggregator.generate_at(now(), true),
            AggregateOutcome::NoStagingDir
        ));

        fs::create_dir_all(fixture.aggregator.staging().path()).expect("created staging");
        assert!(matches!(
            fixture.aggregator.generate_at(now(), true),
            AggregateOutcome::NoFiles
        ));

        fixture.stage(&[]);
        fixture.stage(&[]);
        assert!(matches!(
            fixture.aggregator.generate_at(now(), true),
            AggregateOutcome::NoRecords { ref skipped } if skipped.is_empty()
        ));
        assert_eq!(fixture.reports(), Vec::<Utf8PathBuf>::new());
    }

    #[test]
    fn sharded_run_leaves_everything() {
        let fixture = Fixture::new(RunMode {
            shard: ShardMode::Sharded(Some(ShardSpec {
                shard: 1,
                total_shards: 2,
            })),
            headed: false,
        });
        fixture.stage(&batch("a", 1));

        assert!(matches!(
            fixture.aggregator.generate_network_report_csv(),
            AggregateOutcome::SkippedSharded
        ));
        assert_eq!(fixture.aggregator.clean_up_temp_network_data(), None);
        assert!(fixture.aggregator.staging().exists());
        assert_eq!(fixture.reports(), Vec::<Utf8PathBuf>::new());

        // A manual merge ignores the run mode.
        let outcome = fixture.aggregator.merge(false);
        assert_eq!(outcome.report().expect("report written").records, 1);
        assert!(fixture.aggregator.staging().exists());
    }

    #[test]
    fn malformed_file_is_skipped() {
        let fixture = Fixture::new(RunMode::UNSHARDED);
        fixture.stage(&batch("a", 2));
        let bad = fixture
            .aggregator
            .staging()
            .path()
            .join("test_9_truncated_1714550400000_zzzzzz.json");
        fs::write(&bad, "[{\"timestamp\": ").expect("wrote malformed file");
        fixture.stage(&batch("b", 1));

        let outcome = fixture.aggregator.generate_at(now(), true);
        assert_eq!(outcome.skipped(), &[bad.clone()]);
        let report = outcome.report().expect("report written");
        assert_eq!(report.files_merged, 2);
        assert_eq!(report.records, 3);
        assert!(!report.staging_cleaned);
        assert!(bad.exists());
    }

    #[test]
    fn second_run_is_a_no_op() {
        let fixture = Fixture::new(RunMode::UNSHARDED);
        fixture.stage(&batch("a", 1));

        assert!(fixture.aggregator.generate_at(now(), true).report().is_some());
        assert!(matches!(
            fixture.aggregator.generate_at(now(), true),
            AggregateOutcome::NoStagingDir
        ));
        assert_eq!(fixture.reports().len(), 1);
    }

    #[test]
    fn unwritable_reports_dir_fails() {
        let fixture = Fixture::new(RunMode::UNSHARDED);
        fixture.stage(&batch("a", 1));
        // A file where the reports directory should be.
        let blocker = fixture.temp.path().join("blocker");
        fs::write(&blocker, "").expect("wrote blocker");
        let aggregator = fixture.aggregator.clone().with_reports_dir(blocker.join("reports"));

        let outcome = aggregator.generate_at(now(), true);
        assert!(
            matches!(
                outcome,
                AggregateOutcome::Failed(AggregateError::CreateReportsDir { .. })
            ),
            "unexpected outcome {outcome:?}"
        );
        assert!(aggregator.staging().exists());
    }
}
