// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, RoleVaultExitCode,
    output::{OutputContext, OutputOpts, clap_styles},
};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use rolevault_reporting::{
    helpers::plural,
    network::{AggregateOutcome, NetworkAggregator, StagingDir},
    paths::{ReportPaths, TEMP_NETWORK_DATA_DIR_ENV},
    run_mode::RunMode,
    step::step,
};
use std::io::Write;
use tracing::info;

/// Out-of-band steps for RoleVault end-to-end reporting.
///
/// Global setup and teardown handle network data on their own in unsharded
/// runs. After a sharded run, merge the data from every shard with
/// `merge-network`.
#[derive(Debug, Parser)]
#[command(version, name = "rolevault-report", styles = clap_styles::style())]
pub struct RoleVaultReportApp {
    /// Directory the suite runs from [default: current directory]
    #[arg(long, global = true, value_name = "DIR", env = "ROLEVAULT_ROOT")]
    root: Option<Utf8PathBuf>,

    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge staged network data into a CSV report
    ///
    /// Runs regardless of sharding. Prints the path of the report, if one was
    /// written. Exits with code 1 if some staged files could not be read.
    MergeNetwork {
        /// Staging directory [default: <root>/network-reports/temp-network-data]
        #[arg(long, value_name = "DIR", env = TEMP_NETWORK_DATA_DIR_ENV)]
        staging_dir: Option<Utf8PathBuf>,

        /// Directory to write the report to [default: <root>/network-reports]
        #[arg(long, value_name = "DIR")]
        reports_dir: Option<Utf8PathBuf>,

        /// Leave staged data in place after merging
        #[arg(long)]
        keep_staging: bool,
    },

    /// Remove staged network data
    CleanNetwork {
        /// Staging directory [default: <root>/network-reports/temp-network-data]
        #[arg(long, value_name = "DIR", env = TEMP_NETWORK_DATA_DIR_ENV)]
        staging_dir: Option<Utf8PathBuf>,
    },
}

impl RoleVaultReportApp {
    /// Initializes logging and returns the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, writing results to `stdout`. Returns the process exit
    /// code.
    pub fn exec(self, stdout: &mut dyn Write) -> Result<i32, ExpectedError> {
        let paths = match self.root {
            Some(root) => Ok(ReportPaths::new(root)),
            None => ReportPaths::from_current_dir(),
        }
        .map_err(|err| ExpectedError::ReportPaths { err })?;

        match self.command {
            Command::MergeNetwork {
                staging_dir,
                reports_dir,
                keep_staging,
            } => step("merge-network", || {
                let paths = with_staging(paths, staging_dir);
                merge_network(paths, reports_dir, keep_staging, stdout)
            }),
            Command::CleanNetwork { staging_dir } => step("clean-network", || {
                clean_network(&with_staging(paths, staging_dir), stdout)
            }),
        }
    }
}

fn with_staging(paths: ReportPaths, staging_dir: Option<Utf8PathBuf>) -> ReportPaths {
    match staging_dir {
        Some(dir) => paths.with_staging_dir(dir),
        None => paths,
    }
}

fn merge_network(
    paths: ReportPaths,
    reports_dir: Option<Utf8PathBuf>,
    keep_staging: bool,
    stdout: &mut dyn Write,
) -> Result<i32, ExpectedError> {
    let mut aggregator = NetworkAggregator::new(&paths, RunMode::UNSHARDED);
    if let Some(dir) = reports_dir {
        aggregator = aggregator.with_reports_dir(dir);
    }

    let skipped = match aggregator.merge(!keep_staging) {
        AggregateOutcome::Written(report) => {
            writeln!(stdout, "{}", report.path)
                .map_err(|err| ExpectedError::WriteOutput { err })?;
            report.skipped.len()
        }
        AggregateOutcome::NoRecords { skipped } => skipped.len(),
        AggregateOutcome::SkippedSharded
        | AggregateOutcome::NoStagingDir
        | AggregateOutcome::NoFiles => 0,
        AggregateOutcome::Failed(err) => return Err(ExpectedError::MergeFailed { err }),
    };

    if skipped > 0 {
        info!(
            "{skipped} staged {} could not be read and {} left in `{}`",
            plural(skipped, "file", "files"),
            plural(skipped, "was", "were"),
            aggregator.staging().path(),
        );
        Ok(RoleVaultExitCode::SKIPPED_FILES)
    } else {
        Ok(RoleVaultExitCode::OK)
    }
}

fn clean_network(paths: &ReportPaths, stdout: &mut dyn Write) -> Result<i32, ExpectedError> {
    let staging = StagingDir::new(paths.staging_dir());
    let summary = staging
        .clean_up()
        .map_err(|err| ExpectedError::CleanFailed {
            staging_dir: staging.path().to_owned(),
            err,
        })?;
    if summary.dir_removed {
        writeln!(
            stdout,
            "removed {} staged {} from {}",
            summary.files_removed,
            plural(summary.files_removed, "entry", "entries"),
            staging.path(),
        )
        .map_err(|err| ExpectedError::WriteOutput { err })?;
    } else {
        info!("no network data in `{}`", staging.path());
    }
    Ok(RoleVaultExitCode::OK)
}
