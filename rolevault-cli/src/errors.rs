// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use rolevault_reporting::errors::{AggregateError, CleanupError, ReportPathsError};
use std::error::Error;
use thiserror::Error;
use tracing::error;

/// Exit codes returned by `rolevault-report`.
pub enum RoleVaultExitCode {}

impl RoleVaultExitCode {
    /// The command finished normally.
    pub const OK: i32 = 0;

    /// A report was produced, but some staged files could not be read and were
    /// left in place.
    pub const SKIPPED_FILES: i32 = 1;

    /// The command could not do its work.
    pub const SETUP_ERROR: i32 = 2;
}

// The #[error()] strings are summaries. Errors are printed with
// display_to_stderr, which adds the cause chain.

/// An error that stops `rolevault-report`.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not resolve the report root")]
    ReportPaths {
        #[source]
        err: ReportPathsError,
    },
    #[error("network report generation failed")]
    MergeFailed {
        #[source]
        err: AggregateError,
    },
    #[error("network data cleanup failed")]
    CleanFailed {
        staging_dir: Utf8PathBuf,
        #[source]
        err: CleanupError,
    },
    #[error("failed to write to stdout")]
    WriteOutput {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ReportPaths { .. }
            | Self::MergeFailed { .. }
            | Self::CleanFailed { .. }
            | Self::WriteOutput { .. } => RoleVaultExitCode::SETUP_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::ReportPaths { err } => {
                error!("could not resolve the report root");
                Some(err as &dyn Error)
            }
            Self::MergeFailed { err } => {
                error!("network report generation failed");
                Some(err as &dyn Error)
            }
            Self::CleanFailed { staging_dir, err } => {
                error!(
                    "failed to clean up network data in `{}`",
                    staging_dir.style(styles.path)
                );
                Some(err as &dyn Error)
            }
            Self::WriteOutput { err } => {
                error!("failed to write to stdout");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(
                target: NO_HEADING_TARGET,
                "\nCaused by:\n  {}",
                err
            );
            next_error = err.source();
        }
    }
}
