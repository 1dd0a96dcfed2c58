// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Locations of reporting inputs and outputs.
//!
//! Everything hangs off a single root directory, which is normally the
//! directory the suite was launched from.

use crate::errors::ReportPathsError;
use camino::{Utf8Path, Utf8PathBuf};

/// Environment variable overriding the staging directory for network data.
pub const TEMP_NETWORK_DATA_DIR_ENV: &str = "TEMP_NETWORK_DATA_DIR";

/// Directory, relative to the root, holding network reports.
pub const NETWORK_REPORTS_DIR: &str = "network-reports";

/// Directory, relative to the network reports directory, used for staging.
pub const TEMP_NETWORK_DATA_DIR: &str = "temp-network-data";

/// Directory, relative to the root, holding the test-plan reporter's files.
pub const CUSTOM_REPORTER_DIR: &str = "custom-reporter";

/// File name of the reconciled test results report.
pub const TEST_RESULTS_REPORT_FILE: &str = "test-results-report.json";

/// File name of the test-plan mapping.
pub const TEST_PLAN_FILE: &str = "test-plan-suite.json";

/// Resolved locations used by the reporting pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportPaths {
    root: Utf8PathBuf,
    staging_override: Option<Utf8PathBuf>,
}

impl ReportPaths {
    /// Creates paths rooted at `root`, with no staging override.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            staging_override: None,
        }
    }

    /// Creates paths rooted at the current directory, honoring
    /// [`TEMP_NETWORK_DATA_DIR_ENV`].
    pub fn from_current_dir() -> Result<Self, ReportPathsError> {
        let cwd = std::env::current_dir().map_err(ReportPathsError::CurrentDir)?;
        let root =
            Utf8PathBuf::from_path_buf(cwd).map_err(|path| ReportPathsError::NonUtf8 { path })?;
        let staging_override = std::env::var(TEMP_NETWORK_DATA_DIR_ENV)
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(Utf8PathBuf::from);
        Ok(Self {
            root,
            staging_override,
        })
    }

    /// Overrides the staging directory.
    pub fn with_staging_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.staging_override = Some(dir.into());
        self
    }

    /// The root directory.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The directory the CSV report is written to.
    pub fn reports_dir(&self) -> Utf8PathBuf {
        self.root.join(NETWORK_REPORTS_DIR)
    }

    /// The staging directory for per-test network data.
    pub fn staging_dir(&self) -> Utf8PathBuf {
        match &self.staging_override {
            Some(dir) => dir.clone(),
            None => self.reports_dir().join(TEMP_NETWORK_DATA_DIR),
        }
    }

    /// The path of the reconciled test results report.
    pub fn test_results_report(&self) -> Utf8PathBuf {
        self.root
            .join(CUSTOM_REPORTER_DIR)
            .join(TEST_RESULTS_REPORT_FILE)
    }

    /// The path of the test-plan mapping file.
    pub fn test_plan(&self) -> Utf8PathBuf {
        self.root.join(CUSTOM_REPORTER_DIR).join(TEST_PLAN_FILE)
    }

    /// The directory holding generated test data files.
    pub fn test_files_dir(&self) -> Utf8PathBuf {
        self.root.join("test-data").join("files")
    }
}
