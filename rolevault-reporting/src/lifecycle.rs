// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Global setup and teardown for a run.

use crate::{
    network::{AggregateOutcome, NetworkAggregator, NetworkMonitor, StagingDir, TestIdentity},
    paths::ReportPaths,
    run_mode::RunMode,
};
use tracing::info;

/// Hooks run once per invocation of the suite, before the first test and
/// after the last.
#[derive(Clone, Debug)]
pub struct GlobalHooks {
    paths: ReportPaths,
    run_mode: RunMode,
}

impl GlobalHooks {
    /// Runs global setup.
    ///
    /// Detects the run mode from `args` and the process environment, installs
    /// it process-wide and removes staging data left over from an earlier run.
    /// Pass [`RunMode::worker_env`] on to the worker processes so they observe
    /// the same mode.
    pub fn global_setup<I, S>(paths: ReportPaths, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let detected = RunMode::detect(args, |name| std::env::var(name).ok());
        Self::setup_with_mode(paths, detected.install())
    }

    /// Runs global setup with an already detected mode, without installing it
    /// process-wide.
    pub fn setup_with_mode(paths: ReportPaths, run_mode: RunMode) -> Self {
        info!(
            sharded = run_mode.is_sharded(),
            headed = run_mode.headed,
            "global setup"
        );

        let hooks = Self { paths, run_mode };
        if hooks.aggregator().clean_up_temp_network_data().is_some() {
            info!("cleaned up temporary files");
        }
        hooks
    }

    /// Hooks for a worker process, which does not run global setup itself.
    ///
    /// Uses the mode installed by global setup if it ran in this process, and
    /// otherwise the mode exported through [`RunMode::worker_env`]. Nothing is
    /// cleaned up.
    pub fn for_worker(paths: ReportPaths) -> Self {
        Self {
            paths,
            run_mode: RunMode::current(),
        }
    }

    /// The detected run mode.
    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    /// The resolved paths.
    pub fn paths(&self) -> &ReportPaths {
        &self.paths
    }

    /// Starts network monitoring for a test.
    pub fn network_monitor(&self, identity: TestIdentity) -> NetworkMonitor {
        NetworkMonitor::setup(identity, StagingDir::new(self.paths.staging_dir()))
    }

    /// Runs global teardown: merges staged network data into the CSV report.
    pub fn global_teardown(&self) -> AggregateOutcome {
        self.aggregator().generate_network_report_csv()
    }

    fn aggregator(&self) -> NetworkAggregator {
        NetworkAggregator::new(&self.paths, self.run_mode)
    }
}
