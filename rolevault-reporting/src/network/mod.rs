// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Network traffic monitoring.
//!
//! Each test gets a [`NetworkMonitor`] whose [`RequestRecorder`] receives the
//! page's request events. At test end the records are written to a
//! [`StagingDir`] shared by all worker processes, one file per test
//! execution. Once the whole run has finished, [`NetworkAggregator`] merges
//! the staged files into a single CSV report.

mod aggregator;
mod csv;
mod monitor;
mod record;
mod recorder;
mod staging;

pub use aggregator::*;
pub use csv::{parse_csv, records_to_csv, rows_to_csv};
pub use monitor::*;
pub use record::*;
pub use recorder::{ObservedRequest, ObservedResponse, RequestRecorder, RequestTiming};
pub use staging::*;
