// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Reporting support for the RoleVault end-to-end UI suite.
//!
//! The browser itself is driven by an external automation library. This crate
//! handles everything that happens around it:
//!
//! * [`network`]: per-test request capture, the staging directory shared by
//!   worker processes, and the CSV aggregator that runs once at suite end.
//! * [`reporter`]: the test-plan reporter that folds retries and multi-project
//!   runs of one logical test case into a single reconciled record.
//! * [`lifecycle`]: global setup and teardown hooks, gated on sharded runs.
//! * [`step`]: named, nested steps for page-object actions.
//! * [`test_data`]: scratch files used by upload scenarios.

pub mod errors;
pub mod helpers;
pub mod lifecycle;
pub mod network;
pub mod paths;
pub mod reporter;
pub mod run_mode;
pub mod step;
pub mod test_data;
