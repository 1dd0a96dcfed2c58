// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `rolevault-report` command.
//!
//! Global setup and teardown handle network data automatically in unsharded
//! runs. After a sharded run, or to clear out stale data by hand, use:
//!
//! * `rolevault-report merge-network`: merge staged network data into a CSV
//!   report;
//! * `rolevault-report clean-network`: remove staged network data.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
pub use output::{Color, LOG_ENV, OutputContext, StderrStyles};
