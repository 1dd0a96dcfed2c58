// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test-plan reporter.
//!
//! The host test runner may execute one logical test case several times:
//! retries after a failure, and once per browser project. The external
//! test-management system expects exactly one result per test case, so
//! [`OutcomeReconciler`] folds every execution into a single
//! [`TestOutcomeRecord`] keyed by the case's [`TestCaseId`], keeping the
//! individual executions as iteration history.

mod events;
mod outcome;
mod reconciler;
mod test_plan;

pub use events::*;
pub use outcome::*;
pub use reconciler::*;
pub use test_plan::*;
