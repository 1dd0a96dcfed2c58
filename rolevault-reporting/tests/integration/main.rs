// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the reporting pipeline, driving it the way a suite
//! run would: global setup, per-test monitoring from several workers, then
//! global teardown.

mod fixtures;
mod pipeline;
mod reporter;
