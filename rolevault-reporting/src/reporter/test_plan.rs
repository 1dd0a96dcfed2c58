// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::TestPlanReadError;
use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// The identifier of a test case in the external test-management system.
///
/// The mapping file may spell ids as strings or as numbers. Numbers are
/// normalized to their decimal representation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TestCaseId(String);

impl TestCaseId {
    /// Creates a new id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TestCaseId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            String(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::String(s) => Self(s),
            Repr::Unsigned(n) => Self(n.to_string()),
            Repr::Signed(n) => Self(n.to_string()),
        })
    }
}

/// An entry in [`TestPlan::test_cases`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseEntry {
    /// The test case's id.
    pub test_case_id: TestCaseId,
}

/// Maps test titles to test-plan identifiers.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPlan {
    /// The name of the test plan.
    pub test_plan_name: String,

    /// The name of the suite within the plan.
    pub test_suite_name: String,

    /// Test cases keyed by test title.
    pub test_cases: IndexMap<String, TestCaseEntry>,
}

impl TestPlan {
    /// Reads a test plan from a JSON file.
    pub fn from_path(path: &Utf8Path) -> Result<Self, TestPlanReadError> {
        let contents =
            std::fs::read_to_string(path).map_err(|error| TestPlanReadError::Read {
                path: path.to_owned(),
                error,
            })?;
        serde_json::from_str(&contents).map_err(|error| TestPlanReadError::Parse {
            path: path.to_owned(),
            error,
        })
    }

    /// Looks up the test-case id for a test title.
    pub fn test_case_id(&self, title: &str) -> Option<&TestCaseId> {
        self.test_cases.get(title).map(|entry| &entry.test_case_id)
    }
}
