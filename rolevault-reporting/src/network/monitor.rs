// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    record::{HttpRequestRecord, TestIdentity},
    recorder::RequestRecorder,
    staging::StagingDir,
};
use crate::errors::DisplayErrorChain;
use camino::Utf8PathBuf;
use std::error::Error;
use tracing::warn;

/// Name of the per-test attachment holding the test's network records.
pub const NETWORK_ATTACHMENT_NAME: &str = "Network Requests JSON Report";

/// Content type of the per-test attachment.
pub const NETWORK_ATTACHMENT_CONTENT_TYPE: &str = "application/json";

/// Somewhere to attach artifacts to a test result, provided by the host test
/// runner.
pub trait AttachmentSink {
    /// The error returned when attaching fails.
    type Error: Error;

    /// Attaches `body` to the current test result.
    fn attach(&mut self, name: &str, content_type: &str, body: &[u8]) -> Result<(), Self::Error>;
}

/// Network monitoring for one test.
///
/// Created when the test starts. Hand clones of [`Self::recorder`] to the
/// page's request event callbacks, and call [`Self::attach_report`] once the
/// test body has finished.
#[derive(Clone, Debug)]
pub struct NetworkMonitor {
    recorder: RequestRecorder,
    staging: StagingDir,
}

impl NetworkMonitor {
    /// Sets up monitoring for a test.
    pub fn setup(identity: TestIdentity, staging: StagingDir) -> Self {
        Self {
            recorder: RequestRecorder::new(identity),
            staging,
        }
    }

    /// The recorder to feed request events into.
    pub fn recorder(&self) -> &RequestRecorder {
        &self.recorder
    }

    /// Returns the records captured so far.
    pub fn network_data(&self) -> Vec<HttpRequestRecord> {
        self.recorder.network_data()
    }

    /// Writes the captured records to the staging directory and attaches them
    /// to the test result.
    ///
    /// Returns the staging file path if the write succeeded. Neither a failed
    /// write nor a failed attachment fails the test; both are logged. Nothing
    /// is attached if the write failed.
    pub fn attach_report<S: AttachmentSink>(&self, sink: &mut S) -> Option<Utf8PathBuf> {
        let records = self.recorder.network_data();
        let batch = match self.staging.write_batch(self.recorder.identity(), &records) {
            Ok(batch) => batch,
            Err(err) => {
                warn!(
                    "error saving test network data: {}",
                    DisplayErrorChain::new(&err)
                );
                return None;
            }
        };

        if let Err(err) = sink.attach(
            NETWORK_ATTACHMENT_NAME,
            NETWORK_ATTACHMENT_CONTENT_TYPE,
            batch.json.as_bytes(),
        ) {
            warn!(
                "error attaching network data for `{}`: {}",
                self.recorder.identity().test_title,
                DisplayErrorChain::new(&err)
            );
        }
        Some(batch.path)
    }
}
