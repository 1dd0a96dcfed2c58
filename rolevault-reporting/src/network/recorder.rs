// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-test capture of network requests.

use super::record::{FAILED_REQUEST_STATUS, HttpRequestRecord, TestIdentity};
use crate::errors::{DisplayErrorChain, ObservationError};
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Timing marks for a request, in milliseconds relative to the request's
/// start time.
///
/// The automation layer reports `-1` for marks that are not available.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RequestTiming {
    /// When the request started being sent.
    pub request_start: f64,

    /// When the last byte of the response arrived.
    pub response_end: f64,
}

impl RequestTiming {
    /// Returns the response time, rounded to the nearest millisecond.
    ///
    /// Negative or non-finite deltas (unavailable marks, or marks reported out
    /// of order) are clamped to zero.
    pub fn response_time_ms(&self) -> u64 {
        let delta = (self.response_end - self.request_start).round();
        if delta.is_finite() && delta >= 0.0 {
            delta as u64
        } else {
            debug!(
                request_start = self.request_start,
                response_end = self.response_end,
                "clamping invalid response time to 0"
            );
            0
        }
    }
}

/// A network request observed on a browser page.
///
/// Implemented by the glue between the browser automation library and this
/// crate.
pub trait ObservedRequest {
    /// The response type.
    type Response: ObservedResponse;

    /// The HTTP method.
    fn method(&self) -> &str;

    /// The request URL.
    fn url(&self) -> &str;

    /// Timing marks for the request.
    fn timing(&self) -> Result<RequestTiming, ObservationError>;

    /// The resolved response. `Ok(None)` if the page navigated away before a
    /// response was received.
    fn response(&self) -> Result<Option<Self::Response>, ObservationError>;
}

/// A response to an [`ObservedRequest`].
pub trait ObservedResponse {
    /// The response URL. May differ from the request URL after redirects.
    fn url(&self) -> &str;

    /// The HTTP status code.
    fn status(&self) -> u16;
}

/// Records the requests made by one test.
///
/// Cloning is cheap and clones share the same record list, so a clone can be
/// moved into each event callback. Records are appended in the order events
/// are delivered.
#[derive(Clone, Debug)]
pub struct RequestRecorder {
    identity: Arc<TestIdentity>,
    records: Arc<Mutex<Vec<HttpRequestRecord>>>,
}

impl RequestRecorder {
    /// Creates a recorder for the given test.
    pub fn new(identity: TestIdentity) -> Self {
        Self {
            identity: Arc::new(identity),
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The test this recorder belongs to.
    pub fn identity(&self) -> &TestIdentity {
        &self.identity
    }

    /// Handles a request that finished loading.
    ///
    /// Returns true if a record was added. Failures reading the request are
    /// logged and the request is skipped.
    pub fn on_request_finished<R: ObservedRequest>(&self, request: &R) -> bool {
        self.on_request_finished_at(request, Utc::now())
    }

    /// Handles a request that failed before a response arrived.
    ///
    /// Returns true if a record was added.
    pub fn on_request_failed<R: ObservedRequest>(&self, request: &R) -> bool {
        self.on_request_failed_at(request, Utc::now())
    }

    pub(crate) fn on_request_finished_at<R: ObservedRequest>(
        &self,
        request: &R,
        now: DateTime<Utc>,
    ) -> bool {
        let record = request.response().and_then(|response| {
            let Some(response) = response else {
                return Ok(None);
            };
            let timing = request.timing()?;
            Ok(Some(self.make_record(
                now,
                request.method(),
                response.url(),
                response.status(),
                timing,
            )))
        });
        self.push_observed(request.url(), record)
    }

    pub(crate) fn on_request_failed_at<R: ObservedRequest>(
        &self,
        request: &R,
        now: DateTime<Utc>,
    ) -> bool {
        let record = request.timing().map(|timing| {
            Some(self.make_record(
                now,
                request.method(),
                request.url(),
                FAILED_REQUEST_STATUS,
                timing,
            ))
        });
        self.push_observed(request.url(), record)
    }

    /// Returns a snapshot of the records so far, in arrival order.
    pub fn network_data(&self) -> Vec<HttpRequestRecord> {
        self.lock().clone()
    }

    /// Returns the number of records so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn make_record(
        &self,
        now: DateTime<Utc>,
        method: &str,
        url: &str,
        status_code: u16,
        timing: RequestTiming,
    ) -> HttpRequestRecord {
        let identity = &*self.identity;
        HttpRequestRecord {
            // Staging files keep milliseconds, so records do too.
            timestamp: now.trunc_subsecs(3),
            project_name: identity.project_name.clone(),
            test_file: identity.test_file.clone(),
            test_suite: identity.test_suite.clone(),
            test_title: identity.test_title.clone(),
            method: method.to_owned(),
            url: url.to_owned(),
            status_code,
            response_time_in_ms: timing.response_time_ms(),
        }
    }

    fn push_observed(
        &self,
        url: &str,
        record: Result<Option<HttpRequestRecord>, ObservationError>,
    ) -> bool {
        match record {
            Ok(Some(record)) => {
                self.lock().push(record);
                true
            }
            Ok(None) => {
                debug!("no response for `{url}`, not recording it");
                false
            }
            Err(error) => {
                warn!(
                    "error collecting network data: {}",
                    DisplayErrorChain::new(&error)
                );
                false
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<HttpRequestRecord>> {
        // A panic in another callback must not stop this test's recording.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
