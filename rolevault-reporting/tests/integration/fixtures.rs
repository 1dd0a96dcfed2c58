// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use rolevault_reporting::{
    errors::ObservationError,
    network::{AttachmentSink, ObservedRequest, ObservedResponse, RequestTiming},
};
use std::convert::Infallible;

#[derive(Clone, Debug)]
pub(crate) struct PageRequest {
    method: &'static str,
    url: String,
    status: Option<u16>,
    elapsed_ms: f64,
}

impl PageRequest {
    pub(crate) fn finished(method: &'static str, url: &str, status: u16, elapsed_ms: f64) -> Self {
        Self {
            method,
            url: url.to_owned(),
            status: Some(status),
            elapsed_ms,
        }
    }

    pub(crate) fn failed(method: &'static str, url: &str) -> Self {
        Self {
            method,
            url: url.to_owned(),
            status: None,
            elapsed_ms: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct PageResponse {
    url: String,
    status: u16,
}

impl ObservedRequest for PageRequest {
    type Response = PageResponse;

    fn method(&self) -> &str {
        self.method
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn timing(&self) -> Result<RequestTiming, ObservationError> {
        Ok(RequestTiming {
            request_start: 100.0,
            response_end: 100.0 + self.elapsed_ms,
        })
    }

    fn response(&self) -> Result<Option<PageResponse>, ObservationError> {
        Ok(self.status.map(|status| PageResponse {
            url: self.url.clone(),
            status,
        }))
    }
}

impl ObservedResponse for PageResponse {
    fn url(&self) -> &str {
        &self.url
    }

    fn status(&self) -> u16 {
        self.status
    }
}

/// Collects attachments the way the host's test result would.
#[derive(Debug, Default)]
pub(crate) struct TestResultAttachments {
    pub(crate) attachments: Vec<(String, Vec<u8>)>,
}

impl AttachmentSink for TestResultAttachments {
    type Error = Infallible;

    fn attach(&mut self, name: &str, _content_type: &str, body: &[u8]) -> Result<(), Infallible> {
        self.attachments.push((name.to_owned(), body.to_vec()));
        Ok(())
    }
}
