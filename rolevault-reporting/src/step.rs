// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named steps for page-object actions.
//!
//! A step is a `tracing` span named `step` with a `name` field. Steps nest:
//! a step started inside another step's closure or future becomes its child,
//! so the log shows which high-level action a low-level failure happened in.

use std::{borrow::Cow, fmt, future::Future, time::Instant};
use tracing::{Instrument, debug, debug_span, warn};

/// The name of a step.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StepName(Cow<'static, str>);

impl StepName {
    /// Creates a step name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The default name for a step wrapping a method: `<Type>.<method>`.
    ///
    /// Module paths and generic parameters are dropped from the type name.
    pub fn for_method<T: ?Sized>(method: &str) -> Self {
        let type_name = std::any::type_name::<T>();
        let without_generics = type_name
            .split_once('<')
            .map_or(type_name, |(base, _)| base);
        let short = without_generics
            .rsplit("::")
            .next()
            .unwrap_or(without_generics);
        Self(Cow::Owned(format!("{short}.{method}")))
    }

    /// The name as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for StepName {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for StepName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// Runs `f` as a named step.
pub fn step<T>(name: impl Into<StepName>, f: impl FnOnce() -> T) -> T {
    let name = name.into();
    let span = debug_span!("step", name = %name);
    let _enter = span.enter();

    debug!("step started");
    let start = Instant::now();
    let ret = f();
    debug!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "step finished"
    );
    ret
}

/// Runs a fallible `f` as a named step, logging the error if it fails.
pub fn try_step<T, E: fmt::Display>(
    name: impl Into<StepName>,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, E> {
    step(name, || {
        let start = Instant::now();
        f().inspect_err(|error| log_failure(start, error))
    })
}

/// Runs `fut` as a named step.
pub async fn step_async<F: Future>(name: impl Into<StepName>, fut: F) -> F::Output {
    let name = name.into();
    let span = debug_span!("step", name = %name);
    async move {
        debug!("step started");
        let start = Instant::now();
        let ret = fut.await;
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "step finished"
        );
        ret
    }
    .instrument(span)
    .await
}

/// Runs a fallible `fut` as a named step, logging the error if it fails.
pub async fn try_step_async<T, E, F>(name: impl Into<StepName>, fut: F) -> Result<T, E>
where
    E: fmt::Display,
    F: Future<Output = Result<T, E>>,
{
    step_async(name, async move {
        let start = Instant::now();
        fut.await.inspect_err(|error| log_failure(start, error))
    })
    .await
}

fn log_failure(start: Instant, error: &impl fmt::Display) {
    warn!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "step failed: {error}"
    );
}
