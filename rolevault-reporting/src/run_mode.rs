// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Detection of how the suite was invoked.
//!
//! The host test runner can split a run across independent invocations with
//! `--shard M/N`. In that case no single invocation sees every staging file,
//! so cleanup and aggregation are deferred to a manual step. The mode is
//! detected once in global setup and then treated as read-only.
//!
//! Worker processes inherit the environment of the process running global
//! setup, so the detected mode is also exported through environment variables
//! (see [`RunMode::worker_env`]) and read back with [`RunMode::from_env`].

use crate::errors::ShardParseError;
use std::{fmt, str::FromStr, sync::OnceLock};
use tracing::{debug, warn};

/// Environment variable set to `1` when the run is sharded.
pub const PW_SHARDED_ENV: &str = "PW_SHARDED";

/// Environment variable set to `1` when the browser runs headed.
pub const PW_HEADED_ENV: &str = "PW_HEADED";

/// Environment variable enabling the automation library's debug mode, which
/// implies a headed browser.
pub const PWDEBUG_ENV: &str = "PWDEBUG";

static CURRENT: OnceLock<RunMode> = OnceLock::new();

/// A single shard of a sharded run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShardSpec {
    /// The shard this is, counting up from 1.
    pub shard: u64,

    /// The total number of shards.
    pub total_shards: u64,
}

impl fmt::Display for ShardSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.shard, self.total_shards)
    }
}

impl FromStr for ShardSpec {
    type Err = ShardParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let Some((shard_str, total_shards_str)) = input.split_once('/') else {
            return Err(ShardParseError::new(format!(
                "expected input '{input}' to be in the format M/N"
            )));
        };

        let shard: u64 = shard_str.parse().map_err(|err| {
            ShardParseError::new(format!("failed to parse shard '{shard_str}' as u64: {err}"))
        })?;
        let total_shards: u64 = total_shards_str.parse().map_err(|err| {
            ShardParseError::new(format!(
                "failed to parse total shards '{total_shards_str}' as u64: {err}"
            ))
        })?;

        if !(1..=total_shards).contains(&shard) {
            return Err(ShardParseError::new(format!(
                "shard {shard} must be a number between 1 and total shards {total_shards}, inclusive"
            )));
        }

        Ok(Self {
            shard,
            total_shards,
        })
    }
}

/// Whether the run is split across independent invocations.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ShardMode {
    /// Every test runs in this invocation.
    #[default]
    Unsharded,

    /// This invocation runs one shard. The shard spec is `None` when the shard was
    /// signalled without a parseable `M/N` value (e.g. only through the
    /// environment).
    Sharded(Option<ShardSpec>),
}

/// How the suite was invoked.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunMode {
    /// Sharding state.
    pub shard: ShardMode,

    /// Whether the browser is presented headed. Only affects browser launch.
    pub headed: bool,
}

impl RunMode {
    /// A plain unsharded, headless run.
    pub const UNSHARDED: Self = Self {
        shard: ShardMode::Unsharded,
        headed: false,
    };

    /// Returns true if staging data must be left for a manual merge.
    pub fn is_sharded(&self) -> bool {
        matches!(self.shard, ShardMode::Sharded(_))
    }

    /// Detects the mode from command-line arguments and an environment lookup.
    ///
    /// Sharding is signalled by `--shard`, `--shard=M/N` or `--shard M/N`, or
    /// by [`PW_SHARDED_ENV`]. Headed mode is signalled by `--headed`,
    /// `PWDEBUG=1` or [`PW_HEADED_ENV`].
    pub fn detect<I, S>(args: I, env: impl Fn(&str) -> Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut shard = ShardMode::Unsharded;
        let mut headed = false;

        let mut args = args.into_iter().peekable();
        while let Some(arg) = args.next() {
            let arg = arg.as_ref();
            if arg == "--headed" {
                headed = true;
            } else if arg == "--shard" {
                let value = args
                    .next_if(|next| !next.as_ref().starts_with('-'))
                    .map(|next| next.as_ref().to_owned());
                shard = ShardMode::Sharded(value.as_deref().and_then(parse_shard_arg));
            } else if let Some(value) = arg.strip_prefix("--shard=") {
                shard = ShardMode::Sharded(parse_shard_arg(value));
            }
        }

        if shard == ShardMode::Unsharded && env_flag(&env, PW_SHARDED_ENV) {
            shard = ShardMode::Sharded(None);
        }
        if env_flag(&env, PW_HEADED_ENV) || env(PWDEBUG_ENV).as_deref() == Some("1") {
            headed = true;
        }

        Self { shard, headed }
    }

    /// Reads the mode exported by global setup, as seen by a worker process.
    pub fn from_env() -> Self {
        Self::detect(std::iter::empty::<&str>(), |name| std::env::var(name).ok())
    }

    /// Environment variables to pass to worker processes so they observe the
    /// same mode.
    pub fn worker_env(&self) -> [(&'static str, &'static str); 2] {
        let flag = |set: bool| if set { "1" } else { "0" };
        [
            (PW_SHARDED_ENV, flag(self.is_sharded())),
            (PW_HEADED_ENV, flag(self.headed)),
        ]
    }

    /// Installs this mode as the process-wide mode and returns the installed
    /// value.
    ///
    /// The first installation wins; later calls with a different mode are
    /// logged and ignored.
    pub fn install(self) -> RunMode {
        let installed = *CURRENT.get_or_init(|| self);
        if installed != self {
            warn!("run mode already set to {installed:?}, ignoring {self:?}");
        }
        installed
    }

    /// Returns the process-wide mode, falling back to the environment if global
    /// setup has not run in this process.
    pub fn current() -> RunMode {
        *CURRENT.get_or_init(|| {
            let mode = Self::from_env();
            debug!("run mode not installed, read {mode:?} from environment");
            mode
        })
    }
}

fn parse_shard_arg(value: &str) -> Option<ShardSpec> {
    match value.parse() {
        Ok(spec) => Some(spec),
        Err(error) => {
            warn!("treating run as sharded, but could not parse shard value: {error}");
            None
        }
    }
}

fn env_flag(env: &impl Fn(&str) -> Option<String>, name: &str) -> bool {
    env(name).is_some_and(|value| !value.is_empty() && value != "0")
}
