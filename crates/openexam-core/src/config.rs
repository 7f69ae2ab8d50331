//! Configuration module
//!
//! Client configuration is read from the environment (optionally seeded from a
//! `.env` file). Every tuning knob has a default matching the hosted backend.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::constants::{
    DEFAULT_GENERATE_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_REFRESH_DEBOUNCE,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_TOMBSTONE_GRACE,
};

const DEFAULT_API_URL: &str = "http://localhost:3001";

/// What to do with optimistic local state when the request behind it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Leave the optimistic state in place and only report the failure.
    KeepOptimistic,
    /// Revert the optimistic state to what it was before the action.
    Rollback,
}

impl FromStr for RecoveryPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" | "keep_optimistic" => Ok(RecoveryPolicy::KeepOptimistic),
            "rollback" | "restore" => Ok(RecoveryPolicy::Rollback),
            other => bail!("Unknown recovery policy '{}', expected 'keep' or 'rollback'", other),
        }
    }
}

impl fmt::Display for RecoveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryPolicy::KeepOptimistic => f.write_str("keep"),
            RecoveryPolicy::Rollback => f.write_str("rollback"),
        }
    }
}

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    /// Bearer token issued by the OAuth backend
    pub access_token: Option<String>,
    /// Numeric id of the signed-in user (used for share validation)
    pub user_id: Option<String>,
    pub request_timeout: Duration,
    pub generate_timeout: Duration,
    pub refresh_debounce: Duration,
    pub tombstone_grace: Duration,
    pub poll_interval: Duration,
    /// Deletes favor responsiveness: the file stays hidden on failure.
    pub delete_recovery: RecoveryPolicy,
    /// Shares favor correctness: the roster is reverted on failure.
    pub share_recovery: RecoveryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            access_token: None,
            user_id: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            generate_timeout: DEFAULT_GENERATE_TIMEOUT,
            refresh_debounce: DEFAULT_REFRESH_DEBOUNCE,
            tombstone_grace: DEFAULT_TOMBSTONE_GRACE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            delete_recovery: RecoveryPolicy::KeepOptimistic,
            share_recovery: RecoveryPolicy::Rollback,
        }
    }
}

fn parse_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> anyhow::Result<Option<u64>> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, raw))
        })
        .transpose()
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let api_url = lookup("OPENEXAM_API_URL")
            .or_else(|| lookup("BACKEND_URL"))
            .unwrap_or(defaults.api_url)
            .trim_end_matches('/')
            .to_string();

        let secs = |key: &str, default: Duration| -> anyhow::Result<Duration> {
            Ok(parse_u64(&lookup, key)?
                .map(Duration::from_secs)
                .unwrap_or(default))
        };

        let refresh_debounce = parse_u64(&lookup, "OPENEXAM_REFRESH_DEBOUNCE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.refresh_debounce);

        let delete_recovery = lookup("OPENEXAM_DELETE_RECOVERY")
            .map(|raw| raw.parse::<RecoveryPolicy>())
            .transpose()
            .context("Invalid OPENEXAM_DELETE_RECOVERY")?
            .unwrap_or(defaults.delete_recovery);

        let share_recovery = lookup("OPENEXAM_SHARE_RECOVERY")
            .map(|raw| raw.parse::<RecoveryPolicy>())
            .transpose()
            .context("Invalid OPENEXAM_SHARE_RECOVERY")?
            .unwrap_or(defaults.share_recovery);

        let config = Self {
            api_url,
            access_token: lookup("OPENEXAM_ACCESS_TOKEN").filter(|t| !t.trim().is_empty()),
            user_id: lookup("OPENEXAM_USER_ID").filter(|u| !u.trim().is_empty()),
            request_timeout: secs("OPENEXAM_REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
            generate_timeout: secs("OPENEXAM_GENERATE_TIMEOUT_SECS", defaults.generate_timeout)?,
            refresh_debounce,
            tombstone_grace: secs("OPENEXAM_TOMBSTONE_GRACE_SECS", defaults.tombstone_grace)?,
            poll_interval: secs("OPENEXAM_POLL_INTERVAL_SECS", defaults.poll_interval)?,
            delete_recovery,
            share_recovery,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let parsed = url::Url::parse(&self.api_url)
            .with_context(|| format!("OPENEXAM_API_URL is not a valid URL: {}", self.api_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("OPENEXAM_API_URL must use http or https, got {}", parsed.scheme());
        }
        if self.request_timeout.is_zero() {
            bail!("OPENEXAM_REQUEST_TIMEOUT_SECS must be greater than 0");
        }
        if self.generate_timeout.is_zero() {
            bail!("OPENEXAM_GENERATE_TIMEOUT_SECS must be greater than 0");
        }
        if self.poll_interval.is_zero() {
            bail!("OPENEXAM_POLL_INTERVAL_SECS must be greater than 0");
        }
        if self.tombstone_grace.is_zero() {
            bail!("OPENEXAM_TOMBSTONE_GRACE_SECS must be greater than 0");
        }
        if self.refresh_debounce.is_zero() {
            bail!("OPENEXAM_REFRESH_DEBOUNCE_MS must be greater than 0");
        }
        if let Some(ref user_id) = self.user_id {
            if !user_id.chars().all(|c| c.is_ascii_digit()) {
                bail!("OPENEXAM_USER_ID must contain only numbers");
            }
        }
        Ok(())
    }

    /// Current user id, required by share operations.
    pub fn require_user_id(&self) -> anyhow::Result<&str> {
        self.user_id
            .as_deref()
            .context("Missing user id. Set OPENEXAM_USER_ID")
    }
}
