//! Scheduler and server settings loaded from environment variables.
//!
//! `CRON_SECRET` is the shared secret the external scheduler sends as a
//! bearer token. `BIND_ADDRESS` is where the trigger endpoint listens.

use crate::errors::{Error, Result};
use tracing::warn;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Settings for the scheduler trigger endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Shared secret; `None` means every trigger request is refused
    pub cron_secret: Option<String>,
    /// Socket address for the HTTP listener
    pub bind_address: String,
}

impl SchedulerConfig {
    /// Reads `CRON_SECRET` and `BIND_ADDRESS` from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let cron_secret = std::env::var("CRON_SECRET")
            .ok()
            .filter(|secret| !secret.trim().is_empty());
        if cron_secret.is_none() {
            warn!("CRON_SECRET is not set; interest accrual trigger will refuse all requests");
        }

        Self {
            cron_secret,
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string()),
        }
    }

    /// Checks an `Authorization` header value against the configured secret.
    ///
    /// # Errors
    /// `Unauthorized` unless the header is exactly `Bearer <secret>`.
    pub fn authorize(&self, authorization: Option<&str>) -> Result<()> {
        let accepted = match (&self.cron_secret, authorization) {
            (Some(secret), Some(header)) => header
                .strip_prefix("Bearer ")
                .is_some_and(|token| token == secret),
            _ => false,
        };
        if accepted {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }
}
