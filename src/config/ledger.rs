//! Ledger policy configuration loaded from config.toml
//!
//! The file is optional. A missing file yields the default policies,
//! which reject overpayments and keep accrued interest untouched by
//! interest payments.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// How a capital payment larger than the outstanding balance is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverpaymentPolicy {
    /// Refuse the payment
    #[default]
    Reject,
    /// Record only the outstanding balance, leaving it at zero
    Clamp,
    /// Accept it and let the balance go negative
    Allow,
}

/// How interest payments interact with the credit's accrued interest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestPaymentPolicy {
    /// Accrued interest is left as is; deleting an interest payment restores nothing
    #[default]
    Retain,
    /// Accrued interest is reduced by the payment; deleting the payment adds it back
    Settle,
}

/// `[ledger]` section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct LedgerPolicy {
    /// Overpayment handling
    #[serde(default)]
    pub overpayment: OverpaymentPolicy,
    /// Interest payment handling
    #[serde(default)]
    pub interest_payment: InterestPaymentPolicy,
}

/// `[business]` section, printed at the top of invoices
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BusinessInfo {
    /// Business name
    pub name: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Street address
    pub address: Option<String>,
}

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Ledger policies
    #[serde(default)]
    pub ledger: LedgerPolicy,
    /// Invoice header
    #[serde(default)]
    pub business: BusinessInfo,
}

/// Loads the ledger configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads the configuration named by `LEDGER_CONFIG` (default `./config.toml`).
///
/// A missing file is not an error; default policies are used instead.
pub fn load_default_config() -> Result<Config> {
    let path = std::env::var("LEDGER_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        info!("No ledger config at {}, using default policies", path);
        return Ok(Config::default());
    }
    debug!("Loading ledger config from {}", path);
    load_config(path)
}
