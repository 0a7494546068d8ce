/// Database configuration and connection management
pub mod database;

/// Ledger policies and invoice header from config.toml
pub mod ledger;

/// Scheduler secret and listener address from environment variables
pub mod scheduler;

use crate::errors::Result;
use tracing::info;

/// Everything the binary needs at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Ledger policies and business info
    pub ledger: ledger::Config,
    /// Trigger endpoint settings
    pub scheduler: scheduler::SchedulerConfig,
}

/// Loads the ledger file and the environment settings.
///
/// Expects `.env` to have been loaded already.
pub fn load_app_configuration() -> Result<AppConfig> {
    let ledger = ledger::load_default_config()?;
    let scheduler = scheduler::SchedulerConfig::from_env();
    info!(
        "Configuration loaded: overpayment={:?}, interest_payment={:?}, bind={}",
        ledger.ledger.overpayment, ledger.ledger.interest_payment, scheduler.bind_address
    );
    Ok(AppConfig { ledger, scheduler })
}
