//! Shared test utilities for the credit ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test credits with sensible defaults.

use crate::{
    core::credit::{self, NewCredit},
    entities,
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Input for a test credit.
///
/// # Defaults
/// * client: "Ana Perez", card 1020304050, phone "3001234567"
/// * product: "Refrigerator"
/// * `initial_amount`: 1,000,000 at 10% (balance 1,100,000)
/// * `start_date`: now
#[must_use]
pub fn test_new_credit(admin_id: i64) -> NewCredit {
    NewCredit {
        admin_id,
        client_card_id: 1_020_304_050,
        client_name: "Ana Perez".to_string(),
        client_phone: "3001234567".to_string(),
        product_name: "Refrigerator".to_string(),
        initial_amount: 1_000_000,
        interest_rate: 10,
        num_payments: None,
        start_date: None,
    }
}

/// Creates a test credit with the defaults of [`test_new_credit`].
pub async fn create_test_credit(
    db: &DatabaseConnection,
    admin_id: i64,
) -> Result<entities::credit::Model> {
    credit::create_credit(db, test_new_credit(admin_id)).await
}

/// Creates a test credit with custom amounts and start date.
pub async fn create_custom_credit(
    db: &DatabaseConnection,
    admin_id: i64,
    initial_amount: i64,
    interest_rate: i64,
    start_date: DateTime<Utc>,
) -> Result<entities::credit::Model> {
    credit::create_credit(
        db,
        NewCredit {
            initial_amount,
            interest_rate,
            start_date: Some(start_date),
            ..test_new_credit(admin_id)
        },
    )
    .await
}

/// Sets up a test database with one default credit owned by admin 1.
pub async fn setup_with_credit() -> Result<(DatabaseConnection, entities::credit::Model)> {
    let db = setup_test_db().await?;
    let credit = create_test_credit(&db, 1).await?;
    Ok((db, credit))
}

/// Overwrites the accrued interest of a credit, as an accrual run would.
pub async fn set_interest(
    db: &DatabaseConnection,
    credit: entities::credit::Model,
    interest_amount: i64,
) -> Result<entities::credit::Model> {
    let version = credit.version;
    let updated = entities::credit::Model {
        interest_amount,
        ..credit
    };
    credit::save_credit(db, version, &updated).await
}
