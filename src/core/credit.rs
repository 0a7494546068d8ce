//! Credit business logic - Creating, reading, editing and deleting credits.
//!
//! Listing functions are scoped by admin. Id-keyed functions trust the caller
//! to have checked that the admin may access the id. Every write goes through
//! [`save_credit`], which only succeeds if nobody else wrote the credit since
//! it was read.

use crate::{
    core::{ledger, schedule},
    entities::{Credit, Payment, credit, payment},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};

/// Input for issuing a new credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredit {
    /// Issuing admin
    pub admin_id: i64,
    /// Client identity card number
    pub client_card_id: i64,
    /// Client full name
    pub client_name: String,
    /// Client phone
    pub client_phone: String,
    /// Financed product
    pub product_name: String,
    /// Principal
    pub initial_amount: i64,
    /// Whole percentage
    pub interest_rate: i64,
    /// Agreed number of payments
    pub num_payments: Option<i32>,
    /// Origination timestamp, defaults to now
    pub start_date: Option<DateTime<Utc>>,
}

/// Fields an admin may change on an existing credit. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreditPatch {
    /// New client card number
    pub client_card_id: Option<i64>,
    /// New client name
    pub client_name: Option<String>,
    /// New client phone
    pub client_phone: Option<String>,
    /// New product name
    pub product_name: Option<String>,
    /// New principal
    pub initial_amount: Option<i64>,
    /// New interest rate
    pub interest_rate: Option<i64>,
    /// New number of payments
    pub num_payments: Option<i32>,
}

fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            message: format!("{field} cannot be empty"),
        });
    }
    Ok(trimmed.to_string())
}

/// Issues a new credit.
///
/// The balance starts at `initial + initial * rate / 100` and the first
/// payment falls one month after the start date.
///
/// # Errors
/// `Validation` for empty names or a negative rate, `InvalidAmount` for a
/// non-positive principal, `Database` if the insert fails.
#[instrument(skip(db, new_credit), fields(admin_id = new_credit.admin_id))]
pub async fn create_credit(db: &DatabaseConnection, new_credit: NewCredit) -> Result<credit::Model> {
    let client_name = required_text("Client name", &new_credit.client_name)?;
    let product_name = required_text("Product name", &new_credit.product_name)?;
    let total_amount =
        ledger::origination_total(new_credit.initial_amount, new_credit.interest_rate)?;

    let now = Utc::now();
    let start = new_credit.start_date.unwrap_or(now);
    let next_payment = schedule::next_payment_timestamp(start);

    let model = credit::ActiveModel {
        admin_id: Set(new_credit.admin_id),
        client_card_id: Set(new_credit.client_card_id),
        client_name: Set(client_name),
        client_phone: Set(new_credit.client_phone.trim().to_string()),
        product_name: Set(product_name),
        initial_amount: Set(new_credit.initial_amount),
        interest_rate: Set(new_credit.interest_rate),
        total_amount: Set(total_amount),
        interest_amount: Set(0),
        start_date: Set(Some(start.timestamp())),
        next_payment_date: Set(Some(next_payment.timestamp())),
        num_payments: Set(new_credit.num_payments),
        modified_date: Set(now.timestamp()),
        last_accrual_date: Set(None),
        version: Set(0),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    info!(
        "Created credit {} for {} with balance {}",
        created.id, created.client_name, created.total_amount
    );
    Ok(created)
}

/// All credits issued by an admin, oldest first.
pub async fn fetch_credits(db: &DatabaseConnection, admin_id: i64) -> Result<Vec<credit::Model>> {
    Credit::find()
        .filter(credit::Column::AdminId.eq(admin_id))
        .order_by_asc(credit::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a credit by id, `None` if it does not exist.
pub async fn fetch_credit_by_id<C>(db: &C, credit_id: i64) -> Result<Option<credit::Model>>
where
    C: ConnectionTrait,
{
    Credit::find_by_id(credit_id)
        .one(db)
        .await
        .map_err(Into::into)
}

pub(crate) async fn require_credit<C>(db: &C, credit_id: i64) -> Result<credit::Model>
where
    C: ConnectionTrait,
{
    fetch_credit_by_id(db, credit_id)
        .await?
        .ok_or(Error::CreditNotFound { id: credit_id })
}

/// Credits that still have a scheduled payment (active and due), soonest due first.
pub async fn fetch_active_credits(
    db: &DatabaseConnection,
    admin_id: i64,
) -> Result<Vec<credit::Model>> {
    Credit::find()
        .filter(credit::Column::AdminId.eq(admin_id))
        .filter(credit::Column::NextPaymentDate.is_not_null())
        .order_by_asc(credit::Column::NextPaymentDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Open credits whose next payment date is before `now`, most overdue first.
pub async fn fetch_credits_due(
    db: &DatabaseConnection,
    admin_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<credit::Model>> {
    Credit::find()
        .filter(credit::Column::AdminId.eq(admin_id))
        .filter(credit::Column::NextPaymentDate.is_not_null())
        .filter(credit::Column::NextPaymentDate.lt(now.timestamp()))
        .order_by_asc(credit::Column::NextPaymentDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Paid-off credits, most recently closed first.
pub async fn fetch_completed_credits(
    db: &DatabaseConnection,
    admin_id: i64,
) -> Result<Vec<credit::Model>> {
    Credit::find()
        .filter(credit::Column::AdminId.eq(admin_id))
        .filter(credit::Column::NextPaymentDate.is_null())
        .order_by_desc(credit::Column::ModifiedDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies a patch to a credit.
///
/// Changing the principal or the rate recomputes the origination total and
/// shifts the outstanding balance by the difference, so payments already
/// recorded keep their effect.
///
/// # Errors
/// `CreditNotFound`, `Validation`/`InvalidAmount` for bad fields or a
/// resulting negative balance, `ConcurrentModification` if the credit changed
/// while editing.
#[instrument(skip(db, patch))]
pub async fn edit_credit(
    db: &DatabaseConnection,
    credit_id: i64,
    patch: CreditPatch,
) -> Result<credit::Model> {
    let txn = db.begin().await?;
    let current = require_credit(&txn, credit_id).await?;
    let mut updated = current.clone();

    if let Some(card_id) = patch.client_card_id {
        updated.client_card_id = card_id;
    }
    if let Some(name) = patch.client_name.as_deref() {
        updated.client_name = required_text("Client name", name)?;
    }
    if let Some(phone) = patch.client_phone.as_deref() {
        updated.client_phone = phone.trim().to_string();
    }
    if let Some(product) = patch.product_name.as_deref() {
        updated.product_name = required_text("Product name", product)?;
    }
    if patch.num_payments.is_some() {
        updated.num_payments = patch.num_payments;
    }

    if patch.initial_amount.is_some() || patch.interest_rate.is_some() {
        updated.initial_amount = patch.initial_amount.unwrap_or(current.initial_amount);
        updated.interest_rate = patch.interest_rate.unwrap_or(current.interest_rate);

        let old_total = ledger::origination_total(current.initial_amount, current.interest_rate)?;
        let new_total = ledger::origination_total(updated.initial_amount, updated.interest_rate)?;
        let shifted = current.total_amount + (new_total - old_total);
        if shifted < 0 && !current.is_completed() {
            warn!(
                "Rejected edit of credit {}: balance would become {}",
                credit_id, shifted
            );
            return Err(Error::InvalidAmount { amount: shifted });
        }
        if !current.is_completed() {
            updated.total_amount = shifted;
        }
    }

    updated.modified_date = Utc::now().timestamp();
    let saved = save_credit(&txn, current.version, &updated).await?;
    txn.commit().await?;

    info!("Edited credit {}, balance {}", saved.id, saved.total_amount);
    Ok(saved)
}

/// Deletes a credit and all its payments. Returns how many payments were removed.
///
/// # Errors
/// `CreditNotFound` if the credit does not exist.
#[instrument(skip(db))]
pub async fn delete_credit(db: &DatabaseConnection, credit_id: i64) -> Result<u64> {
    let txn = db.begin().await?;
    let credit = require_credit(&txn, credit_id).await?;

    let removed = Payment::delete_many()
        .filter(payment::Column::CreditId.eq(credit_id))
        .exec(&txn)
        .await?
        .rows_affected;
    credit.delete(&txn).await?;
    txn.commit().await?;

    info!("Deleted credit {} and {} payments", credit_id, removed);
    Ok(removed)
}

/// Writes every mutable field of `credit`, provided the stored row still has
/// `expected_version`. Returns the credit with its bumped version.
///
/// # Errors
/// `CreditNotFound` if the row is gone, `ConcurrentModification` if its
/// version moved on.
pub(crate) async fn save_credit<C>(
    db: &C,
    expected_version: i32,
    credit: &credit::Model,
) -> Result<credit::Model>
where
    C: ConnectionTrait,
{
    let next_version = expected_version + 1;
    let changes = credit::ActiveModel {
        admin_id: Set(credit.admin_id),
        client_card_id: Set(credit.client_card_id),
        client_name: Set(credit.client_name.clone()),
        client_phone: Set(credit.client_phone.clone()),
        product_name: Set(credit.product_name.clone()),
        initial_amount: Set(credit.initial_amount),
        interest_rate: Set(credit.interest_rate),
        total_amount: Set(credit.total_amount),
        interest_amount: Set(credit.interest_amount),
        start_date: Set(credit.start_date),
        next_payment_date: Set(credit.next_payment_date),
        num_payments: Set(credit.num_payments),
        modified_date: Set(credit.modified_date),
        last_accrual_date: Set(credit.last_accrual_date),
        version: Set(next_version),
        ..Default::default()
    };

    let result = Credit::update_many()
        .set(changes)
        .filter(credit::Column::Id.eq(credit.id))
        .filter(credit::Column::Version.eq(expected_version))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        require_credit(db, credit.id).await?;
        warn!(
            "Credit {} changed since version {}",
            credit.id, expected_version
        );
        return Err(Error::ConcurrentModification { id: credit.id });
    }

    let mut saved = credit.clone();
    saved.version = next_version;
    Ok(saved)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::CreditStatus;
    use crate::test_utils::*;
    use chrono::{Duration, TimeZone};
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_credit_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let mut input = test_new_credit(1);
        input.client_name = "   ".to_string();
        let result = create_credit(&db, input).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let mut input = test_new_credit(1);
        input.product_name = String::new();
        let result = create_credit(&db, input).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let mut input = test_new_credit(1);
        input.initial_amount = -10;
        let result = create_credit(&db, input).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: -10 })));

        let mut input = test_new_credit(1);
        input.interest_rate = -3;
        let result = create_credit(&db, input).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_credit_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let start = Utc.with_ymd_and_hms(2025, 1, 31, 10, 0, 0).unwrap();

        let credit = create_custom_credit(&db, 1, 1_000_000, 10, start).await?;

        assert_eq!(credit.total_amount, 1_100_000);
        assert_eq!(credit.interest_amount, 0);
        assert_eq!(credit.start_date, Some(start.timestamp()));
        assert_eq!(
            credit.next_payment_date,
            Some(Utc.with_ymd_and_hms(2025, 2, 28, 10, 0, 0).unwrap().timestamp())
        );
        assert_eq!(credit.version, 0);
        assert_eq!(credit.client_name, "Ana Perez");

        Ok(())
    }

    #[tokio::test]
    async fn test_create_credit_defaults_start_to_now() -> Result<()> {
        let db = setup_test_db().await?;
        let before = Utc::now().timestamp();
        let credit = create_test_credit(&db, 1).await?;

        let start = credit.start_date.unwrap();
        assert!(start >= before);
        assert!(credit.next_payment_date.unwrap() > start);

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_credits_scoped_by_admin() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_credit(&db, 1).await?;
        let second = create_test_credit(&db, 1).await?;
        create_test_credit(&db, 2).await?;

        let credits = fetch_credits(&db, 1).await?;
        assert_eq!(credits, vec![first.clone(), second]);

        let found = fetch_credit_by_id(&db, first.id).await?;
        assert_eq!(found, Some(first));
        assert!(fetch_credit_by_id(&db, 999).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_status_listings() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();

        let overdue = create_custom_credit(&db, 1, 500_000, 5, now - Duration::days(45)).await?;
        let current = create_custom_credit(&db, 1, 500_000, 5, now - Duration::days(3)).await?;
        let paid = create_custom_credit(&db, 1, 500_000, 5, now - Duration::days(10)).await?;
        crate::core::payment::record_full_payment(&db, paid.id).await?;
        create_custom_credit(&db, 2, 500_000, 5, now - Duration::days(45)).await?;

        let due = fetch_credits_due(&db, 1, now).await?;
        assert_eq!(due.iter().map(|c| c.id).collect::<Vec<_>>(), vec![overdue.id]);
        assert_eq!(due[0].status(now), CreditStatus::Due);

        let active = fetch_active_credits(&db, 1).await?;
        assert_eq!(
            active.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![overdue.id, current.id]
        );

        let completed = fetch_completed_credits(&db, 1).await?;
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, paid.id);
        assert_eq!(completed[0].status(now), CreditStatus::Completed);

        let still_current = fetch_credit_by_id(&db, current.id).await?.unwrap();
        assert_eq!(still_current.status(now), CreditStatus::Active);

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_credit_updates_client_fields() -> Result<()> {
        let (db, credit) = setup_with_credit().await?;

        let patch = CreditPatch {
            client_name: Some("  Ana Maria Perez ".to_string()),
            client_phone: Some("3109876543".to_string()),
            num_payments: Some(12),
            ..CreditPatch::default()
        };
        let edited = edit_credit(&db, credit.id, patch).await?;

        assert_eq!(edited.client_name, "Ana Maria Perez");
        assert_eq!(edited.client_phone, "3109876543");
        assert_eq!(edited.num_payments, Some(12));
        assert_eq!(edited.total_amount, credit.total_amount);
        assert_eq!(edited.version, credit.version + 1);

        let stored = fetch_credit_by_id(&db, credit.id).await?.unwrap();
        assert_eq!(stored, edited);

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_credit_shifts_balance_after_payments() -> Result<()> {
        let (db, credit) = setup_with_credit().await?;
        let policy = crate::config::ledger::LedgerPolicy::default();
        crate::core::payment::record_capital_payment(&db, &policy, credit.id, 200_000, 0).await?;

        let patch = CreditPatch {
            initial_amount: Some(2_000_000),
            ..CreditPatch::default()
        };
        let edited = edit_credit(&db, credit.id, patch).await?;

        // origination total 1_100_000 -> 2_200_000, 200_000 already paid
        assert_eq!(edited.initial_amount, 2_000_000);
        assert_eq!(edited.total_amount, 2_000_000);

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_credit_rejects_negative_balance() -> Result<()> {
        let (db, credit) = setup_with_credit().await?;
        let policy = crate::config::ledger::LedgerPolicy::default();
        crate::core::payment::record_capital_payment(&db, &policy, credit.id, 1_000_000, 0)
            .await?;

        let patch = CreditPatch {
            initial_amount: Some(100_000),
            interest_rate: Some(0),
            ..CreditPatch::default()
        };
        let result = edit_credit(&db, credit.id, patch).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: -900_000 })));

        let stored = fetch_credit_by_id(&db, credit.id).await?.unwrap();
        assert_eq!(stored.total_amount, 100_000);

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_missing_credit() -> Result<()> {
        let db = setup_test_db().await?;
        let result = edit_credit(&db, 42, CreditPatch::default()).await;
        assert!(matches!(result, Err(Error::CreditNotFound { id: 42 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_credit_cascades_payments() -> Result<()> {
        let (db, credit) = setup_with_credit().await?;
        let other = create_test_credit(&db, 1).await?;
        let policy = crate::config::ledger::LedgerPolicy::default();
        crate::core::payment::record_capital_payment(&db, &policy, credit.id, 100_000, 0).await?;
        crate::core::payment::record_capital_payment(&db, &policy, credit.id, 100_000, 0).await?;
        crate::core::payment::record_capital_payment(&db, &policy, other.id, 100_000, 0).await?;

        let removed = delete_credit(&db, credit.id).await?;
        assert_eq!(removed, 2);
        assert!(fetch_credit_by_id(&db, credit.id).await?.is_none());

        let remaining = crate::core::payment::fetch_payments(&db, 1).await?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].credit_id, other.id);

        let result = delete_credit(&db, credit.id).await;
        assert!(matches!(result, Err(Error::CreditNotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_save_credit_detects_stale_version() -> Result<()> {
        let (db, credit) = setup_with_credit().await?;

        let mut first = credit.clone();
        first.total_amount -= 100;
        save_credit(&db, credit.version, &first).await?;

        let mut stale = credit.clone();
        stale.total_amount -= 200;
        let result = save_credit(&db, credit.version, &stale).await;
        assert!(matches!(result, Err(Error::ConcurrentModification { .. })));

        let stored = fetch_credit_by_id(&db, credit.id).await?.unwrap();
        assert_eq!(stored.total_amount, credit.total_amount - 100);
        assert_eq!(stored.version, credit.version + 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_save_credit_missing_row() -> Result<()> {
        let (db, credit) = setup_with_credit().await?;
        let mut ghost = credit.clone();
        ghost.id = 999;
        let result = save_credit(&db, 0, &ghost).await;
        assert!(matches!(result, Err(Error::CreditNotFound { id: 999 })));
        Ok(())
    }
}
