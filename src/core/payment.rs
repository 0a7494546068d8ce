//! Payment business logic - Recording and deleting payments against credits.
//!
//! Each operation reads the credit, lets [`crate::core::ledger`] compute the new
//! state, then inserts or deletes the payment row and writes the credit inside
//! one database transaction. The credit write is version-checked, so two
//! payments racing on the same credit cannot both apply to the same stale
//! balance.

use crate::{
    config::ledger::LedgerPolicy,
    core::{
        credit::{require_credit, save_credit},
        ledger::{self, LedgerEntry},
    },
    entities::{Payment, credit, payment},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// A recorded payment together with the credit it changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    /// Credit after the payment
    pub credit: credit::Model,
    /// Inserted payment row
    pub payment: payment::Model,
}

async fn record_entry<F>(db: &DatabaseConnection, credit_id: i64, apply: F) -> Result<PaymentReceipt>
where
    F: FnOnce(&credit::Model) -> Result<LedgerEntry>,
{
    let txn = db.begin().await?;
    let credit = require_credit(&txn, credit_id).await?;
    let entry = apply(&credit)?;

    let payment = entry.payment.into_active_model().insert(&txn).await?;
    let credit = save_credit(&txn, credit.version, &entry.credit).await?;
    txn.commit().await?;

    info!(
        "Recorded {} payment {} of {} on credit {}; balance {}, interest {}",
        payment.payment_type,
        payment.id,
        payment.amount_paid,
        credit.id,
        credit.total_amount,
        credit.interest_amount
    );
    Ok(PaymentReceipt { credit, payment })
}

/// Records a capital payment and lowers the credit's balance.
///
/// `new_interest_amount` replaces the accrued interest, typically the interest
/// left after the part of `amount` that covered it.
///
/// # Errors
/// `CreditNotFound`, `CreditCompleted`, `InvalidAmount`, `Overpayment`
/// (reject policy) or `ConcurrentModification`.
#[instrument(skip(db, policy))]
pub async fn record_capital_payment(
    db: &DatabaseConnection,
    policy: &LedgerPolicy,
    credit_id: i64,
    amount: i64,
    new_interest_amount: i64,
) -> Result<PaymentReceipt> {
    record_entry(db, credit_id, |credit| {
        ledger::apply_capital_payment(credit, amount, new_interest_amount, policy, Utc::now())
    })
    .await
}

/// Records an interest payment and advances the due date.
///
/// # Errors
/// `CreditNotFound`, `CreditCompleted`, `InvalidAmount` or `ConcurrentModification`.
#[instrument(skip(db, policy))]
pub async fn record_interest_payment(
    db: &DatabaseConnection,
    policy: &LedgerPolicy,
    credit_id: i64,
    amount: i64,
    add_new_interest: bool,
) -> Result<PaymentReceipt> {
    record_entry(db, credit_id, |credit| {
        ledger::apply_interest_payment(credit, amount, add_new_interest, policy, Utc::now())
    })
    .await
}

/// Pays the credit off (balance plus accrued interest) and marks it completed.
///
/// # Errors
/// `CreditNotFound`, `CreditCompleted`, `InvalidAmount` or `ConcurrentModification`.
#[instrument(skip(db))]
pub async fn record_full_payment(db: &DatabaseConnection, credit_id: i64) -> Result<PaymentReceipt> {
    record_entry(db, credit_id, |credit| {
        ledger::apply_full_payment(credit, Utc::now())
    })
    .await
}

/// Deletes a payment and reverses its effect on the credit.
/// Returns the credit as it is after the deletion.
///
/// # Errors
/// `PaymentNotFound`, `CreditNotFound` for an orphaned payment,
/// `CreditCompleted` when deleting an ordinary payment of a paid-off credit,
/// `ConcurrentModification`.
#[instrument(skip(db, policy))]
pub async fn delete_payment(
    db: &DatabaseConnection,
    policy: &LedgerPolicy,
    payment_id: i64,
) -> Result<credit::Model> {
    let txn = db.begin().await?;
    let payment = Payment::find_by_id(payment_id)
        .one(&txn)
        .await?
        .ok_or(Error::PaymentNotFound { id: payment_id })?;
    let credit = require_credit(&txn, payment.credit_id).await?;

    let reversed = ledger::reverse_payment(&credit, &payment, policy, Utc::now())?;
    let payment_type = payment.payment_type;
    let amount = payment.amount_paid;
    payment.delete(&txn).await?;

    let credit = match reversed {
        Some(updated) => save_credit(&txn, credit.version, &updated).await?,
        None => credit,
    };
    txn.commit().await?;

    info!(
        "Deleted {} payment {} of {}; credit {} balance {}, interest {}",
        payment_type, payment_id, amount, credit.id, credit.total_amount, credit.interest_amount
    );
    Ok(credit)
}

/// Finds a payment by id, `None` if it does not exist.
pub async fn get_payment_by_id(
    db: &DatabaseConnection,
    payment_id: i64,
) -> Result<Option<payment::Model>> {
    Payment::find_by_id(payment_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All payments received by an admin, newest first.
pub async fn fetch_payments(db: &DatabaseConnection, admin_id: i64) -> Result<Vec<payment::Model>> {
    Payment::find()
        .filter(payment::Column::AdminId.eq(admin_id))
        .order_by_desc(payment::Column::PaymentDate)
        .order_by_desc(payment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Payment history of one credit, newest first.
pub async fn fetch_payments_by_credit_id(
    db: &DatabaseConnection,
    credit_id: i64,
) -> Result<Vec<payment::Model>> {
    Payment::find()
        .filter(payment::Column::CreditId.eq(credit_id))
        .order_by_desc(payment::Column::PaymentDate)
        .order_by_desc(payment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
