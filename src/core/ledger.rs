//! Ledger arithmetic - how payments and accrual mutate a credit.
//!
//! Every function here is pure: it takes a snapshot of a credit, validates the
//! request against the configured [`LedgerPolicy`], and returns the credit as it
//! must look afterwards together with the payment row to insert. Persistence,
//! transactions and version checks live in [`crate::core::payment`].

use crate::{
    config::ledger::{InterestPaymentPolicy, LedgerPolicy, OverpaymentPolicy},
    core::schedule,
    entities::{PaymentType, credit, payment},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::Set;

/// A payment row that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    /// Admin who owns the credit
    pub admin_id: i64,
    /// Client card number
    pub client_id: i64,
    /// Client name
    pub client_name: String,
    /// Credit the payment applies to
    pub credit_id: i64,
    /// Product name of the credit
    pub credit_name: String,
    /// Amount received
    pub amount_paid: i64,
    /// Payment timestamp (epoch seconds)
    pub payment_date: i64,
    /// Capital or interest
    pub payment_type: PaymentType,
    /// Share of `amount_paid` that settled accrued interest
    pub interest_portion: i64,
    /// Credit's due date before the payment
    pub previous_due_date: Option<i64>,
    /// Whether the payment completes the credit
    pub settles_credit: bool,
}

impl NewPayment {
    fn for_credit(
        credit: &credit::Model,
        amount_paid: i64,
        payment_type: PaymentType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            admin_id: credit.admin_id,
            client_id: credit.client_card_id,
            client_name: credit.client_name.clone(),
            credit_id: credit.id,
            credit_name: credit.product_name.clone(),
            amount_paid,
            payment_date: now.timestamp(),
            payment_type,
            interest_portion: 0,
            previous_due_date: credit.next_payment_date,
            settles_credit: false,
        }
    }

    /// Converts into an insertable active model.
    #[must_use]
    pub fn into_active_model(self) -> payment::ActiveModel {
        payment::ActiveModel {
            admin_id: Set(self.admin_id),
            client_id: Set(self.client_id),
            client_name: Set(self.client_name),
            credit_id: Set(self.credit_id),
            credit_name: Set(self.credit_name),
            amount_paid: Set(self.amount_paid),
            payment_date: Set(self.payment_date),
            payment_type: Set(self.payment_type),
            interest_portion: Set(self.interest_portion),
            previous_due_date: Set(self.previous_due_date),
            settles_credit: Set(self.settles_credit),
            ..Default::default()
        }
    }
}

/// Result of applying a payment: the credit afterwards and the payment to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Credit state after the payment
    pub credit: credit::Model,
    /// Payment row to insert
    pub payment: NewPayment,
}

/// Balance at origination: principal plus one period of interest.
///
/// # Errors
/// `InvalidAmount` when the principal is not positive or the total overflows,
/// `Validation` when the rate is negative.
pub fn origination_total(initial_amount: i64, interest_rate: i64) -> Result<i64> {
    if initial_amount <= 0 {
        return Err(Error::InvalidAmount {
            amount: initial_amount,
        });
    }
    if interest_rate < 0 {
        return Err(Error::Validation {
            message: format!("Interest rate cannot be negative (got {interest_rate})"),
        });
    }

    initial_amount
        .checked_mul(interest_rate)
        .map(|scaled| scaled / 100)
        .and_then(|interest| initial_amount.checked_add(interest))
        .ok_or(Error::InvalidAmount {
            amount: initial_amount,
        })
}

/// Interest added on an accrual day: `floor(total * rate / 100)`, never negative.
#[must_use]
pub fn accrual_interest(total_amount: i64, interest_rate: i64) -> i64 {
    total_amount
        .saturating_mul(interest_rate)
        .div_euclid(100)
        .max(0)
}

fn ensure_open(credit: &credit::Model) -> Result<()> {
    if credit.is_completed() {
        return Err(Error::CreditCompleted { id: credit.id });
    }
    Ok(())
}

fn ensure_positive(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

fn advance_due_date(credit: &mut credit::Model) {
    credit.next_payment_date = credit
        .next_payment_date_utc()
        .map(|due| schedule::next_payment_timestamp(due).timestamp());
}

/// Applies a capital payment of `amount`.
///
/// The balance drops by the amount actually recorded (see [`OverpaymentPolicy`]),
/// accrued interest is replaced by the caller-supplied `new_interest_amount`
/// and the due date advances one month.
///
/// # Errors
/// `CreditCompleted`, `InvalidAmount` for non-positive amounts or negative
/// interest, `Overpayment` under the reject policy.
pub fn apply_capital_payment(
    credit: &credit::Model,
    amount: i64,
    new_interest_amount: i64,
    policy: &LedgerPolicy,
    now: DateTime<Utc>,
) -> Result<LedgerEntry> {
    ensure_open(credit)?;
    ensure_positive(amount)?;
    if new_interest_amount < 0 {
        return Err(Error::InvalidAmount {
            amount: new_interest_amount,
        });
    }

    let recorded = if amount > credit.total_amount {
        match policy.overpayment {
            OverpaymentPolicy::Allow => amount,
            OverpaymentPolicy::Clamp if credit.total_amount > 0 => credit.total_amount,
            OverpaymentPolicy::Clamp | OverpaymentPolicy::Reject => {
                return Err(Error::Overpayment {
                    balance: credit.total_amount,
                    amount,
                });
            }
        }
    } else {
        amount
    };

    let payment = NewPayment::for_credit(credit, recorded, PaymentType::Capital, now);
    let mut updated = credit.clone();
    updated.total_amount = credit
        .total_amount
        .checked_sub(recorded)
        .ok_or(Error::InvalidAmount { amount })?;
    updated.interest_amount = new_interest_amount;
    advance_due_date(&mut updated);
    updated.modified_date = now.timestamp();

    Ok(LedgerEntry {
        credit: updated,
        payment,
    })
}

/// Applies an interest payment of `amount`.
///
/// With `add_new_interest` the accrued interest is re-seeded to `amount`.
/// Otherwise [`InterestPaymentPolicy`] decides whether it is reduced or kept.
/// The due date advances one month either way.
///
/// # Errors
/// `CreditCompleted`, `InvalidAmount` for non-positive amounts.
pub fn apply_interest_payment(
    credit: &credit::Model,
    amount: i64,
    add_new_interest: bool,
    policy: &LedgerPolicy,
    now: DateTime<Utc>,
) -> Result<LedgerEntry> {
    ensure_open(credit)?;
    ensure_positive(amount)?;

    let payment = NewPayment::for_credit(credit, amount, PaymentType::Interest, now);
    let mut updated = credit.clone();
    updated.interest_amount = if add_new_interest {
        amount
    } else {
        match policy.interest_payment {
            InterestPaymentPolicy::Retain => credit.interest_amount,
            InterestPaymentPolicy::Settle => (credit.interest_amount - amount).max(0),
        }
    };
    advance_due_date(&mut updated);
    updated.modified_date = now.timestamp();

    Ok(LedgerEntry {
        credit: updated,
        payment,
    })
}

/// Settles the credit: records a capital payment of balance plus accrued
/// interest and marks the credit completed.
///
/// # Errors
/// `CreditCompleted`, `InvalidAmount` when the payoff would be negative.
pub fn apply_full_payment(credit: &credit::Model, now: DateTime<Utc>) -> Result<LedgerEntry> {
    ensure_open(credit)?;
    let payoff = credit.payoff_amount();
    if payoff < 0 {
        return Err(Error::InvalidAmount { amount: payoff });
    }

    let mut payment = NewPayment::for_credit(credit, payoff, PaymentType::Capital, now);
    payment.interest_portion = credit.interest_amount;
    payment.settles_credit = true;

    let mut updated = credit.clone();
    updated.total_amount = 0;
    updated.interest_amount = 0;
    updated.next_payment_date = None;
    updated.modified_date = now.timestamp();

    Ok(LedgerEntry {
        credit: updated,
        payment,
    })
}

/// Credit state after deleting `payment`, or `None` when the credit is untouched.
///
/// Capital payments give their amount back to the balance. Deleting a payoff
/// also restores the accrued interest and the due date, re-opening the credit.
/// Interest payments only restore interest under the settle policy.
///
/// # Errors
/// `CreditCompleted` when deleting an ordinary payment of a paid-off credit
/// (the payoff has to be deleted first), `InvalidAmount` on overflow.
pub fn reverse_payment(
    credit: &credit::Model,
    payment: &payment::Model,
    policy: &LedgerPolicy,
    now: DateTime<Utc>,
) -> Result<Option<credit::Model>> {
    let overflow = || Error::InvalidAmount {
        amount: payment.amount_paid,
    };

    if credit.is_completed() && !payment.settles_credit {
        return Err(Error::CreditCompleted { id: credit.id });
    }

    let mut updated = credit.clone();
    match payment.payment_type {
        PaymentType::Capital if payment.settles_credit => {
            let capital = payment.amount_paid - payment.interest_portion;
            updated.total_amount = credit.total_amount.checked_add(capital).ok_or_else(overflow)?;
            updated.interest_amount = credit
                .interest_amount
                .checked_add(payment.interest_portion)
                .ok_or_else(overflow)?;
            updated.next_payment_date = payment.previous_due_date.or(credit.next_payment_date);
        }
        PaymentType::Capital => {
            updated.total_amount = credit
                .total_amount
                .checked_add(payment.amount_paid)
                .ok_or_else(overflow)?;
        }
        PaymentType::Interest => match policy.interest_payment {
            InterestPaymentPolicy::Retain => return Ok(None),
            InterestPaymentPolicy::Settle => {
                updated.interest_amount = credit
                    .interest_amount
                    .checked_add(payment.amount_paid)
                    .ok_or_else(overflow)?;
            }
        },
    }
    updated.modified_date = now.timestamp();

    Ok(Some(updated))
}
