//! Credit entity - A loan issued by an admin to a client.
//!
//! Amounts are integer currency units. Timestamps are integer epoch seconds;
//! use the `*_utc` accessors to work with them as `chrono` values.
//! A null `next_payment_date` marks the credit as completed.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Credit database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credits")]
pub struct Model {
    /// Unique identifier for the credit
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Admin who issued the credit
    pub admin_id: i64,
    /// Client identity card number
    pub client_card_id: i64,
    /// Client full name
    pub client_name: String,
    /// Client phone number
    pub client_phone: String,
    /// Product or item financed by the credit
    pub product_name: String,
    /// Principal lent
    pub initial_amount: i64,
    /// Interest rate as a whole percentage
    pub interest_rate: i64,
    /// Outstanding balance (principal plus capitalised interest, minus capital payments)
    pub total_amount: i64,
    /// Accrued interest not yet paid
    pub interest_amount: i64,
    /// Origination timestamp
    pub start_date: Option<i64>,
    /// Next due timestamp, `None` once the credit is completed
    pub next_payment_date: Option<i64>,
    /// Agreed number of payments, if any
    pub num_payments: Option<i32>,
    /// Timestamp of the last mutation
    pub modified_date: i64,
    /// Calendar day of the last interest accrual
    pub last_accrual_date: Option<Date>,
    /// Optimistic concurrency counter, bumped on every write
    pub version: i32,
}

/// Lifecycle state of a credit, derived at query time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditStatus {
    /// Next payment is scheduled and not yet overdue
    Active,
    /// Next payment date is in the past
    Due,
    /// Fully paid, no further payments scheduled
    Completed,
}

impl Model {
    /// Origination date as a UTC timestamp.
    #[must_use]
    pub fn start_date_utc(&self) -> Option<DateTime<Utc>> {
        self.start_date.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Next due date as a UTC timestamp.
    #[must_use]
    pub fn next_payment_date_utc(&self) -> Option<DateTime<Utc>> {
        self.next_payment_date
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Whether the credit has been paid off.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.next_payment_date.is_none()
    }

    /// Status of the credit as seen at `now`.
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> CreditStatus {
        match self.next_payment_date {
            None => CreditStatus::Completed,
            Some(due) if due < now.timestamp() => CreditStatus::Due,
            Some(_) => CreditStatus::Active,
        }
    }

    /// Amount needed to settle the credit in full.
    #[must_use]
    pub const fn payoff_amount(&self) -> i64 {
        self.total_amount + self.interest_amount
    }
}

/// Defines relationships between Credit and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One credit has many payments
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
