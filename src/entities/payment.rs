//! Payment entity - A single transaction recorded against a credit.
//!
//! Client and credit names are denormalized at payment time. Payments are
//! immutable once written; the only allowed change is deletion, which must
//! reverse the effect the payment had on its credit.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of payment recorded against a credit
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum PaymentType {
    /// Reduces the outstanding balance
    #[sea_orm(string_value = "CAPITAL")]
    Capital,
    /// Pays accrued interest
    #[sea_orm(string_value = "INTEREST")]
    Interest,
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Capital => write!(f, "capital"),
            Self::Interest => write!(f, "interest"),
        }
    }
}

/// Payment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Admin who owns the credit
    pub admin_id: i64,
    /// Client card number at payment time
    pub client_id: i64,
    /// Client name at payment time
    pub client_name: String,
    /// Credit this payment belongs to
    pub credit_id: i64,
    /// Product name of the credit at payment time
    pub credit_name: String,
    /// Amount received
    pub amount_paid: i64,
    /// When the payment was made (epoch seconds)
    #[sea_orm(column_name = "start_date")]
    pub payment_date: i64,
    /// Capital or interest
    pub payment_type: PaymentType,
    /// Part of `amount_paid` that settled accrued interest (full payoffs only)
    pub interest_portion: i64,
    /// Credit's next payment date before this payment was applied
    pub previous_due_date: Option<i64>,
    /// Whether this payment paid the credit off
    pub settles_credit: bool,
}

impl Model {
    /// Payment date as a UTC timestamp.
    #[must_use]
    pub fn payment_date_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.payment_date, 0)
    }
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one credit
    #[sea_orm(
        belongs_to = "super::credit::Entity",
        from = "Column::CreditId",
        to = "super::credit::Column::Id",
        on_delete = "Cascade"
    )]
    Credit,
}

impl Related<super::credit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Credit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
