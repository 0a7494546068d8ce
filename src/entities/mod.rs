//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the ledger tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod credit;
pub mod payment;
pub mod system_state;

// Re-export specific types to avoid conflicts
pub use credit::{Column as CreditColumn, CreditStatus, Entity as Credit, Model as CreditModel};
pub use payment::{
    Column as PaymentColumn, Entity as Payment, Model as PaymentModel, PaymentType,
};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
