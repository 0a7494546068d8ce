/// Interest accrual job over all open credits
pub mod accrual;

/// Credit creation, queries, edits and deletion
pub mod credit;

/// Plain-text invoice rendering
pub mod invoice;

/// Pure balance arithmetic for payments and their reversal
pub mod ledger;

/// Recording and deleting payments
pub mod payment;

/// Due-date and accrual-day calendar math
pub mod schedule;
