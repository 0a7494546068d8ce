//! Interest accrual job
//!
//! Adds one month of interest to every open credit whose accrual day is today.
//! The job is meant to be triggered once per day by an external scheduler. Each
//! credit records the date of its last accrual, so running the job twice on the
//! same day only accrues once. The date of the last completed run is kept in the
//! `system_state` table.

use crate::{
    core::{credit::save_credit, ledger, schedule},
    entities::{Credit, SystemState, credit, system_state},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;
use tracing::{debug, error, info, instrument};

const LAST_ACCRUAL_RUN_KEY: &str = "last_accrual_run";

/// A credit the job could not accrue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccrualFailure {
    /// Credit that failed
    pub credit_id: i64,
    /// Error description
    pub message: String,
}

/// Outcome of one accrual run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccrualReport {
    /// Calendar day the run accrued for
    pub run_date: NaiveDate,
    /// Open credits looked at
    pub examined_count: usize,
    /// Credits that received interest in this run
    pub updated_count: usize,
    /// Credits skipped because they already accrued on `run_date`
    pub already_accrued_count: usize,
    /// Credits that could not be processed
    pub failures: Vec<AccrualFailure>,
    /// Date of the previous completed run, if any
    pub previous_run: Option<NaiveDate>,
}

/// What accruing a single credit on a given day amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccrualOutcome {
    /// Not this credit's accrual day
    NotDue,
    /// Interest for this day was already added
    AlreadyAccrued,
    /// Credit with the interest added
    Accrued {
        /// Credit after accrual
        credit: credit::Model,
        /// Interest added
        interest: i64,
    },
}

/// Computes the accrual of `credit` on `today` without touching the store.
///
/// # Errors
/// `MissingStartDate` for a credit without a start date, `InvalidAmount`
/// if the accrued interest overflows.
pub fn accrue_credit(credit: &credit::Model, today: NaiveDate) -> Result<AccrualOutcome> {
    let start = credit
        .start_date_utc()
        .ok_or(Error::MissingStartDate { id: credit.id })?
        .date_naive();

    if credit.last_accrual_date == Some(today) {
        return Ok(AccrualOutcome::AlreadyAccrued);
    }
    if !schedule::is_accrual_day(start, today) {
        return Ok(AccrualOutcome::NotDue);
    }

    let interest = ledger::accrual_interest(credit.total_amount, credit.interest_rate);
    let mut updated = credit.clone();
    updated.interest_amount = credit
        .interest_amount
        .checked_add(interest)
        .ok_or(Error::InvalidAmount { amount: interest })?;
    updated.last_accrual_date = Some(today);
    updated.modified_date = Utc::now().timestamp();

    Ok(AccrualOutcome::Accrued {
        credit: updated,
        interest,
    })
}

/// Retrieves the date of the last completed accrual run.
pub async fn get_last_accrual_run<C>(db: &C) -> Result<Option<NaiveDate>>
where
    C: ConnectionTrait,
{
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_ACCRUAL_RUN_KEY))
        .one(db)
        .await?;

    match state {
        Some(s) => NaiveDate::parse_from_str(&s.value, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| Error::Config {
                message: format!("Failed to parse last accrual run date: {e}"),
            }),
        None => Ok(None),
    }
}

async fn set_last_accrual_run<C>(db: &C, date: NaiveDate) -> Result<()>
where
    C: ConnectionTrait,
{
    let date_str = date.format("%Y-%m-%d").to_string();
    let now = Utc::now().naive_utc();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_ACCRUAL_RUN_KEY))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(date_str);
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        system_state::ActiveModel {
            key: Set(LAST_ACCRUAL_RUN_KEY.to_string()),
            value: Set(date_str),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

/// Runs interest accrual over every open credit for `today`.
///
/// Each credit is written on its own with a version check. A credit that
/// fails is reported in [`AccrualReport::failures`] and the run carries on
/// with the rest.
///
/// # Errors
/// Only when the open credits cannot be listed or the run date cannot be
/// recorded.
#[instrument(skip(db))]
pub async fn run_accrual(db: &DatabaseConnection, today: NaiveDate) -> Result<AccrualReport> {
    let previous_run = get_last_accrual_run(db).await?;
    let credits = Credit::find()
        .filter(credit::Column::NextPaymentDate.is_not_null())
        .order_by_asc(credit::Column::Id)
        .all(db)
        .await?;

    let mut report = AccrualReport {
        run_date: today,
        examined_count: credits.len(),
        updated_count: 0,
        already_accrued_count: 0,
        failures: Vec::new(),
        previous_run,
    };

    for credit in credits {
        let outcome = match accrue_credit(&credit, today) {
            Ok(AccrualOutcome::Accrued {
                credit: updated,
                interest,
            }) => save_credit(db, credit.version, &updated)
                .await
                .map(|saved| AccrualOutcome::Accrued {
                    credit: saved,
                    interest,
                }),
            other => other,
        };

        match outcome {
            Ok(AccrualOutcome::Accrued { credit, interest }) => {
                info!(
                    "Accrued {} interest on credit {}; interest now {}",
                    interest, credit.id, credit.interest_amount
                );
                report.updated_count += 1;
            }
            Ok(AccrualOutcome::AlreadyAccrued) => {
                debug!("Credit {} already accrued on {}", credit.id, today);
                report.already_accrued_count += 1;
            }
            Ok(AccrualOutcome::NotDue) => {}
            Err(e) => {
                error!("Accrual failed for credit {}: {}", credit.id, e);
                report.failures.push(AccrualFailure {
                    credit_id: credit.id,
                    message: e.to_string(),
                });
            }
        }
    }

    set_last_accrual_run(db, today).await?;
    info!(
        "Accrual run for {}: {} updated, {} already accrued, {} failed",
        today,
        report.updated_count,
        report.already_accrued_count,
        report.failures.len()
    );
    Ok(report)
}

/// Formats an accrual report into a human-readable summary.
#[must_use]
pub fn format_accrual_summary(report: &AccrualReport) -> String {
    let mut summary = format!(
        "Interest accrual - {} - {} of {} credits updated",
        report.run_date.format("%Y-%m-%d"),
        report.updated_count,
        report.examined_count
    );
    if report.already_accrued_count > 0 {
        summary.push_str(&format!(
            ", {} already accrued today",
            report.already_accrued_count
        ));
    }
    if !report.failures.is_empty() {
        summary.push_str(&format!(", {} failed", report.failures.len()));
        for failure in &report.failures {
            summary.push_str(&format!(
                "\n  credit {}: {}",
                failure.credit_id, failure.message
            ));
        }
    }

    summary
}
