//! Generates the scheduled updates that have come due since the last run.
//!
//! For every active debt whose next due date is on or before the processing
//! date, one pending update is generated per elapsed period, the balance is
//! decremented by the installment (clipped to the remaining balance) and the
//! due date advanced, until the debt is caught up or settled.

use rusqlite::{Connection, Transaction as SqlTransaction};
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    database_id::DebtId,
    debt::{
        core::{Debt, DebtStatus, get_debt, list_due_debts},
        installment::round2,
        update::{UpdateStatus, create_debt_update},
    },
};

/// What the catch-up processor did for one debt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatchUpOutcome {
    /// The debt that was processed.
    pub debt_id: DebtId,
    /// How many scheduled updates were generated.
    pub updates_generated: u32,
    /// The balance after processing.
    pub new_balance: f64,
    /// Whether processing drove the balance to zero.
    pub settled: bool,
    /// The error that stopped processing, if any. Updates generated before
    /// the error stand.
    pub error: Option<String>,
}

/// Catch up every debt with installments due on or before `as_of`.
///
/// Debts are processed independently: a failure on one is recorded in its
/// outcome and does not stop the others. Running the processor twice with no
/// time elapsed in between is a no-op the second time.
///
/// # Errors
/// This function will return an [Error::SqlError] if the due-debt scan
/// fails. Per-debt failures are reported in the outcome list instead.
pub fn catch_up_all(as_of: Date, connection: &Connection) -> Result<Vec<CatchUpOutcome>, Error> {
    let due_debts = list_due_debts(as_of, connection)?;

    let outcomes = due_debts
        .into_iter()
        .map(|debt| {
            let outcome = catch_up_debt(debt, as_of, connection);
            if let Some(error) = &outcome.error {
                tracing::warn!("catch-up for debt {} stopped: {error}", outcome.debt_id);
            }
            outcome
        })
        .collect();

    Ok(outcomes)
}

fn catch_up_debt(mut debt: Debt, as_of: Date, connection: &Connection) -> CatchUpOutcome {
    let mut outcome = CatchUpOutcome {
        debt_id: debt.id,
        updates_generated: 0,
        new_balance: debt.current_balance,
        settled: false,
        error: None,
    };

    // A zero installment would loop forever without ever reducing the
    // balance; the debt is skipped and reported instead.
    if debt.installment_amount <= 0.0 {
        outcome.error = Some(Error::ZeroInstallment(debt.id).to_string());
        return outcome;
    }

    let mut retried = false;

    while debt.status == DebtStatus::Active && debt.next_due_date <= as_of {
        match apply_scheduled_installment(&debt, connection) {
            Ok(updated) => {
                debt = updated;
                outcome.updates_generated += 1;
            }
            Err(Error::Conflict(debt_id)) if !retried => {
                // Another catch-up cycle got there first; retry once
                // against refreshed state.
                retried = true;
                match get_debt(debt_id, connection) {
                    Ok(fresh) => debt = fresh,
                    Err(error) => {
                        outcome.error = Some(error.to_string());
                        break;
                    }
                }
            }
            Err(error) => {
                outcome.error = Some(error.to_string());
                break;
            }
        }
    }

    outcome.new_balance = debt.current_balance;
    outcome.settled = debt.status == DebtStatus::Settled;
    outcome
}

/// Apply the installment due on `debt.next_due_date`: insert the pending
/// update, decrement the balance, and advance the due date, all in one
/// database transaction.
///
/// The debt row is only written if its balance and due date still match the
/// values this cycle read, so two concurrent cycles cannot both deduct the
/// same installment.
fn apply_scheduled_installment(debt: &Debt, connection: &Connection) -> Result<Debt, Error> {
    let due_date = debt.next_due_date;
    // The final installment is clipped to the remaining balance, which
    // never goes below zero.
    let amount = round2(debt.installment_amount.min(debt.current_balance));
    let new_balance = round2(debt.current_balance - amount);
    let new_due_date = debt.frequency.advance(due_date);
    let new_status = if new_balance <= 0.0 {
        DebtStatus::Settled
    } else {
        DebtStatus::Active
    };

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Immediate)?;

    let rows_affected = transaction.execute(
        "UPDATE debt SET current_balance = ?1, next_due_date = ?2, status = ?3
         WHERE id = ?4 AND current_balance = ?5 AND next_due_date = ?6",
        (
            new_balance,
            new_due_date,
            new_status,
            debt.id,
            debt.current_balance,
            due_date,
        ),
    )?;

    if rows_affected == 0 {
        // Dropping the transaction without committing rolls it back.
        return Err(Error::Conflict(debt.id));
    }

    create_debt_update(
        debt.id,
        due_date,
        amount,
        UpdateStatus::Pending,
        None,
        &transaction,
    )?;

    transaction.commit()?;

    Ok(Debt {
        current_balance: new_balance,
        next_due_date: new_due_date,
        status: new_status,
        ..debt.clone()
    })
}
