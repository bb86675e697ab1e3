//! Repays a set of debts with a single amount, and the counterparty
//! "settle up" built on top of it.

use rusqlite::{Connection, Transaction as SqlTransaction};
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    account::verify_account,
    database_id::{AccountId, DebtId},
    debt::{
        core::{Debt, DebtStatus, get_debt, list_unsettled_debts_for_counterparty},
        installment::round2,
        update::{UpdateStatus, create_debt_update},
    },
    transaction::{TransactionKind, create_transaction},
};

/// What a batch repayment did for one debt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepaymentOutcome {
    /// The debt the money was applied to.
    pub debt_id: DebtId,
    /// How much of the batch amount went to this debt.
    pub amount_applied: f64,
    /// Whether the repayment drove the balance to zero.
    pub settled: bool,
    /// The error that prevented the repayment, if any. The caller can retry
    /// the remainder.
    pub error: Option<String>,
}

/// Allocate `amount` across `debt_ids` in the order given.
///
/// Each debt receives at most its outstanding balance; allocation stops once
/// the amount is exhausted. Every repayment records a paid update and a
/// repayment transaction against `account_id`. The batch is not atomic
/// across debts: a failure on one debt is reported in its outcome and the
/// rest continue.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if `amount` is not positive,
/// - [Error::InvalidAccount] if `account_id` does not refer to a valid account,
/// - [Error::NotFound] if any debt id is unknown (checked before any money moves),
/// - [Error::Overpayment] if `amount` exceeds the combined outstanding balance,
/// - or [Error::SqlError] there is some other SQL error.
pub fn batch_repay(
    debt_ids: &[DebtId],
    amount: f64,
    date: Date,
    account_id: Option<AccountId>,
    connection: &Connection,
) -> Result<Vec<RepaymentOutcome>, Error> {
    if amount <= 0.0 {
        return Err(Error::InvalidAmount {
            field: "amount",
            value: amount,
        });
    }
    if let Some(account_id) = account_id {
        verify_account(account_id, connection)?;
    }

    // Resolve every debt before any money moves so an unknown id or an
    // overpayment rejects the request as a whole.
    let debts = debt_ids
        .iter()
        .map(|&debt_id| get_debt(debt_id, connection))
        .collect::<Result<Vec<_>, _>>()?;

    let available = round2(debts.iter().map(|debt| debt.current_balance).sum());
    if amount > available {
        return Err(Error::Overpayment {
            requested: amount,
            available,
        });
    }

    let mut remaining = amount;
    let mut outcomes = Vec::with_capacity(debts.len());

    for debt in debts {
        if remaining <= 0.0 {
            break;
        }

        if debt.current_balance <= 0.0 {
            outcomes.push(RepaymentOutcome {
                debt_id: debt.id,
                amount_applied: 0.0,
                settled: true,
                error: Some(Error::AlreadySettled(debt.id).to_string()),
            });
            continue;
        }

        let applied = round2(remaining.min(debt.current_balance));

        match apply_repayment(&debt, applied, date, account_id, connection) {
            Ok(updated) => {
                remaining = round2(remaining - applied);
                outcomes.push(RepaymentOutcome {
                    debt_id: debt.id,
                    amount_applied: applied,
                    settled: updated.status == DebtStatus::Settled,
                    error: None,
                });
            }
            Err(error) => {
                tracing::error!("could not repay debt {}: {error}", debt.id);
                outcomes.push(RepaymentOutcome {
                    debt_id: debt.id,
                    amount_applied: 0.0,
                    settled: false,
                    error: Some(error.to_string()),
                });
            }
        }
    }

    Ok(outcomes)
}

/// Settle every open debt with `counterparty` in one batch, paying the
/// combined outstanding balance.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the counterparty has no open debts,
/// - or any error [batch_repay] returns.
pub fn settle_counterparty(
    counterparty: &str,
    date: Date,
    account_id: Option<AccountId>,
    connection: &Connection,
) -> Result<Vec<RepaymentOutcome>, Error> {
    let debts = list_unsettled_debts_for_counterparty(counterparty, connection)?;
    if debts.is_empty() {
        return Err(Error::NotFound);
    }

    let debt_ids: Vec<DebtId> = debts.iter().map(|debt| debt.id).collect();
    let total = round2(debts.iter().map(|debt| debt.current_balance).sum());

    batch_repay(&debt_ids, total, date, account_id, connection)
}

/// Pay `amount` off one debt: the paid update, the transaction log entry,
/// and the balance decrement happen in one database transaction. The debt
/// row is only written if the balance still matches the value the batch
/// read, so a concurrent cycle cannot double-deduct.
fn apply_repayment(
    debt: &Debt,
    amount: f64,
    date: Date,
    account_id: Option<AccountId>,
    connection: &Connection,
) -> Result<Debt, Error> {
    let new_balance = round2(debt.current_balance - amount);
    let new_status = if new_balance <= 0.0 {
        DebtStatus::Settled
    } else {
        DebtStatus::Active
    };

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Immediate)?;

    let money_movement = create_transaction(
        amount,
        date,
        &format!("Repayment for {}", debt.name),
        TransactionKind::Repayment,
        account_id.or(debt.account_id),
        &transaction,
    )?;

    create_debt_update(
        debt.id,
        date,
        amount,
        UpdateStatus::Paid,
        Some(money_movement.id),
        &transaction,
    )?;

    let rows_affected = transaction.execute(
        "UPDATE debt SET current_balance = ?1, status = ?2
         WHERE id = ?3 AND current_balance = ?4",
        (new_balance, new_status, debt.id, debt.current_balance),
    )?;

    if rows_affected == 0 {
        return Err(Error::Conflict(debt.id));
    }

    transaction.commit()?;

    Ok(Debt {
        current_balance: new_balance,
        status: new_status,
        ..debt.clone()
    })
}


#[cfg(test)]
mod settle_counterparty_tests {
    use time::macros::date;

    use crate::{
        Error,
        debt::core::{
            DebtRole, DebtStatus, get_debt,
            test_utils::{get_test_connection, insert_debt, personal_form},
        },
    };

    use super::settle_counterparty;

    #[test]
    fn settles_every_open_debt_with_the_counterparty() {
        let conn = get_test_connection();
        let lent = insert_debt(personal_form(DebtRole::Lent, "Sam", 100.0), &conn);
        let borrowed = insert_debt(personal_form(DebtRole::Borrowed, "Sam", 40.0), &conn);
        let unrelated = insert_debt(personal_form(DebtRole::Lent, "Alex", 75.0), &conn);

        let outcomes = settle_counterparty("Sam", date!(2025 - 03 - 01), None, &conn).unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|outcome| outcome.settled));
        assert_eq!(
            get_debt(lent.id, &conn).unwrap().status,
            DebtStatus::Settled
        );
        assert_eq!(
            get_debt(borrowed.id, &conn).unwrap().status,
            DebtStatus::Settled
        );
        // Other counterparties are untouched.
        assert_eq!(
            get_debt(unrelated.id, &conn).unwrap().status,
            DebtStatus::Active
        );
    }

    #[test]
    fn fails_when_the_counterparty_has_no_open_debts() {
        let conn = get_test_connection();

        assert_eq!(
            settle_counterparty("Sam", date!(2025 - 03 - 01), None, &conn),
            Err(Error::NotFound)
        );
    }
}
