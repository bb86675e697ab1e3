//! Pays off the full remaining balance of a debt in one go.

use rusqlite::{Connection, Transaction as SqlTransaction};
use time::Date;

use crate::{
    Error,
    database_id::DebtId,
    debt::{
        core::{Debt, DebtStatus, get_debt},
        installment::round2,
        update::{UpdateStatus, create_debt_update},
    },
    transaction::{TransactionKind, create_transaction},
};

/// Pay off the full remaining balance of a debt.
///
/// Records one paid update for the whole balance dated `paid_on`, zeroes the
/// balance, marks the debt settled, and logs the money movement against the
/// debt's linked account.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `debt_id` does not refer to a valid debt,
/// - [Error::AlreadySettled] if the balance is already zero,
/// - or [Error::SqlError] there is some other SQL error.
pub fn pay_early(debt_id: DebtId, paid_on: Date, connection: &Connection) -> Result<Debt, Error> {
    let debt = get_debt(debt_id, connection)?;

    if debt.status == DebtStatus::Settled || debt.current_balance <= 0.0 {
        return Err(Error::AlreadySettled(debt_id));
    }

    let amount = round2(debt.current_balance);

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Immediate)?;

    let money_movement = create_transaction(
        amount,
        paid_on,
        &format!("Paid off {}", debt.name),
        TransactionKind::Repayment,
        debt.account_id,
        &transaction,
    )?;

    create_debt_update(
        debt.id,
        paid_on,
        amount,
        UpdateStatus::Paid,
        Some(money_movement.id),
        &transaction,
    )?;

    transaction.execute(
        "UPDATE debt SET current_balance = 0, status = 'settled' WHERE id = ?1",
        (debt.id,),
    )?;

    transaction.commit()?;

    get_debt(debt_id, connection)
}

#[cfg(test)]
mod payoff_tests {
    use time::macros::date;

    use crate::{
        Error,
        debt::{
            catch_up::catch_up_all,
            core::{
                DebtStatus,
                test_utils::{get_test_connection, insert_debt, institutional_form},
            },
            update::{UpdateStatus, list_updates},
        },
        transaction::get_transaction,
    };

    use super::pay_early;

    #[test]
    fn pays_off_the_remaining_balance() {
        let conn = get_test_connection();
        let debt = insert_debt(institutional_form(), &conn);
        // Three installments leave 900 outstanding.
        catch_up_all(date!(2025 - 04 - 15), &conn).unwrap();

        let debt = pay_early(debt.id, date!(2025 - 04 - 20), &conn).unwrap();

        assert_eq!(debt.current_balance, 0.0);
        assert_eq!(debt.status, DebtStatus::Settled);

        let paid_updates: Vec<_> = list_updates(debt.id, &conn)
            .unwrap()
            .into_iter()
            .filter(|update| update.status == UpdateStatus::Paid)
            .collect();
        assert_eq!(paid_updates.len(), 1);
        assert_eq!(paid_updates[0].amount, 900.0);
        assert_eq!(paid_updates[0].date, date!(2025 - 04 - 20));

        let transaction =
            get_transaction(paid_updates[0].transaction_id.unwrap(), &conn).unwrap();
        assert_eq!(transaction.amount, 900.0);
    }

    #[test]
    fn fails_on_unknown_debt() {
        let conn = get_test_connection();

        assert_eq!(
            pay_early(42, date!(2025 - 04 - 20), &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn fails_on_a_settled_debt() {
        let conn = get_test_connection();
        let debt = insert_debt(institutional_form(), &conn);
        pay_early(debt.id, date!(2025 - 04 - 20), &conn).unwrap();

        let second_payoff = pay_early(debt.id, date!(2025 - 04 - 21), &conn);

        assert_eq!(second_payoff, Err(Error::AlreadySettled(debt.id)));
    }
}
