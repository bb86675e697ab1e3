//! Defines the scheduled update records that make up a debt's payment
//! history, and the transition of a pending update to paid or skipped.

use rusqlite::{
    Connection, Transaction as SqlTransaction,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::{DebtId, DebtUpdateId, TransactionId},
    debt::{
        core::{DebtStatus, get_debt},
        installment::round2,
    },
    transaction::{TransactionKind, create_transaction},
};

/// Whether a scheduled payment happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    /// The payment was made.
    Paid,
    /// The payment has come due but has not been confirmed yet.
    Pending,
    /// The payment was skipped; its amount goes back onto the balance.
    Skipped,
}

impl UpdateStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
            Self::Skipped => "skipped",
        }
    }
}

impl ToSql for UpdateStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for UpdateStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "paid" => Ok(Self::Paid),
            "pending" => Ok(Self::Pending),
            "skipped" => Ok(Self::Skipped),
            other => Err(FromSqlError::Other(
                format!("unknown update status {other}").into(),
            )),
        }
    }
}

/// One scheduled payment in a debt's history.
///
/// A debt owns its updates: deleting the debt deletes them. The update holds
/// a non-owning reference to the transaction that recorded the money
/// movement, if one exists. A `paid` update is immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtUpdate {
    /// The ID of the update.
    pub id: DebtUpdateId,
    /// The debt this update belongs to.
    pub debt_id: DebtId,
    /// The date the payment was scheduled for or made on.
    pub date: Date,
    /// The effective amount applied to the balance.
    pub amount: f64,
    /// Whether the payment happened.
    pub status: UpdateStatus,
    /// The transaction that recorded the money movement, if any.
    pub transaction_id: Option<TransactionId>,
}

/// Create the debt update table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_debt_update_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS debt_update (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                debt_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                amount REAL NOT NULL,
                status TEXT NOT NULL,
                transaction_id INTEGER,
                FOREIGN KEY(debt_id) REFERENCES debt(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_debt_update_debt ON debt_update(debt_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a DebtUpdate.
pub fn map_debt_update_row(row: &rusqlite::Row) -> Result<DebtUpdate, rusqlite::Error> {
    Ok(DebtUpdate {
        id: row.get(0)?,
        debt_id: row.get(1)?,
        date: row.get(2)?,
        amount: row.get(3)?,
        status: row.get(4)?,
        transaction_id: row.get(5)?,
    })
}

/// Record a scheduled update for a debt.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn create_debt_update(
    debt_id: DebtId,
    date: Date,
    amount: f64,
    status: UpdateStatus,
    transaction_id: Option<TransactionId>,
    connection: &Connection,
) -> Result<DebtUpdate, Error> {
    let update = connection
        .prepare(
            "INSERT INTO debt_update (debt_id, date, amount, status, transaction_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, debt_id, date, amount, status, transaction_id",
        )?
        .query_row(
            (debt_id, date, amount, status, transaction_id),
            map_debt_update_row,
        )?;

    Ok(update)
}

/// Get the scheduled updates of a debt, oldest first.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `debt_id` does not refer to a valid debt,
/// - or [Error::SqlError] there is some other SQL error.
pub fn list_updates(debt_id: DebtId, connection: &Connection) -> Result<Vec<DebtUpdate>, Error> {
    // Distinguish an unknown debt from a debt with no history yet.
    get_debt(debt_id, connection)?;

    connection
        .prepare(
            "SELECT id, debt_id, date, amount, status, transaction_id FROM debt_update
             WHERE debt_id = :debt_id ORDER BY date ASC, id ASC",
        )?
        .query_map(&[(":debt_id", &debt_id)], map_debt_update_row)?
        .map(|maybe_update| maybe_update.map_err(Error::SqlError))
        .collect()
}

fn get_update(id: DebtUpdateId, connection: &Connection) -> Result<DebtUpdate, Error> {
    let update = connection.query_one(
        "SELECT id, debt_id, date, amount, status, transaction_id FROM debt_update WHERE id = :id",
        &[(":id", &id)],
        map_debt_update_row,
    )?;

    Ok(update)
}

/// How the user resolved a pending update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateResolution {
    /// The payment was made; record the money movement.
    Paid,
    /// The payment did not happen; put the amount back on the balance.
    Skipped,
}

/// Resolve a pending update as paid or skipped.
///
/// Marking an update paid records a repayment transaction against the debt's
/// linked account and points the update at it. Marking it skipped restores
/// the update's amount to the debt balance and reactivates the debt if the
/// skipped installment was the one that settled it.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `debt_id` or `update_id` is unknown, or the update
///   belongs to a different debt,
/// - [Error::UpdateNotPending] if the update was already resolved,
/// - or [Error::SqlError] there is some other SQL error.
pub fn resolve_update(
    debt_id: DebtId,
    update_id: DebtUpdateId,
    resolution: UpdateResolution,
    resolved_on: Date,
    connection: &Connection,
) -> Result<DebtUpdate, Error> {
    let debt = get_debt(debt_id, connection)?;
    let update = get_update(update_id, connection)?;

    if update.debt_id != debt.id {
        return Err(Error::NotFound);
    }
    if update.status != UpdateStatus::Pending {
        return Err(Error::UpdateNotPending(update_id));
    }

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Immediate)?;

    match resolution {
        UpdateResolution::Paid => {
            let money_movement = create_transaction(
                update.amount,
                resolved_on,
                &format!("Installment for {}", debt.name),
                TransactionKind::Repayment,
                debt.account_id,
                &transaction,
            )?;

            transaction.execute(
                "UPDATE debt_update SET status = 'paid', transaction_id = ?1 WHERE id = ?2",
                (money_movement.id, update.id),
            )?;
        }
        UpdateResolution::Skipped => {
            transaction.execute(
                "UPDATE debt_update SET status = 'skipped' WHERE id = ?1",
                (update.id,),
            )?;

            let restored_balance = round2(debt.current_balance + update.amount);
            transaction.execute(
                "UPDATE debt SET current_balance = ?1, status = ?2 WHERE id = ?3",
                (restored_balance, DebtStatus::Active, debt.id),
            )?;
        }
    }

    transaction.commit()?;

    get_update(update_id, connection)
}
