//! Defines the core data model and database queries for transactions.
//!
//! Transactions are the money-movement log. The debt modules write to it
//! whenever a repayment happens; nothing in this crate mutates a transaction
//! after it has been recorded.

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::{AccountId, TransactionId},
};

/// The direction of a money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money coming in.
    Income,
    /// Money going out.
    Expense,
    /// Money going out against a debt.
    Repayment,
}

impl TransactionKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Repayment => "repayment",
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "repayment" => Ok(Self::Repayment),
            other => Err(FromSqlError::Other(
                format!("unknown transaction kind {other}").into(),
            )),
        }
    }
}

/// An event where money moved in or out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money that moved.
    pub amount: f64,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The direction of the movement.
    pub kind: TransactionKind,
    /// The account the money moved through, if known.
    pub account_id: Option<AccountId>,
}

/// Create a new transaction in the database.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn create_transaction(
    amount: f64,
    date: Date,
    description: &str,
    kind: TransactionKind,
    account_id: Option<AccountId>,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (amount, date, description, kind, account_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, amount, date, description, kind, account_id",
        )?
        .query_row(
            (amount, date, description, kind, account_id),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection.query_one(
        "SELECT id, amount, date, description, kind, account_id FROM \"transaction\" WHERE id = :id",
        &[(":id", &id)],
        map_transaction_row,
    )?;

    Ok(transaction)
}

/// Get all transactions, newest first.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, amount, date, description, kind, account_id FROM \"transaction\"
             ORDER BY date DESC, id DESC",
        )?
        .query_map([], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                kind TEXT NOT NULL,
                account_id INTEGER,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = row.get(1)?;
    let date = row.get(2)?;
    let description = row.get(3)?;
    let kind = row.get(4)?;
    let account_id = row.get(5)?;

    Ok(Transaction {
        id,
        amount,
        date,
        description,
        kind,
        account_id,
    })
}

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{Error, db::initialize};

    use super::{TransactionKind, create_transaction, get_transaction, list_transactions};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn create_succeeds() {
        let conn = get_test_connection();
        let amount = 12.3;

        let transaction = create_transaction(
            amount,
            date!(2025 - 10 - 05),
            "repaid car loan",
            TransactionKind::Repayment,
            None,
            &conn,
        )
        .unwrap();

        assert_eq!(transaction.amount, amount);
        assert_eq!(transaction.kind, TransactionKind::Repayment);
        assert_eq!(get_transaction(transaction.id, &conn).unwrap(), transaction);
    }

    #[test]
    fn get_fails_on_invalid_id() {
        let conn = get_test_connection();

        assert_eq!(get_transaction(42, &conn), Err(Error::NotFound));
    }

    #[test]
    fn list_returns_newest_first() {
        let conn = get_test_connection();
        let older = create_transaction(
            1.0,
            date!(2025 - 10 - 01),
            "",
            TransactionKind::Expense,
            None,
            &conn,
        )
        .unwrap();
        let newer = create_transaction(
            2.0,
            date!(2025 - 10 - 05),
            "",
            TransactionKind::Income,
            None,
            &conn,
        )
        .unwrap();

        let transactions = list_transactions(&conn).unwrap();

        assert_eq!(transactions, vec![newer, older]);
    }
}
