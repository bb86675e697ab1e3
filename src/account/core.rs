use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, database_id::AccountId};

/// The amount of money available for a bank account or credit card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The name of the account with which to associate the balance.
    pub name: String,
    /// The balance.
    pub balance: f64,
    /// When the balance was updated.
    pub date: Date,
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            balance REAL NOT NULL,
            date TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_account(row: &rusqlite::Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let name = row.get(1)?;
    let balance = row.get(2)?;
    let date = row.get(3)?;

    Ok(Account {
        id,
        name,
        balance,
        date,
    })
}

/// Create a new account.
///
/// # Errors
/// Returns [Error::DuplicateAccountName] if an account called `name` already
/// exists, or [Error::SqlError] if there is some other SQL error.
pub fn create_account(
    name: &str,
    balance: f64,
    date: Date,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(
            "INSERT INTO account (name, balance, date) VALUES (?1, ?2, ?3)
             RETURNING id, name, balance, date",
        )?
        .query_row((name, balance, date), map_row_to_account)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateAccountName(name.to_owned()),
            error => error.into(),
        })
}

/// Retrieve an account by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a valid account, or
/// [Error::SqlError] if there is some other SQL error.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    let account = connection.query_one(
        "SELECT id, name, balance, date FROM account WHERE id = :id",
        &[(":id", &id)],
        map_row_to_account,
    )?;

    Ok(account)
}

/// Check that `id` refers to an existing account before tying a debt or a
/// repayment to it.
///
/// # Errors
/// Returns [Error::InvalidAccount] if the account does not exist.
pub fn verify_account(id: AccountId, connection: &Connection) -> Result<(), Error> {
    match get_account(id, connection) {
        Ok(_) => Ok(()),
        Err(Error::NotFound) => Err(Error::InvalidAccount(id)),
        Err(error) => Err(error),
    }
}

/// Get all accounts, sorted by name.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn list_accounts(connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare("SELECT id, name, balance, date FROM account ORDER BY name ASC")?
        .query_map([], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::SqlError))
        .collect()
}

#[cfg(test)]
mod create_table_tests {
    use rusqlite::Connection;

    use super::create_account_table;

    #[test]
    fn sql_is_valid() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        assert_eq!(Ok(()), create_account_table(&connection));
    }
}

#[cfg(test)]
mod account_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::Error;

    use super::{create_account, create_account_table, get_account, list_accounts, verify_account};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_account_table(&conn).unwrap();
        conn
    }

    #[test]
    fn create_and_get_account() {
        let conn = get_test_connection();

        let account = create_account("Everyday", 250.75, date!(2025 - 06 - 01), &conn).unwrap();

        assert!(account.id > 0);
        assert_eq!(account.name, "Everyday");
        assert_eq!(get_account(account.id, &conn).unwrap(), account);
    }

    #[test]
    fn create_fails_on_duplicate_name() {
        let conn = get_test_connection();
        create_account("Everyday", 0.0, date!(2025 - 06 - 01), &conn).unwrap();

        let duplicate = create_account("Everyday", 10.0, date!(2025 - 06 - 02), &conn);

        assert_eq!(
            duplicate,
            Err(Error::DuplicateAccountName("Everyday".to_owned()))
        );
    }

    #[test]
    fn get_fails_on_invalid_id() {
        let conn = get_test_connection();

        assert_eq!(get_account(42, &conn), Err(Error::NotFound));
    }

    #[test]
    fn verify_reports_invalid_account() {
        let conn = get_test_connection();

        assert_eq!(verify_account(42, &conn), Err(Error::InvalidAccount(42)));
    }

    #[test]
    fn list_returns_accounts_sorted_by_name() {
        let conn = get_test_connection();
        let savings = create_account("Savings", 100.0, date!(2025 - 06 - 01), &conn).unwrap();
        let everyday = create_account("Everyday", 50.0, date!(2025 - 06 - 01), &conn).unwrap();

        let accounts = list_accounts(&conn).unwrap();

        assert_eq!(accounts, vec![everyday, savings]);
    }
}
