//! Creates the application's database schema.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error,
    account::create_account_table,
    debt::{create_debt_table, create_debt_update_table},
    transaction::create_transaction_table,
};

/// Create the tables for the domain models.
///
/// The tables are created inside a single exclusive transaction so that a
/// half-initialized schema is never visible to other connections.
///
/// # Errors
/// Returns an error if any table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Cascading deletes from debt to its updates need foreign key
    // enforcement, which SQLite leaves off per connection.
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_account_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_debt_table(&transaction)?;
    create_debt_update_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
