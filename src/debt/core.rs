//! Defines the core data models and database queries for debts.

use std::fmt::Display;

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};

use crate::{
    Error,
    account::verify_account,
    database_id::{AccountId, DebtId},
    debt::installment::installment_amount,
};

// ============================================================================
// MODELS
// ============================================================================

/// Which side of a debt the user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtRole {
    /// Money owed to a bank or another institution.
    Institutional,
    /// Money the user lent to another person.
    Lent,
    /// Money the user borrowed from another person.
    Borrowed,
}

impl DebtRole {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Institutional => "institutional",
            Self::Lent => "lent",
            Self::Borrowed => "borrowed",
        }
    }
}

impl Display for DebtRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for DebtRole {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for DebtRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "institutional" => Ok(Self::Institutional),
            "lent" => Ok(Self::Lent),
            "borrowed" => Ok(Self::Borrowed),
            other => Err(FromSqlError::Other(
                format!("unknown debt role {other}").into(),
            )),
        }
    }
}

/// How often an installment falls due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentFrequency {
    /// Every 7 days.
    Weekly,
    /// Every 14 days.
    Biweekly,
    /// Every calendar month, clamping to the last day of shorter months.
    Monthly,
}

impl PaymentFrequency {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
        }
    }

    /// The next due date one payment period after `date`.
    pub fn advance(&self, date: Date) -> Date {
        match self {
            Self::Weekly => date + Duration::days(7),
            Self::Biweekly => date + Duration::days(14),
            Self::Monthly => add_one_month(date),
        }
    }
}

impl ToSql for PaymentFrequency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PaymentFrequency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(FromSqlError::Other(
                format!("unknown payment frequency {other}").into(),
            )),
        }
    }
}

fn add_one_month(date: Date) -> Date {
    let (year, month) = match date.month() {
        Month::December => (date.year() + 1, Month::January),
        month => (date.year(), month.next()),
    };
    let day = date.day().min(last_day_of_month(year, month));

    Date::from_calendar_date(year, month, day).expect("day is clamped to the month length")
}

fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 {
                29
            } else {
                28
            }
        }
    }
}

/// Whether a debt still has an outstanding balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    /// The debt still has money outstanding.
    Active,
    /// The balance has reached zero.
    Settled,
}

impl DebtStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Settled => "settled",
        }
    }
}

impl ToSql for DebtStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for DebtStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "active" => Ok(Self::Active),
            "settled" => Ok(Self::Settled),
            other => Err(FromSqlError::Other(
                format!("unknown debt status {other}").into(),
            )),
        }
    }
}

/// A tracked debt and its repayment schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    /// The ID of the debt.
    pub id: DebtId,
    /// The display name of the debt, e.g. "Car loan".
    pub name: String,
    /// Which side of the debt the user is on.
    pub role: DebtRole,
    /// The amount originally owed.
    pub principal: f64,
    /// The amount still outstanding. Never negative.
    pub current_balance: f64,
    /// The fixed amount each scheduled payment pays off.
    pub installment_amount: f64,
    /// How often an installment falls due.
    pub frequency: PaymentFrequency,
    /// The total number of scheduled payments, if known.
    pub term: Option<i64>,
    /// When the debt started.
    pub start_date: Date,
    /// When the next installment falls due.
    pub next_due_date: Date,
    /// The other person in a lent or borrowed debt.
    pub counterparty: Option<String>,
    /// An arbitrary label grouping related debts for aggregate netting.
    pub settlement_group: Option<String>,
    /// Whether the debt still has an outstanding balance.
    pub status: DebtStatus,
    /// The account the repayments come out of, if linked.
    pub account_id: Option<AccountId>,
}

/// The role-specific part of a validated new debt.
///
/// Institutional debts may be linked to one of the user's accounts, while
/// person-to-person debts must name the other person and may be grouped for
/// settlement.
#[derive(Debug, Clone, PartialEq)]
pub enum DebtKind {
    /// Money owed to a bank or another institution.
    Institutional {
        /// The account the repayments come out of, if linked.
        account_id: Option<AccountId>,
    },
    /// Money lent to another person.
    Lent {
        /// The person who owes the money back.
        counterparty: String,
        /// An optional settlement group label.
        settlement_group: Option<String>,
    },
    /// Money borrowed from another person.
    Borrowed {
        /// The person the money is owed to.
        counterparty: String,
        /// An optional settlement group label.
        settlement_group: Option<String>,
    },
}

impl DebtKind {
    fn role(&self) -> DebtRole {
        match self {
            Self::Institutional { .. } => DebtRole::Institutional,
            Self::Lent { .. } => DebtRole::Lent,
            Self::Borrowed { .. } => DebtRole::Borrowed,
        }
    }

    fn counterparty(&self) -> Option<&str> {
        match self {
            Self::Institutional { .. } => None,
            Self::Lent { counterparty, .. } | Self::Borrowed { counterparty, .. } => {
                Some(counterparty)
            }
        }
    }

    fn settlement_group(&self) -> Option<&str> {
        match self {
            Self::Institutional { .. } => None,
            Self::Lent {
                settlement_group, ..
            }
            | Self::Borrowed {
                settlement_group, ..
            } => settlement_group.as_deref(),
        }
    }

    fn account_id(&self) -> Option<AccountId> {
        match self {
            Self::Institutional { account_id } => *account_id,
            Self::Lent { .. } | Self::Borrowed { .. } => None,
        }
    }
}

/// A new debt that has passed boundary validation.
///
/// Build one with [DebtForm::validate]; the invariants below hold for every
/// value of this type:
/// - `principal > 0`
/// - `0 <= current_balance <= principal`
/// - `installment_amount > 0`
#[derive(Debug, Clone, PartialEq)]
pub struct NewDebt {
    /// The display name of the debt.
    pub name: String,
    /// The role-specific fields.
    pub kind: DebtKind,
    /// The amount originally owed.
    pub principal: f64,
    /// The amount outstanding at creation.
    pub current_balance: f64,
    /// The fixed amount each scheduled payment pays off.
    pub installment_amount: f64,
    /// How often an installment falls due.
    pub frequency: PaymentFrequency,
    /// The total number of scheduled payments, if known.
    pub term: Option<i64>,
    /// When the debt started.
    pub start_date: Date,
}

/// The request body for creating a debt, validated into a [NewDebt] before
/// it reaches the database.
#[derive(Debug, Clone, Deserialize)]
pub struct DebtForm {
    /// The display name of the debt.
    pub name: String,
    /// Which side of the debt the user is on.
    pub role: DebtRole,
    /// The amount originally owed.
    pub principal: f64,
    /// The amount outstanding at creation. Defaults to the principal.
    #[serde(default)]
    pub current_balance: Option<f64>,
    /// The fixed payment amount. Required when no term is given; overrides
    /// the computed amount when both are given.
    #[serde(default)]
    pub installment_amount: Option<f64>,
    /// How often an installment falls due.
    pub frequency: PaymentFrequency,
    /// The total number of scheduled payments, in payment-period units.
    #[serde(default)]
    pub term: Option<i64>,
    /// When the debt started.
    pub start_date: Date,
    /// The other person, required for lent and borrowed debts.
    #[serde(default)]
    pub counterparty: Option<String>,
    /// An optional settlement group label for lent and borrowed debts.
    #[serde(default)]
    pub settlement_group: Option<String>,
    /// The account to link an institutional debt to.
    #[serde(default)]
    pub account_id: Option<AccountId>,
}

impl DebtForm {
    /// Validate the form into a [NewDebt].
    ///
    /// # Errors
    /// Returns the first validation error found: an empty name, a
    /// non-positive principal, an opening balance outside `[0, principal]`,
    /// a non-positive term, a missing installment amount when no term is
    /// given, or a missing counterparty on a lent or borrowed debt.
    pub fn validate(self) -> Result<NewDebt, Error> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(Error::EmptyDebtName);
        }

        if self.principal <= 0.0 {
            return Err(Error::InvalidAmount {
                field: "principal",
                value: self.principal,
            });
        }

        let current_balance = self.current_balance.unwrap_or(self.principal);
        if current_balance < 0.0 {
            return Err(Error::InvalidAmount {
                field: "current_balance",
                value: current_balance,
            });
        }
        if current_balance > self.principal {
            return Err(Error::BalanceExceedsPrincipal {
                balance: current_balance,
                principal: self.principal,
            });
        }

        if let Some(term) = self.term
            && term <= 0
        {
            return Err(Error::InvalidTerm(term));
        }

        let installment = match self.installment_amount {
            Some(amount) => amount,
            None => {
                installment_amount(self.principal, self.term).ok_or(Error::MissingInstallment)?
            }
        };
        if installment <= 0.0 {
            return Err(Error::InvalidAmount {
                field: "installment_amount",
                value: installment,
            });
        }

        let kind = match self.role {
            DebtRole::Institutional => DebtKind::Institutional {
                account_id: self.account_id,
            },
            DebtRole::Lent | DebtRole::Borrowed => {
                let counterparty = self
                    .counterparty
                    .as_deref()
                    .map(str::trim)
                    .filter(|counterparty| !counterparty.is_empty())
                    .map(str::to_owned)
                    .ok_or(Error::MissingCounterparty(self.role))?;

                if self.role == DebtRole::Lent {
                    DebtKind::Lent {
                        counterparty,
                        settlement_group: self.settlement_group,
                    }
                } else {
                    DebtKind::Borrowed {
                        counterparty,
                        settlement_group: self.settlement_group,
                    }
                }
            }
        };

        Ok(NewDebt {
            name,
            kind,
            principal: self.principal,
            current_balance,
            installment_amount: installment,
            frequency: self.frequency,
            term: self.term,
            start_date: self.start_date,
        })
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new debt in the database.
///
/// The first installment falls due one payment period after the start date.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAccount] if the linked account does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_debt(new_debt: NewDebt, connection: &Connection) -> Result<Debt, Error> {
    if let Some(account_id) = new_debt.kind.account_id() {
        verify_account(account_id, connection)?;
    }

    let status = if new_debt.current_balance > 0.0 {
        DebtStatus::Active
    } else {
        DebtStatus::Settled
    };
    let next_due_date = new_debt.frequency.advance(new_debt.start_date);

    let debt = connection
        .prepare(
            "INSERT INTO debt (
                name, role, principal, current_balance, installment_amount, frequency,
                term, start_date, next_due_date, counterparty, settlement_group, status,
                account_id
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             RETURNING id, name, role, principal, current_balance, installment_amount,
                frequency, term, start_date, next_due_date, counterparty, settlement_group,
                status, account_id",
        )?
        .query_row(
            (
                &new_debt.name,
                new_debt.kind.role(),
                new_debt.principal,
                new_debt.current_balance,
                new_debt.installment_amount,
                new_debt.frequency,
                new_debt.term,
                new_debt.start_date,
                next_due_date,
                new_debt.kind.counterparty(),
                new_debt.kind.settlement_group(),
                status,
                new_debt.kind.account_id(),
            ),
            map_debt_row,
        )?;

    Ok(debt)
}

/// Retrieve a debt from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid debt,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_debt(id: DebtId, connection: &Connection) -> Result<Debt, Error> {
    let debt = connection.query_one(
        &format!("{DEBT_SELECT} WHERE id = :id"),
        &[(":id", &id)],
        map_debt_row,
    )?;

    Ok(debt)
}

/// Get all debts, oldest first.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_debts(connection: &Connection) -> Result<Vec<Debt>, Error> {
    connection
        .prepare(&format!("{DEBT_SELECT} ORDER BY id ASC"))?
        .query_map([], map_debt_row)?
        .map(|maybe_debt| maybe_debt.map_err(Error::SqlError))
        .collect()
}

/// Get the active debts whose next installment is due on or before `as_of`,
/// i.e. the debts the catch-up processor has work to do for.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_due_debts(as_of: Date, connection: &Connection) -> Result<Vec<Debt>, Error> {
    connection
        .prepare(&format!(
            "{DEBT_SELECT} WHERE status = 'active' AND next_due_date <= :as_of ORDER BY id ASC"
        ))?
        .query_map(&[(":as_of", &as_of)], map_debt_row)?
        .map(|maybe_debt| maybe_debt.map_err(Error::SqlError))
        .collect()
}

/// Get the active debts with `counterparty`, oldest first.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_unsettled_debts_for_counterparty(
    counterparty: &str,
    connection: &Connection,
) -> Result<Vec<Debt>, Error> {
    connection
        .prepare(&format!(
            "{DEBT_SELECT} WHERE status = 'active' AND counterparty = :counterparty ORDER BY id ASC"
        ))?
        .query_map(&[(":counterparty", &counterparty)], map_debt_row)?
        .map(|maybe_debt| maybe_debt.map_err(Error::SqlError))
        .collect()
}

type RowsAffected = usize;

/// Delete a debt. Its scheduled updates are deleted with it.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn delete_debt(id: DebtId, connection: &Connection) -> Result<RowsAffected, Error> {
    connection
        .execute("DELETE FROM debt WHERE id = :id", &[(":id", &id)])
        .map_err(Error::from)
}

/// Create the debt table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_debt_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS debt (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                role TEXT NOT NULL,
                principal REAL NOT NULL,
                current_balance REAL NOT NULL,
                installment_amount REAL NOT NULL,
                frequency TEXT NOT NULL,
                term INTEGER,
                start_date TEXT NOT NULL,
                next_due_date TEXT NOT NULL,
                counterparty TEXT,
                settlement_group TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                account_id INTEGER,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('debt', 0)",
        (),
    )?;

    // Index used by the catch-up processor's due-debt scan.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_debt_status_due ON debt(status, next_due_date);",
        (),
    )?;

    Ok(())
}

const DEBT_SELECT: &str = "SELECT id, name, role, principal, current_balance, \
    installment_amount, frequency, term, start_date, next_due_date, counterparty, \
    settlement_group, status, account_id FROM debt";

/// Map a database row to a Debt.
pub fn map_debt_row(row: &Row) -> Result<Debt, rusqlite::Error> {
    Ok(Debt {
        id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        principal: row.get(3)?,
        current_balance: row.get(4)?,
        installment_amount: row.get(5)?,
        frequency: row.get(6)?,
        term: row.get(7)?,
        start_date: row.get(8)?,
        next_due_date: row.get(9)?,
        counterparty: row.get(10)?,
        settlement_group: row.get(11)?,
        status: row.get(12)?,
        account_id: row.get(13)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod frequency_tests {
    use time::macros::date;

    use super::PaymentFrequency;

    #[test]
    fn weekly_advances_seven_days() {
        assert_eq!(
            PaymentFrequency::Weekly.advance(date!(2025 - 01 - 28)),
            date!(2025 - 02 - 04)
        );
    }

    #[test]
    fn biweekly_advances_fourteen_days() {
        assert_eq!(
            PaymentFrequency::Biweekly.advance(date!(2025 - 01 - 28)),
            date!(2025 - 02 - 11)
        );
    }

    #[test]
    fn monthly_advances_one_calendar_month() {
        assert_eq!(
            PaymentFrequency::Monthly.advance(date!(2025 - 01 - 15)),
            date!(2025 - 02 - 15)
        );
    }

    #[test]
    fn monthly_clamps_to_the_last_day_of_shorter_months() {
        assert_eq!(
            PaymentFrequency::Monthly.advance(date!(2025 - 01 - 31)),
            date!(2025 - 02 - 28)
        );
        assert_eq!(
            PaymentFrequency::Monthly.advance(date!(2024 - 01 - 31)),
            date!(2024 - 02 - 29)
        );
    }

    #[test]
    fn monthly_rolls_over_the_year() {
        assert_eq!(
            PaymentFrequency::Monthly.advance(date!(2024 - 12 - 15)),
            date!(2025 - 01 - 15)
        );
    }
}


#[cfg(test)]
mod database_tests {
    use time::macros::date;

    use crate::{
        Error,
        account::create_account_table,
        debt::core::test_utils::{get_test_connection, insert_debt, institutional_form},
    };

    use super::{DebtStatus, create_debt, delete_debt, get_debt, list_debts, list_due_debts};

    #[test]
    fn create_sets_first_due_date_one_period_after_start() {
        let conn = get_test_connection();

        let debt = insert_debt(institutional_form(), &conn);

        assert!(debt.id > 0);
        assert_eq!(debt.next_due_date, date!(2025 - 02 - 15));
        assert_eq!(debt.status, DebtStatus::Active);
        assert_eq!(get_debt(debt.id, &conn).unwrap(), debt);
    }

    #[test]
    fn create_fails_on_invalid_account() {
        let conn = get_test_connection();
        let mut form = institutional_form();
        form.account_id = Some(42);

        let result = create_debt(form.validate().unwrap(), &conn);

        assert_eq!(result, Err(Error::InvalidAccount(42)));
    }

    #[test]
    fn get_fails_on_invalid_id() {
        let conn = get_test_connection();

        assert_eq!(get_debt(42, &conn), Err(Error::NotFound));
    }

    #[test]
    fn list_returns_debts_oldest_first() {
        let conn = get_test_connection();
        let first = insert_debt(institutional_form(), &conn);
        let second = insert_debt(institutional_form(), &conn);

        assert_eq!(list_debts(&conn).unwrap(), vec![first, second]);
    }

    #[test]
    fn due_debts_excludes_debts_not_yet_due() {
        let conn = get_test_connection();
        let debt = insert_debt(institutional_form(), &conn);

        // Due 2025-02-15: not due in January, due from mid-February on.
        assert_eq!(list_due_debts(date!(2025 - 01 - 31), &conn).unwrap(), []);
        assert_eq!(
            list_due_debts(date!(2025 - 02 - 15), &conn).unwrap(),
            vec![debt]
        );
    }

    #[test]
    fn delete_removes_the_debt() {
        let conn = get_test_connection();
        let debt = insert_debt(institutional_form(), &conn);

        let rows_affected = delete_debt(debt.id, &conn).unwrap();

        assert_eq!(rows_affected, 1);
        assert_eq!(get_debt(debt.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn table_sql_is_valid() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        create_account_table(&conn).unwrap();

        assert_eq!(Ok(()), super::create_debt_table(&conn));
    }
}
