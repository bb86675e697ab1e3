//! Ledgerly is a web service for tracking personal debts: institutional
//! loans as well as informal money lent to and borrowed from other people.
//!
//! This library provides a JSON REST API backed by SQLite. Debts carry a
//! repayment schedule; the service generates the scheduled updates, keeps
//! balances in step with them, and nets informal debts per counterparty.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use time::Date;
use tokio::signal;

mod account;
mod app_state;
mod database_id;
mod db;
mod debt;
pub mod endpoints;
mod logging;
mod routing;
mod timezone;
mod transaction;

pub use account::{Account, get_account, list_accounts};
pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use debt::{
    CatchUpOutcome, CounterpartyBalance, Debt, DebtForm, DebtKind, DebtRole, DebtStatus,
    DebtUpdate, GroupBalance, NewDebt, PaymentFrequency, RepaymentOutcome, UpdateResolution,
    UpdateStatus, batch_repay, catch_up_all, counterparty_balances, create_debt, delete_debt,
    get_debt, group_balances, installment_amount, list_debts, list_updates, pay_early,
    resolve_update, round2, settle_counterparty,
};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use transaction::{Transaction, TransactionKind, create_transaction, get_transaction};

use crate::database_id::{AccountId, DebtId, DebtUpdateId};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A money amount that must be positive was zero or negative.
    ///
    /// Callers should pass in the name of the offending field so the client
    /// knows what to fix.
    #[error("{field} must be greater than zero, got {value}")]
    InvalidAmount {
        /// The name of the field holding the bad amount.
        field: &'static str,
        /// The amount that was rejected.
        value: f64,
    },

    /// An empty string was used as a debt name.
    #[error("Debt name cannot be empty")]
    EmptyDebtName,

    /// A lent or borrowed debt was created without naming the other person.
    #[error("a {0} debt requires a counterparty")]
    MissingCounterparty(DebtRole),

    /// The term must be a positive number of payment periods when given.
    #[error("the term must be a positive number of payments, got {0}")]
    InvalidTerm(i64),

    /// Neither a term nor an explicit installment amount was supplied, so
    /// there is no way to work out the payment schedule.
    #[error("an installment amount is required when no term is given")]
    MissingInstallment,

    /// The opening balance of a debt cannot exceed its principal.
    #[error("the opening balance {balance} exceeds the principal {principal}")]
    BalanceExceedsPrincipal {
        /// The opening balance that was rejected.
        balance: f64,
        /// The principal it was checked against.
        principal: f64,
    },

    /// A date in the future was used for a repayment.
    ///
    /// Repayments record money that has already moved, therefore future
    /// dates are not allowed.
    #[error("{0} is a date in the future, which is not allowed")]
    FutureDate(Date),

    /// The account ID used to create a debt or receive a repayment did not
    /// match a valid account.
    #[error("the account ID {0} does not refer to a valid account")]
    InvalidAccount(AccountId),

    /// The specified account name already exists in the database.
    #[error("the account \"{0}\" already exists in the database")]
    DuplicateAccountName(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An operation that pays down a debt was applied to a debt whose
    /// balance is already zero.
    #[error("debt {0} is already settled")]
    AlreadySettled(DebtId),

    /// A batch repayment was larger than the combined outstanding balance of
    /// the targeted debts.
    #[error("cannot repay {requested:.2}, only {available:.2} is outstanding")]
    Overpayment {
        /// The total the caller asked to repay.
        requested: f64,
        /// The combined balance of the targeted debts.
        available: f64,
    },

    /// A concurrent catch-up cycle changed the debt first.
    ///
    /// The processor retries once against refreshed state before surfacing
    /// this error.
    #[error("debt {0} was modified concurrently")]
    Conflict(DebtId),

    /// A debt reached the catch-up processor without a positive installment
    /// amount. The debt is skipped and reported instead of processed.
    #[error("debt {0} has no positive installment amount")]
    ZeroInstallment(DebtId),

    /// Tried to resolve a scheduled update that has already been marked paid
    /// or skipped.
    #[error("update {0} has already been resolved")]
    UpdateNotPending(DebtUpdateId),

    /// Tried to delete a debt that does not exist
    #[error("tried to delete a debt that is not in the database")]
    DeleteMissingDebt,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code the error maps to.
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidAmount { .. }
            | Error::EmptyDebtName
            | Error::MissingCounterparty(_)
            | Error::InvalidTerm(_)
            | Error::MissingInstallment
            | Error::BalanceExceedsPrincipal { .. }
            | Error::FutureDate(_)
            | Error::InvalidAccount(_)
            | Error::DuplicateAccountName(_)
            | Error::Overpayment { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound | Error::DeleteMissingDebt => StatusCode::NOT_FOUND,
            Error::AlreadySettled(_) | Error::Conflict(_) | Error::UpdateNotPending(_) => {
                StatusCode::CONFLICT
            }
            Error::ZeroInstallment(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::SqlError(_) | Error::DatabaseLockError | Error::InvalidTimezoneError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        // Internal errors are not intended to be shown to the client.
        if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {}", self);

            return (
                status_code,
                Json(serde_json::json!({
                    "error": "An unexpected error occurred, check the server logs for more details."
                })),
            )
                .into_response();
        }

        (
            status_code,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::http::StatusCode;

    use super::Error;

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(Error::NotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_errors_map_to_400() {
        assert_eq!(
            Error::InvalidAmount {
                field: "principal",
                value: -1.0
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Overpayment {
                requested: 100.0,
                available: 50.0
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn conflicts_map_to_409() {
        assert_eq!(Error::Conflict(1).status_code(), StatusCode::CONFLICT);
        assert_eq!(Error::AlreadySettled(1).status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn sql_errors_map_from_rusqlite() {
        assert_eq!(
            Error::from(rusqlite::Error::QueryReturnedNoRows),
            Error::NotFound
        );
    }
}
