//! Defines the endpoints for the per-counterparty and per-group balance
//! views and the counterparty "settle up".

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    database_id::AccountId,
    debt::{
        core::list_debts,
        counterparty::{counterparty_balances, group_balances},
        settlement::settle_counterparty,
    },
    timezone::local_date_today,
};

/// The state needed to aggregate and settle counterparty balances.
#[derive(Debug, Clone)]
pub struct CounterpartyState {
    /// The database connection for managing debts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CounterpartyState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler that nets person-to-person debts per counterparty,
/// largest net position first.
pub async fn counterparty_balances_endpoint(
    State(state): State<CounterpartyState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match list_debts(&connection) {
        Ok(debts) => Json(counterparty_balances(&debts)).into_response(),
        Err(error) => {
            tracing::error!("could not list debts: {error}");
            error.into_response()
        }
    }
}

/// A route handler that sums balances per settlement group.
pub async fn group_balances_endpoint(State(state): State<CounterpartyState>) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match list_debts(&connection) {
        Ok(debts) => Json(group_balances(&debts)).into_response(),
        Err(error) => {
            tracing::error!("could not list debts: {error}");
            error.into_response()
        }
    }
}

/// The request body for settling up with one counterparty.
#[derive(Debug, Deserialize)]
pub struct SettleUpForm {
    /// The counterparty to settle every open debt with.
    pub counterparty: String,
    /// When the money moved. Defaults to today, must not be in the future.
    #[serde(default)]
    pub date: Option<Date>,
    /// The account the money came out of.
    #[serde(default)]
    pub account_id: Option<AccountId>,
}

/// A route handler that settles every open debt with one counterparty and
/// responds with the per-debt outcomes.
pub async fn settle_up_endpoint(
    State(state): State<CounterpartyState>,
    Json(form): Json<SettleUpForm>,
) -> Response {
    let Some(today) = local_date_today(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let date = form.date.unwrap_or(today);
    if date > today {
        tracing::error!("Tried to record a settlement with a future date");
        return Error::FutureDate(date).into_response();
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match settle_counterparty(&form.counterparty, date, form.account_id, &connection) {
        Ok(outcomes) => Json(outcomes).into_response(),
        Err(error) => {
            tracing::error!(
                "could not settle up with {}: {error}",
                form.counterparty
            );
            error.into_response()
        }
    }
}
