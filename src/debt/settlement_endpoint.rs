//! Defines the endpoint for repaying a set of debts with one amount.

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
    database_id::{AccountId, DebtId},
    debt::settlement::batch_repay,
    timezone::local_date_today,
};

/// The state needed to run a batch repayment.
#[derive(Debug, Clone)]
pub struct BatchRepayState {
    /// The database connection for managing debts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for BatchRepayState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The request body for a batch repayment.
#[derive(Debug, Deserialize)]
pub struct BatchRepayForm {
    /// The debts to repay, in allocation order.
    pub debt_ids: Vec<DebtId>,
    /// The total amount to allocate across the debts.
    pub amount: f64,
    /// When the money moved. Defaults to today, must not be in the future.
    #[serde(default)]
    pub date: Option<Date>,
    /// The account the money came out of.
    #[serde(default)]
    pub account_id: Option<AccountId>,
}

/// A route handler that allocates one amount across a set of debts and
/// responds with the per-debt outcomes.
pub async fn batch_repay_endpoint(
    State(state): State<BatchRepayState>,
    Json(form): Json<BatchRepayForm>,
) -> Response {
    let Some(today) = local_date_today(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let date = form.date.unwrap_or(today);
    if date > today {
        tracing::error!("Tried to record a repayment with a future date");
        return Error::FutureDate(date).into_response();
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match batch_repay(&form.debt_ids, form.amount, date, form.account_id, &connection) {
        Ok(outcomes) => Json(outcomes).into_response(),
        Err(error) => {
            tracing::error!("could not run batch repayment: {error}");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
    use time::macros::date;

    use crate::debt::core::{
        DebtRole, get_debt,
        test_utils::{get_test_connection, insert_debt, personal_form},
    };

    use super::{BatchRepayForm, BatchRepayState, batch_repay_endpoint};

    fn get_test_state() -> BatchRepayState {
        BatchRepayState {
            db_connection: Arc::new(Mutex::new(get_test_connection())),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    #[tokio::test]
    async fn repays_the_named_debts() {
        let state = get_test_state();
        let debt = {
            let connection = state.db_connection.lock().unwrap();
            insert_debt(personal_form(DebtRole::Borrowed, "Sam", 100.0), &connection)
        };

        let form = BatchRepayForm {
            debt_ids: vec![debt.id],
            amount: 60.0,
            date: Some(date!(2025 - 03 - 01)),
            account_id: None,
        };
        let response = batch_repay_endpoint(State(state.clone()), Json(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_debt(debt.id, &connection).unwrap().current_balance, 40.0);
    }

    #[tokio::test]
    async fn rejects_a_future_date() {
        let state = get_test_state();

        let form = BatchRepayForm {
            debt_ids: vec![],
            amount: 60.0,
            date: Some(date!(2999 - 01 - 01)),
            account_id: None,
        };
        let response = batch_repay_endpoint(State(state), Json(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn overpayment_is_a_bad_request() {
        let state = get_test_state();
        let debt = {
            let connection = state.db_connection.lock().unwrap();
            insert_debt(personal_form(DebtRole::Borrowed, "Sam", 100.0), &connection)
        };

        let form = BatchRepayForm {
            debt_ids: vec![debt.id],
            amount: 150.0,
            date: Some(date!(2025 - 03 - 01)),
            account_id: None,
        };
        let response = batch_repay_endpoint(State(state), Json(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
