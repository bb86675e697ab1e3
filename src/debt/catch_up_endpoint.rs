//! Defines the endpoint that generates the scheduled updates that have come
//! due.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{AppState, Error, debt::catch_up::catch_up_all, timezone::local_date_today};

/// The state needed to run the catch-up processor.
#[derive(Debug, Clone)]
pub struct CatchUpState {
    /// The database connection for managing debts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CatchUpState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The request body for running the catch-up processor.
#[derive(Debug, Default, Deserialize)]
pub struct CatchUpForm {
    /// The processing date. Defaults to today in the server's timezone.
    #[serde(default)]
    pub as_of: Option<Date>,
}

/// A route handler that catches every debt up to the processing date and
/// responds with the per-debt outcomes.
pub async fn catch_up_endpoint(
    State(state): State<CatchUpState>,
    Json(form): Json<CatchUpForm>,
) -> Response {
    let as_of = match form.as_of {
        Some(as_of) => as_of,
        None => match local_date_today(&state.local_timezone) {
            Some(today) => today,
            None => {
                tracing::error!("Invalid timezone {}", state.local_timezone);
                return Error::InvalidTimezoneError(state.local_timezone).into_response();
            }
        },
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match catch_up_all(as_of, &connection) {
        Ok(outcomes) => Json(outcomes).into_response(),
        Err(error) => {
            tracing::error!("could not run catch-up: {error}");
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
        get_debt,
        test_utils::{get_test_connection, insert_debt, institutional_form},
    };

    use super::{CatchUpForm, CatchUpState, catch_up_endpoint};

    fn get_test_state() -> CatchUpState {
        CatchUpState {
            db_connection: Arc::new(Mutex::new(get_test_connection())),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    #[tokio::test]
    async fn catches_up_to_the_given_date() {
        let state = get_test_state();
        let debt = {
            let connection = state.db_connection.lock().unwrap();
            insert_debt(institutional_form(), &connection)
        };

        let form = CatchUpForm {
            as_of: Some(date!(2025 - 04 - 15)),
        };
        let response = catch_up_endpoint(State(state.clone()), Json(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_debt(debt.id, &connection).unwrap().current_balance, 900.0);
    }

    #[tokio::test]
    async fn defaults_to_today() {
        let state = get_test_state();

        let response = catch_up_endpoint(State(state), Json(CatchUpForm::default()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_timezone_is_an_internal_error() {
        let state = CatchUpState {
            db_connection: Arc::new(Mutex::new(get_test_connection())),
            local_timezone: "Not/AZone".to_owned(),
        };

        let response = catch_up_endpoint(State(state), Json(CatchUpForm::default()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
