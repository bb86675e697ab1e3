//! Defines the endpoint for paying off the full remaining balance of a debt.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error, database_id::DebtId, debt::payoff::pay_early, timezone::local_date_today,
};

/// The state needed to pay off a debt.
#[derive(Debug, Clone)]
pub struct PayoffState {
    /// The database connection for managing debts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for PayoffState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler that pays off the full remaining balance of a debt,
/// responds with the settled debt.
pub async fn payoff_endpoint(
    State(state): State<PayoffState>,
    Path(debt_id): Path<DebtId>,
) -> Response {
    let Some(today) = local_date_today(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match pay_early(debt_id, today, &connection) {
        Ok(debt) => Json(debt).into_response(),
        Err(error) => {
            tracing::error!("could not pay off debt {debt_id}: {error}");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };

    use crate::debt::core::{
        DebtStatus, get_debt,
        test_utils::{get_test_connection, insert_debt, institutional_form},
    };

    use super::{PayoffState, payoff_endpoint};

    fn get_test_state() -> PayoffState {
        PayoffState {
            db_connection: Arc::new(Mutex::new(get_test_connection())),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    #[tokio::test]
    async fn pays_off_the_debt() {
        let state = get_test_state();
        let debt = {
            let connection = state.db_connection.lock().unwrap();
            insert_debt(institutional_form(), &connection)
        };

        let response = payoff_endpoint(State(state.clone()), Path(debt.id))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let connection = state.db_connection.lock().unwrap();
        let debt = get_debt(debt.id, &connection).unwrap();
        assert_eq!(debt.current_balance, 0.0);
        assert_eq!(debt.status, DebtStatus::Settled);
    }

    #[tokio::test]
    async fn paying_off_twice_is_a_conflict() {
        let state = get_test_state();
        let debt = {
            let connection = state.db_connection.lock().unwrap();
            insert_debt(institutional_form(), &connection)
        };
        payoff_endpoint(State(state.clone()), Path(debt.id)).await;

        let response = payoff_endpoint(State(state), Path(debt.id))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_debt_is_not_found() {
        let response = payoff_endpoint(State(get_test_state()), Path(42))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
