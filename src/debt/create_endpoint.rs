//! Defines the endpoint for creating a new debt.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    debt::core::{DebtForm, create_debt},
};

/// The state needed to create a debt.
#[derive(Debug, Clone)]
pub struct CreateDebtState {
    /// The database connection for managing debts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateDebtState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for creating a new debt, responds with the created debt.
///
/// The request body is validated into a role-tagged debt before it reaches
/// the database; the first offending field is reported back to the client.
pub async fn create_debt_endpoint(
    State(state): State<CreateDebtState>,
    Json(form): Json<DebtForm>,
) -> Response {
    let new_debt = match form.validate() {
        Ok(new_debt) => new_debt,
        Err(error) => {
            tracing::debug!("rejected debt form: {error}");
            return error.into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_debt(new_debt, &connection) {
        Ok(debt) => (StatusCode::CREATED, Json(debt)).into_response(),
        Err(error) => {
            tracing::error!("could not create debt: {error}");
            error.into_response()
        }
    }
}
