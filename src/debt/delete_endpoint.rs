//! Defines the endpoint for deleting a debt.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error, database_id::DebtId, debt::core::delete_debt};

/// The state needed to delete a debt.
#[derive(Debug, Clone)]
pub struct DeleteDebtState {
    /// The database connection for managing debts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteDebtState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting a debt and its scheduled updates.
pub async fn delete_debt_endpoint(
    State(state): State<DeleteDebtState>,
    Path(debt_id): Path<DebtId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match delete_debt(debt_id, &connection) {
        Ok(rows_affected) if rows_affected != 0 => StatusCode::NO_CONTENT.into_response(),
        Ok(_) => Error::DeleteMissingDebt.into_response(),
        Err(error) => {
            tracing::error!("Could not delete debt {debt_id}: {error}");
            error.into_response()
        }
    }
}
