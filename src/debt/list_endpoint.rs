//! Defines the endpoint for listing debts.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error, debt::core::list_debts};

/// The state needed to list debts.
#[derive(Debug, Clone)]
pub struct ListDebtsState {
    /// The database connection for managing debts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListDebtsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for listing all debts, oldest first.
pub async fn list_debts_endpoint(State(state): State<ListDebtsState>) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match list_debts(&connection) {
        Ok(debts) => Json(debts).into_response(),
        Err(error) => {
            tracing::error!("could not list debts: {error}");
            error.into_response()
        }
    }
}
