//! Defines the endpoints for listing a debt's scheduled updates and
//! resolving a pending one.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    database_id::{DebtId, DebtUpdateId},
    debt::update::{UpdateResolution, list_updates, resolve_update},
    timezone::local_date_today,
};

/// The state needed to list and resolve a debt's scheduled updates.
#[derive(Debug, Clone)]
pub struct DebtUpdatesState {
    /// The database connection for managing debts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DebtUpdatesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler for listing the scheduled updates of a debt, oldest first.
pub async fn list_updates_endpoint(
    State(state): State<DebtUpdatesState>,
    Path(debt_id): Path<DebtId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match list_updates(debt_id, &connection) {
        Ok(updates) => Json(updates).into_response(),
        Err(error) => {
            tracing::error!("could not list updates for debt {debt_id}: {error}");
            error.into_response()
        }
    }
}

/// The request body for resolving a pending update.
#[derive(Debug, Deserialize)]
pub struct ResolveUpdateForm {
    /// Whether the scheduled payment was made or skipped.
    pub resolution: UpdateResolution,
}

/// A route handler that marks a pending update paid or skipped, responds
/// with the resolved update.
pub async fn resolve_update_endpoint(
    State(state): State<DebtUpdatesState>,
    Path((debt_id, update_id)): Path<(DebtId, DebtUpdateId)>,
    Json(form): Json<ResolveUpdateForm>,
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

    match resolve_update(debt_id, update_id, form.resolution, today, &connection) {
        Ok(update) => Json(update).into_response(),
        Err(error) => {
            tracing::error!("could not resolve update {update_id}: {error}");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use time::macros::date;

    use crate::debt::{
        catch_up::catch_up_all,
        core::test_utils::{get_test_connection, insert_debt, institutional_form},
        update::{UpdateResolution, UpdateStatus, list_updates},
    };

    use super::{
        DebtUpdatesState, ResolveUpdateForm, list_updates_endpoint, resolve_update_endpoint,
    };

    fn get_test_state() -> DebtUpdatesState {
        DebtUpdatesState {
            db_connection: Arc::new(Mutex::new(get_test_connection())),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    #[tokio::test]
    async fn lists_updates_for_a_debt() {
        let state = get_test_state();
        let debt = {
            let connection = state.db_connection.lock().unwrap();
            let debt = insert_debt(institutional_form(), &connection);
            catch_up_all(date!(2025 - 04 - 15), &connection).unwrap();
            debt
        };

        let response = list_updates_endpoint(State(state), Path(debt.id))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn listing_updates_of_an_unknown_debt_is_not_found() {
        let response = list_updates_endpoint(State(get_test_state()), Path(42))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn resolves_a_pending_update() {
        let state = get_test_state();
        let (debt, update) = {
            let connection = state.db_connection.lock().unwrap();
            let debt = insert_debt(institutional_form(), &connection);
            catch_up_all(date!(2025 - 02 - 15), &connection).unwrap();
            let update = list_updates(debt.id, &connection).unwrap().remove(0);
            (debt, update)
        };

        let form = ResolveUpdateForm {
            resolution: UpdateResolution::Paid,
        };
        let response =
            resolve_update_endpoint(State(state.clone()), Path((debt.id, update.id)), Json(form))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let connection = state.db_connection.lock().unwrap();
        let update = &list_updates(debt.id, &connection).unwrap()[0];
        assert_eq!(update.status, UpdateStatus::Paid);
    }

    #[tokio::test]
    async fn resolving_twice_is_a_conflict() {
        let state = get_test_state();
        let (debt, update) = {
            let connection = state.db_connection.lock().unwrap();
            let debt = insert_debt(institutional_form(), &connection);
            catch_up_all(date!(2025 - 02 - 15), &connection).unwrap();
            let update = list_updates(debt.id, &connection).unwrap().remove(0);
            (debt, update)
        };
        resolve_update_endpoint(
            State(state.clone()),
            Path((debt.id, update.id)),
            Json(ResolveUpdateForm {
                resolution: UpdateResolution::Paid,
            }),
        )
        .await;

        let response = resolve_update_endpoint(
            State(state),
            Path((debt.id, update.id)),
            Json(ResolveUpdateForm {
                resolution: UpdateResolution::Skipped,
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
