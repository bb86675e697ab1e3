//! Application router configuration.

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::{
    AppState,
    account::{create_account_endpoint, list_accounts_endpoint},
    debt::{
        batch_repay_endpoint, catch_up_endpoint, counterparty_balances_endpoint,
        create_debt_endpoint, delete_debt_endpoint, group_balances_endpoint, list_debts_endpoint,
        list_updates_endpoint, payoff_endpoint, resolve_update_endpoint, settle_up_endpoint,
    },
    endpoints,
    logging::logging_middleware,
    transaction::list_transactions_endpoint,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::ACCOUNTS,
            post(create_account_endpoint).get(list_accounts_endpoint),
        )
        .route(endpoints::TRANSACTIONS, get(list_transactions_endpoint))
        .route(
            endpoints::DEBTS,
            post(create_debt_endpoint).get(list_debts_endpoint),
        )
        .route(endpoints::DEBT, delete(delete_debt_endpoint))
        .route(endpoints::DEBT_UPDATES, get(list_updates_endpoint))
        .route(endpoints::DEBT_UPDATE, put(resolve_update_endpoint))
        .route(endpoints::CATCH_UP, post(catch_up_endpoint))
        .route(endpoints::PAYOFF, post(payoff_endpoint))
        .route(endpoints::REPAYMENTS, post(batch_repay_endpoint))
        .route(
            endpoints::COUNTERPARTIES,
            get(counterparty_balances_endpoint),
        )
        .route(endpoints::SETTLE_UP, post(settle_up_endpoint))
        .route(endpoints::SETTLEMENT_GROUPS, get(group_balances_endpoint))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}
