//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/debts/{debt_id}', use [format_endpoint].

/// The route to access accounts.
pub const ACCOUNTS: &str = "/api/accounts";
/// The route to access transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to create or list debts.
pub const DEBTS: &str = "/api/debts";
/// The route to delete a debt.
pub const DEBT: &str = "/api/debts/{debt_id}";
/// The route to list the scheduled updates of a debt.
pub const DEBT_UPDATES: &str = "/api/debts/{debt_id}/updates";
/// The route to resolve a pending scheduled update.
pub const DEBT_UPDATE: &str = "/api/debts/{debt_id}/updates/{update_id}";
/// The route to generate the scheduled updates that have come due.
pub const CATCH_UP: &str = "/api/debts/catch_up";
/// The route to pay off the full remaining balance of a debt.
pub const PAYOFF: &str = "/api/debts/{debt_id}/payoff";
/// The route to repay a set of debts with one amount.
pub const REPAYMENTS: &str = "/api/repayments";
/// The route to view net balances per counterparty.
pub const COUNTERPARTIES: &str = "/api/counterparties";
/// The route to settle every open debt with one counterparty.
pub const SETTLE_UP: &str = "/api/counterparties/settle";
/// The route to view net balances per settlement group.
pub const SETTLEMENT_GROUPS: &str = "/api/settlement_groups";

/// Replace the first parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/debts/{debt_id}', '{debt_id}' is the parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ACCOUNTS);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS);
        assert_endpoint_is_valid_uri(endpoints::DEBTS);
        assert_endpoint_is_valid_uri(endpoints::DEBT);
        assert_endpoint_is_valid_uri(endpoints::DEBT_UPDATES);
        assert_endpoint_is_valid_uri(endpoints::DEBT_UPDATE);
        assert_endpoint_is_valid_uri(endpoints::CATCH_UP);
        assert_endpoint_is_valid_uri(endpoints::PAYOFF);
        assert_endpoint_is_valid_uri(endpoints::REPAYMENTS);
        assert_endpoint_is_valid_uri(endpoints::COUNTERPARTIES);
        assert_endpoint_is_valid_uri(endpoints::SETTLE_UP);
        assert_endpoint_is_valid_uri(endpoints::SETTLEMENT_GROUPS);
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint("/api/debts/{debt_id}", 1);

        assert_eq!(formatted_path, "/api/debts/1");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn replaces_each_parameter_in_turn() {
        let formatted_path = format_endpoint("/api/debts/{debt_id}/updates/{update_id}", 3);
        let formatted_path = format_endpoint(&formatted_path, 7);

        assert_eq!(formatted_path, "/api/debts/3/updates/7");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/api/debts", 1);

        assert_eq!(formatted_path, "/api/debts");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }
}
