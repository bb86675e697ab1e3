//! The account collaborator: debts may be tied to an account and batch
//! repayments name the account the money leaves from.

pub(crate) mod core;
mod create_endpoint;
mod list_endpoint;

pub use core::{Account, create_account_table, get_account, list_accounts, verify_account};
pub use create_endpoint::create_account_endpoint;
pub use list_endpoint::list_accounts_endpoint;
