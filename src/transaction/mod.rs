//! The transaction collaborator: the persisted log of money movements.
//! Payoffs and batch repayments record their movements here.

pub(crate) mod core;
mod list_endpoint;

pub use core::{
    Transaction, TransactionKind, create_transaction, create_transaction_table, get_transaction,
};
pub use list_endpoint::list_transactions_endpoint;
