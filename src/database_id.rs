//! Database ID type definitions.

/// The ID of an account.
pub type AccountId = i64;
/// The ID of a debt.
pub type DebtId = i64;
/// The ID of a scheduled debt update.
pub type DebtUpdateId = i64;
/// The ID of a transaction.
pub type TransactionId = i64;
