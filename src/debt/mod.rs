//! Tracks debts and their repayment schedules.
//!
//! A debt is either institutional (a loan from a bank) or personal (money
//! lent to or borrowed from another person). Each debt carries an
//! installment schedule; the catch-up processor turns elapsed due dates into
//! scheduled update records and keeps the balance in step with them.

mod catch_up;
mod catch_up_endpoint;
pub(crate) mod core;
mod counterparty;
mod counterparty_endpoint;
mod create_endpoint;
mod delete_endpoint;
mod installment;
mod list_endpoint;
mod payoff;
mod payoff_endpoint;
mod settlement;
mod settlement_endpoint;
mod update;
mod updates_endpoint;

pub use catch_up::{CatchUpOutcome, catch_up_all};
pub use catch_up_endpoint::catch_up_endpoint;
pub use core::{
    Debt, DebtForm, DebtKind, DebtRole, DebtStatus, NewDebt, PaymentFrequency, create_debt,
    create_debt_table, delete_debt, get_debt, list_debts,
};
pub use counterparty::{
    CounterpartyBalance, GroupBalance, counterparty_balances, group_balances,
};
pub use counterparty_endpoint::{
    counterparty_balances_endpoint, group_balances_endpoint, settle_up_endpoint,
};
pub use create_endpoint::create_debt_endpoint;
pub use delete_endpoint::delete_debt_endpoint;
pub use installment::{installment_amount, round2};
pub use list_endpoint::list_debts_endpoint;
pub use payoff::pay_early;
pub use payoff_endpoint::payoff_endpoint;
pub use settlement::{RepaymentOutcome, batch_repay, settle_counterparty};
pub use settlement_endpoint::batch_repay_endpoint;
pub use update::{
    DebtUpdate, UpdateResolution, UpdateStatus, create_debt_update_table, list_updates,
    resolve_update,
};
pub use updates_endpoint::{list_updates_endpoint, resolve_update_endpoint};
