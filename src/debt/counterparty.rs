//! Nets person-to-person debts per counterparty and per settlement group.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::debt::{
    core::{Debt, DebtRole},
    installment::round2,
};

/// The net position with one counterparty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterpartyBalance {
    /// The counterparty's name.
    pub name: String,
    /// The combined outstanding balance of debts borrowed from them.
    pub you_owe: f64,
    /// The combined outstanding balance of debts lent to them.
    pub they_owe: f64,
    /// `they_owe - you_owe`. Positive means they owe the user overall.
    pub net_balance: f64,
}

/// Net the outstanding balances of person-to-person debts per counterparty.
///
/// Debts with the `lent` role count towards what the counterparty owes, the
/// `borrowed` role towards what the user owes. The result is sorted by the
/// size of the net position, largest first.
pub fn counterparty_balances(debts: &[Debt]) -> Vec<CounterpartyBalance> {
    let mut totals: BTreeMap<&str, (f64, f64)> = BTreeMap::new();

    for debt in debts {
        let Some(name) = debt.counterparty.as_deref() else {
            continue;
        };

        let (you_owe, they_owe) = totals.entry(name).or_default();
        match debt.role {
            DebtRole::Borrowed => *you_owe += debt.current_balance,
            DebtRole::Lent => *they_owe += debt.current_balance,
            DebtRole::Institutional => {}
        }
    }

    let mut balances: Vec<CounterpartyBalance> = totals
        .into_iter()
        .map(|(name, (you_owe, they_owe))| CounterpartyBalance {
            name: name.to_owned(),
            you_owe: round2(you_owe),
            they_owe: round2(they_owe),
            net_balance: round2(they_owe - you_owe),
        })
        .collect();

    balances.sort_by(|a, b| b.net_balance.abs().total_cmp(&a.net_balance.abs()));

    balances
}

/// The net position of one settlement group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBalance {
    /// The settlement group label.
    pub settlement_group: String,
    /// The group total: lent balances count positive, borrowed negative.
    pub total: f64,
}

/// Sum outstanding balances per settlement group, with `lent` contributing
/// positive and `borrowed` negative amounts. Groups are sorted by label.
pub fn group_balances(debts: &[Debt]) -> Vec<GroupBalance> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();

    for debt in debts {
        let Some(group) = debt.settlement_group.as_deref() else {
            continue;
        };

        let contribution = match debt.role {
            DebtRole::Lent => debt.current_balance,
            DebtRole::Borrowed => -debt.current_balance,
            DebtRole::Institutional => continue,
        };

        *totals.entry(group).or_default() += contribution;
    }

    totals
        .into_iter()
        .map(|(settlement_group, total)| GroupBalance {
            settlement_group: settlement_group.to_owned(),
            total: round2(total),
        })
        .collect()
}
