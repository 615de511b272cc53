//! Balance effects of transactions.
//!
//! Crediting/debiting rule:
//! - Standard: source -= amount, destination += amount
//! - Income: destination += amount (income sources carry no balance)
//! - Expense: source -= amount (expense categories carry no balance)
//!
//! The functions here only plan adjustments. Applying them, together with the
//! record write, is the job of one store unit.

use costs_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{Transaction, TransactionKind};

/// A signed change to one account balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAdjustment {
    /// The account to adjust.
    pub account_id: AccountId,
    /// Amount added to the balance (negative for a debit).
    pub delta: Decimal,
}

impl BalanceAdjustment {
    /// Adjustment that adds `amount` to the account.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            delta: amount,
        }
    }

    /// Adjustment that takes `amount` out of the account.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            delta: -amount,
        }
    }
}

/// The balance-relevant part of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionEffect {
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Source account.
    pub source: AccountId,
    /// Destination account.
    pub destination: AccountId,
    /// Amount moved.
    pub amount: Decimal,
}

impl From<&Transaction> for TransactionEffect {
    fn from(tx: &Transaction) -> Self {
        Self {
            kind: tx.kind,
            source: tx.source,
            destination: tx.destination,
            amount: tx.amount,
        }
    }
}

/// Adjustments applied when a transaction is created.
#[must_use]
pub fn plan_create(effect: &TransactionEffect) -> Vec<BalanceAdjustment> {
    let mut plan = Vec::with_capacity(2);
    if effect.kind.debits_source() {
        plan.push(BalanceAdjustment::debit(effect.source, effect.amount));
    }
    if effect.kind.credits_destination() {
        plan.push(BalanceAdjustment::credit(effect.destination, effect.amount));
    }
    plan
}

/// Adjustments that exactly undo [`plan_create`] for the same transaction.
#[must_use]
pub fn plan_delete(effect: &TransactionEffect) -> Vec<BalanceAdjustment> {
    plan_create(effect)
        .into_iter()
        .map(|adj| BalanceAdjustment {
            account_id: adj.account_id,
            delta: -adj.delta,
        })
        .collect()
}

/// Adjustments that move the ledger from `old` to `new`.
///
/// Both effects must share the same kind. On each side the kind touches:
/// a changed account gets the old amount returned and the new account takes
/// the new amount; an unchanged account only absorbs the amount difference.
/// Zero adjustments are omitted.
#[must_use]
pub fn plan_update(old: &TransactionEffect, new: &TransactionEffect) -> Vec<BalanceAdjustment> {
    debug_assert_eq!(old.kind, new.kind, "transaction kind is immutable");

    let delta = new.amount - old.amount;
    let mut plan = Vec::with_capacity(4);

    if old.kind.debits_source() {
        if new.source == old.source {
            if !delta.is_zero() {
                plan.push(BalanceAdjustment::debit(new.source, delta));
            }
        } else {
            plan.push(BalanceAdjustment::credit(old.source, old.amount));
            plan.push(BalanceAdjustment::debit(new.source, new.amount));
        }
    }

    if old.kind.credits_destination() {
        if new.destination == old.destination {
            if !delta.is_zero() {
                plan.push(BalanceAdjustment::credit(new.destination, delta));
            }
        } else {
            plan.push(BalanceAdjustment::debit(old.destination, old.amount));
            plan.push(BalanceAdjustment::credit(new.destination, new.amount));
        }
    }

    plan
}

/// A balance the store must confirm before applying a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundsRequirement {
    /// The account being debited.
    pub account_id: AccountId,
    /// Minimum balance it must hold.
    pub required: Decimal,
}

/// Funds needed to create a transaction: the full amount on the source when the
/// kind debits it.
#[must_use]
pub fn create_requirement(effect: &TransactionEffect) -> Option<FundsRequirement> {
    effect.kind.debits_source().then_some(FundsRequirement {
        account_id: effect.source,
        required: effect.amount,
    })
}

/// Funds needed to apply an update on the debited side.
///
/// The requirement is the net debit the plan puts on the new source, so an
/// account that was the old destination first gives back the credit it
/// received. A new source covers the whole new amount; an unchanged source
/// only covers an increase.
#[must_use]
pub fn update_requirement(
    old: &TransactionEffect,
    new: &TransactionEffect,
) -> Option<FundsRequirement> {
    if !old.kind.debits_source() {
        return None;
    }
    let net: Decimal = plan_update(old, new)
        .iter()
        .filter(|adj| adj.account_id == new.source)
        .map(|adj| adj.delta)
        .sum();
    (net < Decimal::ZERO).then_some(FundsRequirement {
        account_id: new.source,
        required: -net,
    })
}
