//! Property-based tests for balance planning.
//!
//! - Replaying the plans of any create/update/delete sequence leaves every
//!   balance equal to its opening balance plus the effects of the surviving
//!   transactions.
//! - Delete exactly undoes create.

use std::collections::BTreeMap;

use costs_shared::types::AccountId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::{BalanceAdjustment, TransactionEffect, plan_create, plan_delete, plan_update};
use super::types::TransactionKind;

const ACCOUNTS: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    Create {
        kind: TransactionKind,
        source: usize,
        destination: usize,
        amount: Decimal,
    },
    Update {
        slot: usize,
        source: usize,
        destination: usize,
        amount: Decimal,
    },
    Delete {
        slot: usize,
    },
}

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn kind_strategy() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![
        Just(TransactionKind::Standard),
        Just(TransactionKind::Income),
        Just(TransactionKind::Expense),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (kind_strategy(), 0..ACCOUNTS, 0..ACCOUNTS, positive_amount()).prop_map(
            |(kind, source, destination, amount)| Op::Create {
                kind,
                source,
                destination,
                amount,
            }
        ),
        (any::<usize>(), 0..ACCOUNTS, 0..ACCOUNTS, positive_amount()).prop_map(
            |(slot, source, destination, amount)| Op::Update {
                slot,
                source,
                destination,
                amount,
            }
        ),
        any::<usize>().prop_map(|slot| Op::Delete { slot }),
    ]
}

fn apply(balances: &mut BTreeMap<AccountId, Decimal>, plan: &[BalanceAdjustment]) {
    for adj in plan {
        *balances.entry(adj.account_id).or_default() += adj.delta;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_replayed_plans_match_recomputed_balances(
        openings in prop::collection::vec(positive_amount(), ACCOUNTS),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let ids: Vec<AccountId> = (0..ACCOUNTS).map(|_| AccountId::new()).collect();
        let opening: BTreeMap<AccountId, Decimal> =
            ids.iter().copied().zip(openings.iter().copied()).collect();

        let mut balances = opening.clone();
        let mut live: Vec<TransactionEffect> = Vec::new();

        for op in ops {
            match op {
                Op::Create { kind, source, destination, amount } => {
                    let effect = TransactionEffect {
                        kind,
                        source: ids[source],
                        destination: ids[destination],
                        amount,
                    };
                    apply(&mut balances, &plan_create(&effect));
                    live.push(effect);
                }
                Op::Update { slot, source, destination, amount } => {
                    if live.is_empty() {
                        continue;
                    }
                    let slot = slot % live.len();
                    let old = live[slot];
                    let new = TransactionEffect {
                        source: ids[source],
                        destination: ids[destination],
                        amount,
                        ..old
                    };
                    apply(&mut balances, &plan_update(&old, &new));
                    live[slot] = new;
                }
                Op::Delete { slot } => {
                    if live.is_empty() {
                        continue;
                    }
                    let old = live.remove(slot % live.len());
                    apply(&mut balances, &plan_delete(&old));
                }
            }
        }

        let mut expected = opening;
        for effect in &live {
            apply(&mut expected, &plan_create(effect));
        }
        prop_assert_eq!(balances, expected);
    }

    #[test]
    fn prop_delete_undoes_create(
        kind in kind_strategy(),
        amount in positive_amount(),
    ) {
        let effect = TransactionEffect {
            kind,
            source: AccountId::new(),
            destination: AccountId::new(),
            amount,
        };
        let mut balances = BTreeMap::new();
        apply(&mut balances, &plan_create(&effect));
        apply(&mut balances, &plan_delete(&effect));
        prop_assert!(balances.values().all(Decimal::is_zero));
    }

    #[test]
    fn prop_update_plans_never_contain_zero_deltas(
        kind in kind_strategy(),
        old_amount in positive_amount(),
        new_amount in positive_amount(),
        move_source in any::<bool>(),
        move_destination in any::<bool>(),
    ) {
        let old = TransactionEffect {
            kind,
            source: AccountId::new(),
            destination: AccountId::new(),
            amount: old_amount,
        };
        let new = TransactionEffect {
            source: if move_source { AccountId::new() } else { old.source },
            destination: if move_destination { AccountId::new() } else { old.destination },
            amount: new_amount,
            ..old
        };
        let plan = plan_update(&old, &new);
        prop_assert!(plan.iter().all(|adj| !adj.delta.is_zero()));
        prop_assert!(plan.len() <= 4);
    }
}
