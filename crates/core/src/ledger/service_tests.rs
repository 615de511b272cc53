//! Engine scenarios over the in-memory store.

use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use costs_shared::types::{AccountId, TransactionId, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::error::LedgerError;
use super::memory::MemoryLedgerStore;
use super::service::{LedgerEngine, LedgerPolicy};
use super::store::LedgerStore;
use super::summary::AccountSummary;
use super::types::{
    Account, AccountDetails, AccountInput, AccountType, Transaction, TransactionInput,
    TransactionUpdate,
};

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap()
}

struct Fixture {
    engine: LedgerEngine<MemoryLedgerStore>,
    user: UserId,
}

impl Fixture {
    fn new() -> Self {
        Self::with_policy(LedgerPolicy::default())
    }

    fn with_policy(policy: LedgerPolicy) -> Self {
        Self {
            engine: LedgerEngine::with_policy(MemoryLedgerStore::new(), policy),
            user: UserId::new(),
        }
    }

    async fn account(&self, account_type: AccountType, balance: Decimal) -> Account {
        self.engine
            .create_account(
                self.user,
                &AccountInput {
                    name: format!("{account_type} account"),
                    account_type: Some(account_type.to_string()),
                    description: String::new(),
                    balance,
                },
            )
            .await
            .unwrap()
    }

    async fn balance(&self, account: &Account) -> Decimal {
        self.engine
            .find_account(self.user, account.id)
            .await
            .unwrap()
            .balance
    }

    async fn create(
        &self,
        kind: &str,
        source: &Account,
        destination: &Account,
        amount: Decimal,
        date: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        self.engine
            .create_transaction(self.user, &input(kind, source.id, destination.id, amount, date))
            .await
    }
}

fn input(
    kind: &str,
    source: AccountId,
    destination: AccountId,
    amount: Decimal,
    date: DateTime<Utc>,
) -> TransactionInput {
    TransactionInput {
        kind: Some(kind.to_string()),
        source: Some(source),
        destination: Some(destination),
        amount: Some(amount),
        transaction_date: Some(date),
        description: String::new(),
    }
}

fn update(tx: &Transaction) -> TransactionUpdate {
    TransactionUpdate {
        source: Some(tx.source),
        destination: Some(tx.destination),
        amount: Some(tx.amount),
        transaction_date: None,
        description: tx.description.clone(),
    }
}

#[tokio::test]
async fn test_create_then_delete_restores_balances() {
    let f = Fixture::new();
    let x = f.account(AccountType::Current, dec!(100)).await;
    let y = f.account(AccountType::Saving, dec!(50)).await;

    let tx = f.create("Standard", &x, &y, dec!(10), at(1)).await.unwrap();
    assert_eq!(f.balance(&x).await, dec!(90));
    assert_eq!(f.balance(&y).await, dec!(60));

    f.engine.delete_transaction(f.user, tx.id).await.unwrap();
    assert_eq!(f.balance(&x).await, dec!(100));
    assert_eq!(f.balance(&y).await, dec!(50));
    assert_eq!(f.engine.store().transaction_count().await, 0);
}

#[tokio::test]
async fn test_update_reparents_source() {
    let f = Fixture::new();
    let x = f.account(AccountType::Current, dec!(100)).await;
    let y = f.account(AccountType::Saving, dec!(50)).await;
    let z = f.account(AccountType::Debt, dec!(30)).await;

    let tx = f.create("Standard", &x, &y, dec!(10), at(1)).await.unwrap();
    let moved = f
        .engine
        .update_transaction(
            f.user,
            tx.id,
            &TransactionUpdate {
                source: Some(z.id),
                ..update(&tx)
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.source, z.id);
    assert_eq!(moved.id, tx.id);
    assert_eq!(f.balance(&x).await, dec!(100));
    assert_eq!(f.balance(&z).await, dec!(20));
    assert_eq!(f.balance(&y).await, dec!(60));
}

#[tokio::test]
async fn test_update_amount_and_both_accounts() {
    let f = Fixture::new();
    let a = f.account(AccountType::Current, dec!(100)).await;
    let b = f.account(AccountType::Current, dec!(100)).await;
    let c = f.account(AccountType::Saving, dec!(100)).await;
    let d = f.account(AccountType::Saving, dec!(100)).await;

    let tx = f.create("Standard", &a, &b, dec!(40), at(1)).await.unwrap();
    f.engine
        .update_transaction(
            f.user,
            tx.id,
            &TransactionUpdate {
                source: Some(c.id),
                destination: Some(d.id),
                amount: Some(dec!(25)),
                ..update(&tx)
            },
        )
        .await
        .unwrap();

    assert_eq!(f.balance(&a).await, dec!(100));
    assert_eq!(f.balance(&b).await, dec!(100));
    assert_eq!(f.balance(&c).await, dec!(75));
    assert_eq!(f.balance(&d).await, dec!(125));
}

#[tokio::test]
async fn test_update_swaps_source_and_destination() {
    let f = Fixture::new();
    let a = f.account(AccountType::Current, dec!(100)).await;
    let b = f.account(AccountType::Saving, dec!(100)).await;

    let tx = f.create("Standard", &a, &b, dec!(30), at(1)).await.unwrap();
    f.engine
        .update_transaction(
            f.user,
            tx.id,
            &TransactionUpdate {
                source: Some(b.id),
                destination: Some(a.id),
                ..update(&tx)
            },
        )
        .await
        .unwrap();

    assert_eq!(f.balance(&a).await, dec!(130));
    assert_eq!(f.balance(&b).await, dec!(70));
}

#[tokio::test]
async fn test_swap_cannot_overdraw_the_old_destination() {
    let f = Fixture::new();
    let a = f.account(AccountType::Current, dec!(100)).await;
    let b = f.account(AccountType::Saving, Decimal::ZERO).await;

    let tx = f.create("Standard", &a, &b, dec!(30), at(1)).await.unwrap();
    let err = f
        .engine
        .update_transaction(
            f.user,
            tx.id,
            &TransactionUpdate {
                source: Some(b.id),
                destination: Some(a.id),
                ..update(&tx)
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LedgerError::InsufficientFunds { account_id, balance, required }
            if account_id == b.id && balance == dec!(30) && required == dec!(60)
    ));
    assert_eq!(f.balance(&a).await, dec!(70));
    assert_eq!(f.balance(&b).await, dec!(30));
    assert_eq!(f.engine.find_transaction(f.user, tx.id).await.unwrap(), tx);
}

#[tokio::test]
async fn test_income_into_expense_category_is_rejected() {
    let f = Fixture::new();
    let salary = f.account(AccountType::IncomeSource, Decimal::ZERO).await;
    let groceries = f.account(AccountType::ExpenseCategory, Decimal::ZERO).await;

    let err = f
        .create("Income", &salary, &groceries, dec!(5), at(1))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::TypeMismatch { .. }));
    assert_eq!(f.balance(&salary).await, Decimal::ZERO);
    assert_eq!(f.balance(&groceries).await, Decimal::ZERO);
    assert_eq!(f.engine.store().transaction_count().await, 0);
}

#[tokio::test]
async fn test_insufficient_funds_on_create() {
    let f = Fixture::new();
    let x = f.account(AccountType::Current, dec!(10)).await;
    let groceries = f.account(AccountType::ExpenseCategory, Decimal::ZERO).await;

    let err = f
        .create("Expense", &x, &groceries, dec!(11), at(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds { balance, required, .. }
            if balance == dec!(10) && required == dec!(11)
    ));
    assert_eq!(f.balance(&x).await, dec!(10));

    // Spending the exact balance is allowed.
    f.create("Expense", &x, &groceries, dec!(10), at(1))
        .await
        .unwrap();
    assert_eq!(f.balance(&x).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_income_and_expense_touch_one_side() {
    let f = Fixture::new();
    let salary = f.account(AccountType::IncomeSource, Decimal::ZERO).await;
    let wallet = f.account(AccountType::Current, Decimal::ZERO).await;
    let rent = f.account(AccountType::ExpenseCategory, Decimal::ZERO).await;

    f.create("Income", &salary, &wallet, dec!(1000), at(1))
        .await
        .unwrap();
    let expense = f
        .create("Expense", &wallet, &rent, dec!(400), at(2))
        .await
        .unwrap();

    assert_eq!(f.balance(&salary).await, Decimal::ZERO);
    assert_eq!(f.balance(&wallet).await, dec!(600));
    assert_eq!(f.balance(&rent).await, Decimal::ZERO);

    f.engine.delete_transaction(f.user, expense.id).await.unwrap();
    assert_eq!(f.balance(&wallet).await, dec!(1000));
    assert_eq!(f.balance(&rent).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_update_funds_check_follows_policy() {
    let strict = Fixture::new();
    let x = strict.account(AccountType::Current, dec!(20)).await;
    let y = strict.account(AccountType::Saving, Decimal::ZERO).await;
    let tx = strict.create("Standard", &x, &y, dec!(15), at(1)).await.unwrap();

    let err = strict
        .engine
        .update_transaction(
            strict.user,
            tx.id,
            &TransactionUpdate {
                amount: Some(dec!(30)),
                ..update(&tx)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds { required, .. } if required == dec!(15)
    ));
    assert_eq!(strict.balance(&x).await, dec!(5));
    assert_eq!(strict.balance(&y).await, dec!(15));

    let lenient = Fixture::with_policy(LedgerPolicy {
        enforce_funds_on_update: false,
    });
    let x = lenient.account(AccountType::Current, dec!(20)).await;
    let y = lenient.account(AccountType::Saving, Decimal::ZERO).await;
    let tx = lenient.create("Standard", &x, &y, dec!(15), at(1)).await.unwrap();

    lenient
        .engine
        .update_transaction(
            lenient.user,
            tx.id,
            &TransactionUpdate {
                amount: Some(dec!(30)),
                ..update(&tx)
            },
        )
        .await
        .unwrap();
    assert_eq!(lenient.balance(&x).await, dec!(-10));
    assert_eq!(lenient.balance(&y).await, dec!(30));
}

#[tokio::test]
async fn test_update_to_mismatched_account_rolls_back() {
    let f = Fixture::new();
    let x = f.account(AccountType::Current, dec!(100)).await;
    let y = f.account(AccountType::Saving, Decimal::ZERO).await;
    let groceries = f.account(AccountType::ExpenseCategory, Decimal::ZERO).await;
    let tx = f.create("Standard", &x, &y, dec!(10), at(1)).await.unwrap();

    let err = f
        .engine
        .update_transaction(
            f.user,
            tx.id,
            &TransactionUpdate {
                destination: Some(groceries.id),
                ..update(&tx)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::TypeMismatch { .. }));
    assert_eq!(f.engine.find_transaction(f.user, tx.id).await.unwrap(), tx);
    assert_eq!(f.balance(&y).await, dec!(10));
}

#[tokio::test]
async fn test_failed_commit_leaves_no_trace() {
    let f = Fixture::new();
    let x = f.account(AccountType::Current, dec!(100)).await;
    let y = f.account(AccountType::Saving, Decimal::ZERO).await;

    f.engine.store().fail_next_commit();
    let err = f.create("Standard", &x, &y, dec!(10), at(1)).await.unwrap_err();

    assert!(matches!(err, LedgerError::Storage(_)));
    assert_eq!(f.balance(&x).await, dec!(100));
    assert_eq!(f.balance(&y).await, Decimal::ZERO);
    assert_eq!(f.engine.store().transaction_count().await, 0);
}

#[tokio::test]
async fn test_unknown_records() {
    let f = Fixture::new();
    let x = f.account(AccountType::Current, dec!(100)).await;

    let err = f
        .engine
        .create_transaction(f.user, &input("Standard", x.id, AccountId::new(), dec!(1), at(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotFound(_)));

    let missing = TransactionId::new();
    assert!(matches!(
        f.engine.delete_transaction(f.user, missing).await,
        Err(LedgerError::TransactionNotFound(id)) if id == missing
    ));
    assert!(matches!(
        f.engine
            .update_transaction(
                f.user,
                missing,
                &TransactionUpdate {
                    source: Some(x.id),
                    destination: Some(x.id),
                    amount: Some(dec!(1)),
                    ..TransactionUpdate::default()
                },
            )
            .await,
        Err(LedgerError::TransactionNotFound(_))
    ));
}

#[tokio::test]
async fn test_accounts_of_other_users_are_off_limits() {
    let f = Fixture::new();
    let mine = f.account(AccountType::Current, dec!(100)).await;
    let stranger = UserId::new();
    let theirs = f
        .engine
        .create_account(
            stranger,
            &AccountInput {
                name: "Theirs".to_string(),
                account_type: Some("Saving".to_string()),
                balance: dec!(100),
                ..AccountInput::default()
            },
        )
        .await
        .unwrap();

    let err = f.create("Standard", &mine, &theirs, dec!(5), at(1)).await.unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotOwned { account_id, .. } if account_id == theirs.id));

    assert!(matches!(
        f.engine.find_account(f.user, theirs.id).await,
        Err(LedgerError::AccountNotOwned { .. })
    ));

    let their_tx = f
        .engine
        .create_transaction(stranger, &input("Standard", theirs.id, theirs.id, dec!(1), at(1)))
        .await
        .unwrap();
    assert!(matches!(
        f.engine.delete_transaction(f.user, their_tx.id).await,
        Err(LedgerError::TransactionNotFound(_))
    ));
    assert!(matches!(
        f.engine.find_transaction(f.user, their_tx.id).await,
        Err(LedgerError::TransactionNotFound(_))
    ));
}

#[tokio::test]
async fn test_validation_happens_before_storage() {
    let f = Fixture::new();
    let x = f.account(AccountType::Current, dec!(100)).await;
    let y = f.account(AccountType::Saving, Decimal::ZERO).await;

    let err = f.create("Standard", &x, &y, dec!(0), at(1)).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    let err = f.create("Transfer", &x, &y, dec!(1), at(1)).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransactionKind(_)));
    assert_eq!(f.balance(&x).await, dec!(100));
}

#[tokio::test]
async fn test_account_summary_over_window() {
    let f = Fixture::new();
    let subject = f.account(AccountType::Current, dec!(100)).await;
    let other = f.account(AccountType::Saving, dec!(1000)).await;

    f.create("Standard", &other, &subject, dec!(5), at(2)).await.unwrap();
    f.create("Standard", &other, &subject, dec!(7), at(3)).await.unwrap();
    f.create("Standard", &subject, &other, dec!(3), at(4)).await.unwrap();
    f.create("Standard", &other, &subject, dec!(100), at(25)).await.unwrap();

    let summary = f
        .engine
        .summary_for_account(f.user, subject.id, at(1), at(10))
        .await
        .unwrap();
    assert!(matches!(summary, AccountSummary::Standard(_)));
    assert_eq!(summary.income(), dec!(12));
    assert_eq!(summary.expense(), dec!(3));
}

#[tokio::test]
async fn test_summary_rejects_bad_period() {
    let f = Fixture::new();
    let x = f.account(AccountType::Current, Decimal::ZERO).await;

    for (start, end) in [(at(5), at(5)), (at(6), at(5))] {
        assert!(matches!(
            f.engine.summary_for_account(f.user, x.id, start, end).await,
            Err(LedgerError::InvalidPeriod { .. })
        ));
        assert!(matches!(
            f.engine.summary_for_user(f.user, start, end).await,
            Err(LedgerError::InvalidPeriod { .. })
        ));
    }
}

#[tokio::test]
async fn test_income_source_and_user_summaries() {
    let f = Fixture::new();
    let salary = f.account(AccountType::IncomeSource, Decimal::ZERO).await;
    let wallet = f.account(AccountType::Current, Decimal::ZERO).await;
    let savings = f.account(AccountType::Saving, Decimal::ZERO).await;
    let food = f.account(AccountType::ExpenseCategory, Decimal::ZERO).await;

    f.create("Income", &salary, &wallet, dec!(2000), at(1)).await.unwrap();
    f.create("Standard", &wallet, &savings, dec!(500), at(2)).await.unwrap();
    f.create("Expense", &wallet, &food, dec!(120), at(3)).await.unwrap();

    let income = f
        .engine
        .summary_for_account(f.user, salary.id, at(1), at(31))
        .await
        .unwrap();
    assert_eq!(income.income(), dec!(2000));

    let spent = f
        .engine
        .summary_for_account(f.user, food.id, at(1), at(31))
        .await
        .unwrap();
    assert_eq!(spent.expense(), dec!(120));

    let user = f.engine.summary_for_user(f.user, at(1), at(31)).await.unwrap();
    assert_eq!(user.income, dec!(2000));
    assert_eq!(user.expense, dec!(120));
}

#[tokio::test]
async fn test_account_administration() {
    let f = Fixture::new();
    let x = f.account(AccountType::Current, dec!(10)).await;
    let y = f.account(AccountType::Saving, Decimal::ZERO).await;

    let renamed = f
        .engine
        .update_account(
            f.user,
            x.id,
            &AccountDetails {
                name: "Daily".to_string(),
                description: "card".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Daily");
    assert_eq!(renamed.account_type, AccountType::Current);
    assert_eq!(renamed.balance, dec!(10));

    let tx = f.create("Standard", &x, &y, dec!(1), at(1)).await.unwrap();
    assert!(matches!(
        f.engine.delete_account(f.user, x.id).await,
        Err(LedgerError::AccountInUse(_))
    ));
    assert_eq!(
        f.engine.transactions_for_account(f.user, x.id).await.unwrap(),
        vec![tx.clone()]
    );

    f.engine.delete_transaction(f.user, tx.id).await.unwrap();
    f.engine.delete_account(f.user, x.id).await.unwrap();
    assert_eq!(f.engine.accounts_for_user(f.user).await.unwrap().len(), 1);
    assert!(matches!(
        f.engine.store().find_account(x.id).await,
        Err(LedgerError::AccountNotFound(_))
    ));
}

#[tokio::test]
async fn test_concurrent_updates_of_one_transaction() {
    let f = Fixture::new();
    let x = f.account(AccountType::Current, dec!(100)).await;
    let y = f.account(AccountType::Saving, dec!(100)).await;
    let tx = f.create("Standard", &x, &y, dec!(10), at(1)).await.unwrap();

    let edits = (11..=30u32).map(|amount| {
        let f = &f;
        let request = TransactionUpdate {
            amount: Some(Decimal::from(amount)),
            ..update(&tx)
        };
        async move { f.engine.update_transaction(f.user, tx.id, &request).await }
    });
    for result in join_all(edits).await {
        result.unwrap();
    }

    let last = f.engine.find_transaction(f.user, tx.id).await.unwrap().amount;
    assert_eq!(f.balance(&x).await, dec!(100) - last);
    assert_eq!(f.balance(&y).await, dec!(100) + last);
}

#[tokio::test]
async fn test_update_racing_delete_leaves_no_drift() {
    let f = Fixture::new();
    let x = f.account(AccountType::Current, dec!(100)).await;
    let y = f.account(AccountType::Saving, dec!(100)).await;

    for amount in [dec!(5), dec!(25)] {
        let tx = f.create("Standard", &x, &y, dec!(10), at(1)).await.unwrap();
        let request = TransactionUpdate {
            amount: Some(amount),
            ..update(&tx)
        };
        let (updated, deleted) = tokio::join!(
            f.engine.update_transaction(f.user, tx.id, &request),
            f.engine.delete_transaction(f.user, tx.id),
        );

        deleted.unwrap();
        assert!(matches!(
            updated,
            Ok(_) | Err(LedgerError::TransactionNotFound(_))
        ));
        assert_eq!(f.balance(&x).await, dec!(100));
        assert_eq!(f.balance(&y).await, dec!(100));
        assert_eq!(f.engine.store().transaction_count().await, 0);
    }
}
