//! Ledger engine: account administration, the balance mutation protocol and
//! summaries, on top of any [`LedgerStore`].
//!
//! Every transaction mutation runs in one store unit:
//! 1. Validate the input (no I/O)
//! 2. Lock the transaction record being changed, then the involved accounts
//!    in ascending id order
//! 3. Check ownership, the kind/type table and available funds
//! 4. Apply the planned balance adjustments and write the record
//! 5. Commit, or roll back on any failure

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use costs_shared::config::LedgerConfig;
use costs_shared::types::{AccountId, TransactionId, UserId};
use tracing::{debug, info, instrument, warn};

use super::balance::{
    BalanceAdjustment, FundsRequirement, TransactionEffect, create_requirement, plan_create,
    plan_delete, plan_update, update_requirement,
};
use super::error::LedgerError;
use super::store::{LedgerStore, LedgerUnit};
use super::summary::{AccountSummary, UserSummary};
use super::types::{
    Account, AccountDetails, AccountInput, NewTransaction, Transaction, TransactionChanges,
    TransactionInput, TransactionUpdate,
};
use super::validation::{
    check_transaction_types, validate_account_details, validate_account_input,
    validate_transaction_input, validate_transaction_update,
};

/// Engine policy switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// Check the debited account's funds when a transaction is edited.
    pub enforce_funds_on_update: bool,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            enforce_funds_on_update: true,
        }
    }
}

impl From<&LedgerConfig> for LedgerPolicy {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            enforce_funds_on_update: config.enforce_funds_on_update,
        }
    }
}

/// Ledger engine over a store.
#[derive(Debug, Clone)]
pub struct LedgerEngine<S> {
    store: S,
    policy: LedgerPolicy,
}

impl<S: LedgerStore> LedgerEngine<S> {
    /// Creates an engine with the default policy.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, LedgerPolicy::default())
    }

    /// Creates an engine with an explicit policy.
    pub fn with_policy(store: S, policy: LedgerPolicy) -> Self {
        Self { store, policy }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The active policy.
    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    // ========== Accounts ==========

    /// Creates an account for `owner`.
    pub async fn create_account(
        &self,
        owner: UserId,
        input: &AccountInput,
    ) -> Result<Account, LedgerError> {
        let new = validate_account_input(owner, input)?;
        let account = self.store.insert_account(new).await?;
        info!(
            user_id = %owner,
            account_id = %account.id,
            account_type = %account.account_type,
            "Account created"
        );
        Ok(account)
    }

    /// Loads one of `owner`'s accounts.
    pub async fn find_account(&self, owner: UserId, id: AccountId) -> Result<Account, LedgerError> {
        let account = self.store.find_account(id).await?;
        ensure_owned(&account, owner)?;
        Ok(account)
    }

    /// Lists `owner`'s accounts.
    pub async fn accounts_for_user(&self, owner: UserId) -> Result<Vec<Account>, LedgerError> {
        self.store.accounts_by_user(owner).await
    }

    /// Renames or re-describes an account. Type and balance stay as they are.
    pub async fn update_account(
        &self,
        owner: UserId,
        id: AccountId,
        details: &AccountDetails,
    ) -> Result<Account, LedgerError> {
        let details = validate_account_details(details)?;
        self.find_account(owner, id).await?;
        let account = self.store.update_account_details(id, details).await?;
        info!(user_id = %owner, account_id = %id, "Account updated");
        Ok(account)
    }

    /// Deletes an account no transaction references.
    pub async fn delete_account(&self, owner: UserId, id: AccountId) -> Result<(), LedgerError> {
        self.find_account(owner, id).await?;
        self.store.delete_account(id).await?;
        info!(user_id = %owner, account_id = %id, "Account deleted");
        Ok(())
    }

    // ========== Transactions ==========

    /// Records a transaction and applies its balance effect.
    #[instrument(skip_all, fields(user_id = %owner))]
    pub async fn create_transaction(
        &self,
        owner: UserId,
        input: &TransactionInput,
    ) -> Result<Transaction, LedgerError> {
        let new = validate_transaction_input(input)?;
        let mut unit = self.store.begin().await?;
        let result = apply_create(&mut unit, owner, new).await;
        let tx = finish(unit, result).await?;
        info!(
            transaction_id = %tx.id,
            kind = %tx.kind,
            amount = %tx.amount,
            "Transaction created"
        );
        Ok(tx)
    }

    /// Edits a transaction, moving its balance effect to the new accounts and
    /// amount.
    #[instrument(skip_all, fields(user_id = %owner, transaction_id = %id))]
    pub async fn update_transaction(
        &self,
        owner: UserId,
        id: TransactionId,
        update: &TransactionUpdate,
    ) -> Result<Transaction, LedgerError> {
        let changes = validate_transaction_update(update)?;
        let mut unit = self.store.begin().await?;
        let result = apply_update(&mut unit, owner, id, &changes, self.policy).await;
        let tx = finish(unit, result).await?;
        info!(amount = %tx.amount, "Transaction updated");
        Ok(tx)
    }

    /// Deletes a transaction and reverses its balance effect.
    #[instrument(skip_all, fields(user_id = %owner, transaction_id = %id))]
    pub async fn delete_transaction(
        &self,
        owner: UserId,
        id: TransactionId,
    ) -> Result<(), LedgerError> {
        let mut unit = self.store.begin().await?;
        let result = apply_delete(&mut unit, owner, id).await;
        finish(unit, result).await?;
        info!("Transaction deleted");
        Ok(())
    }

    /// Loads a transaction touching one of `owner`'s accounts.
    pub async fn find_transaction(
        &self,
        owner: UserId,
        id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        let tx = self.store.find_transaction(id).await?;
        let source = self.store.find_account(tx.source).await?;
        if source.is_owned_by(owner) {
            return Ok(tx);
        }
        let destination = self.store.find_account(tx.destination).await?;
        if destination.is_owned_by(owner) {
            return Ok(tx);
        }
        Err(LedgerError::TransactionNotFound(id))
    }

    /// All transactions touching one of `owner`'s accounts.
    pub async fn transactions_for_account(
        &self,
        owner: UserId,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, LedgerError> {
        self.find_account(owner, account_id).await?;
        self.store.transactions_by_account(account_id, None).await
    }

    // ========== Summaries ==========

    /// Income/expense of one account over `[start, end]`.
    pub async fn summary_for_account(
        &self,
        owner: UserId,
        account_id: AccountId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<AccountSummary, LedgerError> {
        let account = self.find_account(owner, account_id).await?;
        let mut summary = AccountSummary::for_account(&account);
        summary.set_period(start, end)?;
        let transactions = self
            .store
            .transactions_by_account(account_id, summary.period().as_ref())
            .await?;
        summary.compute(&transactions);
        debug!(
            account_id = %account_id,
            transactions = transactions.len(),
            "Account summary computed"
        );
        Ok(summary)
    }

    /// Income/expense across all of `owner`'s accounts over `[start, end]`.
    pub async fn summary_for_user(
        &self,
        owner: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<UserSummary, LedgerError> {
        let mut summary = UserSummary::new(owner);
        summary.set_period(start, end)?;
        let transactions = self
            .store
            .transactions_by_user(owner, summary.period.as_ref())
            .await?;
        summary.compute(&transactions);
        Ok(summary)
    }
}

fn ensure_owned(account: &Account, owner: UserId) -> Result<(), LedgerError> {
    if account.is_owned_by(owner) {
        Ok(())
    } else {
        Err(LedgerError::AccountNotOwned {
            account_id: account.id,
            user_id: owner,
        })
    }
}

/// A transaction is visible to the owner of either of its accounts.
fn ensure_visible(
    tx: &Transaction,
    accounts: &BTreeMap<AccountId, Account>,
    owner: UserId,
) -> Result<(), LedgerError> {
    let owns = |id: AccountId| accounts.get(&id).is_some_and(|a| a.is_owned_by(owner));
    if owns(tx.source) || owns(tx.destination) {
        Ok(())
    } else {
        Err(LedgerError::TransactionNotFound(tx.id))
    }
}

/// Commits on success, rolls back on failure.
async fn finish<U: LedgerUnit, T>(unit: U, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
    match result {
        Ok(value) => {
            unit.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = unit.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

/// Locks every distinct account in ascending id order.
async fn lock_accounts<U: LedgerUnit>(
    unit: &mut U,
    ids: &[AccountId],
) -> Result<BTreeMap<AccountId, Account>, LedgerError> {
    let ordered: BTreeSet<AccountId> = ids.iter().copied().collect();
    let mut locked = BTreeMap::new();
    for id in ordered {
        let account = unit.lock_account(id).await?;
        locked.insert(id, account);
    }
    Ok(locked)
}

fn locked(accounts: &BTreeMap<AccountId, Account>, id: AccountId) -> Result<&Account, LedgerError> {
    accounts.get(&id).ok_or(LedgerError::AccountNotFound(id))
}

/// Checks ownership of both accounts and the kind/type table.
fn check_accounts(
    accounts: &BTreeMap<AccountId, Account>,
    owner: UserId,
    effect: &TransactionEffect,
) -> Result<(), LedgerError> {
    let source = locked(accounts, effect.source)?;
    let destination = locked(accounts, effect.destination)?;
    ensure_owned(source, owner)?;
    ensure_owned(destination, owner)?;
    check_transaction_types(effect.kind, source.account_type, destination.account_type)
}

async fn check_funds<U: LedgerUnit>(
    unit: &mut U,
    requirement: FundsRequirement,
) -> Result<(), LedgerError> {
    let balance = unit.get_balance(requirement.account_id).await?;
    if balance < requirement.required {
        return Err(LedgerError::InsufficientFunds {
            account_id: requirement.account_id,
            balance,
            required: requirement.required,
        });
    }
    Ok(())
}

async fn apply_adjustments<U: LedgerUnit>(
    unit: &mut U,
    plan: &[BalanceAdjustment],
) -> Result<(), LedgerError> {
    for adjustment in plan {
        unit.adjust_balance(adjustment.account_id, adjustment.delta)
            .await?;
    }
    Ok(())
}

async fn apply_create<U: LedgerUnit>(
    unit: &mut U,
    owner: UserId,
    new: NewTransaction,
) -> Result<Transaction, LedgerError> {
    let effect = TransactionEffect {
        kind: new.kind,
        source: new.source,
        destination: new.destination,
        amount: new.amount,
    };
    let accounts = lock_accounts(unit, &[effect.source, effect.destination]).await?;
    check_accounts(&accounts, owner, &effect)?;

    if let Some(requirement) = create_requirement(&effect) {
        check_funds(unit, requirement).await?;
    }
    apply_adjustments(unit, &plan_create(&effect)).await?;
    unit.insert_transaction(new).await
}

async fn apply_update<U: LedgerUnit>(
    unit: &mut U,
    owner: UserId,
    id: TransactionId,
    changes: &TransactionChanges,
    policy: LedgerPolicy,
) -> Result<Transaction, LedgerError> {
    let old = unit.lock_transaction(id).await?;
    let new = old.with_changes(changes);
    let accounts = lock_accounts(
        unit,
        &[old.source, old.destination, new.source, new.destination],
    )
    .await?;
    ensure_visible(&old, &accounts, owner)?;

    let old_effect = TransactionEffect::from(&old);
    let new_effect = TransactionEffect::from(&new);
    check_accounts(&accounts, owner, &new_effect)?;

    if policy.enforce_funds_on_update
        && let Some(requirement) = update_requirement(&old_effect, &new_effect)
    {
        check_funds(unit, requirement).await?;
    }
    apply_adjustments(unit, &plan_update(&old_effect, &new_effect)).await?;
    unit.update_transaction_record(&new).await?;
    Ok(new)
}

async fn apply_delete<U: LedgerUnit>(
    unit: &mut U,
    owner: UserId,
    id: TransactionId,
) -> Result<(), LedgerError> {
    let tx = unit.lock_transaction(id).await?;
    let accounts = lock_accounts(unit, &[tx.source, tx.destination]).await?;
    ensure_visible(&tx, &accounts, owner)?;

    apply_adjustments(unit, &plan_delete(&TransactionEffect::from(&tx))).await?;
    unit.delete_transaction_record(id).await
}
