//! In-memory [`LedgerStore`].
//!
//! Units run one at a time: a unit holds the store lock from `begin` until it
//! commits or rolls back, and works on a staged copy of the state that only
//! replaces the live state on commit.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use costs_shared::types::{AccountId, TransactionId, UserId};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::error::LedgerError;
use super::store::{LedgerStore, LedgerUnit};
use super::summary::Period;
use super::types::{Account, AccountDetails, NewAccount, NewTransaction, Transaction};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: BTreeMap<AccountId, Account>,
    transactions: BTreeMap<TransactionId, Transaction>,
}

impl MemoryState {
    fn account(&self, id: AccountId) -> Result<&Account, LedgerError> {
        self.accounts.get(&id).ok_or(LedgerError::AccountNotFound(id))
    }

    fn account_mut(&mut self, id: AccountId) -> Result<&mut Account, LedgerError> {
        self.accounts
            .get_mut(&id)
            .ok_or(LedgerError::AccountNotFound(id))
    }

    fn transaction(&self, id: TransactionId) -> Result<&Transaction, LedgerError> {
        self.transactions
            .get(&id)
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    fn select_transactions(
        &self,
        mut keep: impl FnMut(&Transaction) -> bool,
        period: Option<&Period>,
    ) -> Vec<Transaction> {
        let mut found: Vec<Transaction> = self
            .transactions
            .values()
            .filter(|tx| keep(tx))
            .filter(|tx| period.is_none_or(|p| p.contains(tx.transaction_date)))
            .cloned()
            .collect();
        found.sort_by_key(|tx| (tx.transaction_date, tx.id));
        found
    }
}

/// Ledger store kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next unit commit fail with a storage error.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of stored transactions.
    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.transactions.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Unit = MemoryLedgerUnit;

    async fn begin(&self) -> Result<Self::Unit, LedgerError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryLedgerUnit {
            live: guard,
            staged,
            fail_commit: Arc::clone(&self.fail_next_commit),
        })
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, LedgerError> {
        let account = Account {
            id: AccountId::new(),
            user_id: account.user_id,
            name: account.name,
            account_type: account.account_type,
            description: account.description,
            balance: account.opening_balance,
            created_at: Utc::now(),
        };
        self.state
            .lock()
            .await
            .accounts
            .insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.state.lock().await.account(id).cloned()
    }

    async fn accounts_by_user(&self, user_id: UserId) -> Result<Vec<Account>, LedgerError> {
        let state = self.state.lock().await;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| a.is_owned_by(user_id))
            .cloned()
            .collect();
        accounts.sort_by_key(|a| (a.created_at, a.id));
        Ok(accounts)
    }

    async fn update_account_details(
        &self,
        id: AccountId,
        details: AccountDetails,
    ) -> Result<Account, LedgerError> {
        let mut state = self.state.lock().await;
        let account = state.account_mut(id)?;
        account.name = details.name;
        account.description = details.description;
        Ok(account.clone())
    }

    async fn delete_account(&self, id: AccountId) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        state.account(id)?;
        if state.transactions.values().any(|tx| tx.references(id)) {
            return Err(LedgerError::AccountInUse(id));
        }
        state.accounts.remove(&id);
        Ok(())
    }

    async fn find_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.state.lock().await.transaction(id).cloned()
    }

    async fn transactions_by_account(
        &self,
        account_id: AccountId,
        period: Option<&Period>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.select_transactions(|tx| tx.references(account_id), period))
    }

    async fn transactions_by_user(
        &self,
        user_id: UserId,
        period: Option<&Period>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let state = self.state.lock().await;
        let owned = |id: AccountId| {
            state
                .accounts
                .get(&id)
                .is_some_and(|a| a.is_owned_by(user_id))
        };
        Ok(state.select_transactions(|tx| owned(tx.source) || owned(tx.destination), period))
    }
}

/// Unit of work over a [`MemoryLedgerStore`].
pub struct MemoryLedgerUnit {
    live: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_commit: Arc<AtomicBool>,
}

#[async_trait]
impl LedgerUnit for MemoryLedgerUnit {
    async fn lock_account(&mut self, id: AccountId) -> Result<Account, LedgerError> {
        self.staged.account(id).cloned()
    }

    async fn get_balance(&mut self, id: AccountId) -> Result<Decimal, LedgerError> {
        Ok(self.staged.account(id)?.balance)
    }

    async fn adjust_balance(&mut self, id: AccountId, delta: Decimal) -> Result<(), LedgerError> {
        self.staged.account_mut(id)?.balance += delta;
        Ok(())
    }

    async fn lock_transaction(&mut self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.staged.transaction(id).cloned()
    }

    async fn insert_transaction(&mut self, tx: NewTransaction) -> Result<Transaction, LedgerError> {
        let tx = Transaction {
            id: TransactionId::new(),
            created_at: Utc::now(),
            transaction_date: tx.transaction_date,
            kind: tx.kind,
            source: tx.source,
            destination: tx.destination,
            amount: tx.amount,
            description: tx.description,
        };
        self.staged.transactions.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn update_transaction_record(&mut self, tx: &Transaction) -> Result<(), LedgerError> {
        let stored = self
            .staged
            .transactions
            .get_mut(&tx.id)
            .ok_or(LedgerError::TransactionNotFound(tx.id))?;
        *stored = tx.clone();
        Ok(())
    }

    async fn delete_transaction_record(&mut self, id: TransactionId) -> Result<(), LedgerError> {
        self.staged
            .transactions
            .remove(&id)
            .map(|_| ())
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    async fn commit(self) -> Result<(), LedgerError> {
        let Self {
            mut live,
            staged,
            fail_commit,
        } = self;
        if fail_commit.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::Storage("commit failed".to_string()));
        }
        *live = staged;
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        Ok(())
    }
}
