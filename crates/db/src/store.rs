//! SQL implementation of the ledger store contract.
//!
//! A unit is one database transaction. The edited transaction row and the
//! accounts are read with `SELECT ... FOR UPDATE` on PostgreSQL, and balances
//! change through `UPDATE accounts SET balance = balance + $delta`, so
//! concurrent units on the same record or account serialize in the database.

use async_trait::async_trait;
use costs_core::ledger::{
    Account, AccountDetails, LedgerError, LedgerStore, LedgerUnit, NewAccount, NewTransaction,
    Period, Transaction,
};
use costs_shared::types::{AccountId, TransactionId, UserId};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use tracing::{debug, error, warn};

use crate::repositories::{AccountError, AccountRepository, TransactionError, TransactionRepository};

impl From<AccountError> for LedgerError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound(id) => Self::AccountNotFound(id),
            AccountError::HasTransactions(id, _) => Self::AccountInUse(id),
            AccountError::UnsupportedType(raw) => Self::UnsupportedAccountType(raw),
            AccountError::Database(e) => storage(&e),
        }
    }
}

impl From<TransactionError> for LedgerError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::NotFound(id) => Self::TransactionNotFound(id),
            TransactionError::UnknownKind(raw) => {
                Self::Storage(format!("Stored transaction has unknown kind '{raw}'"))
            }
            TransactionError::Database(e) => storage(&e),
        }
    }
}

fn storage(err: &DbErr) -> LedgerError {
    error!(error = %err, "Database error");
    LedgerError::Storage(err.to_string())
}

/// Ledger store backed by a `SeaORM` connection pool.
#[derive(Debug, Clone)]
pub struct SqlLedgerStore {
    db: DatabaseConnection,
}

impl SqlLedgerStore {
    /// Creates a store over `db`.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for SqlLedgerStore {
    type Unit = SqlLedgerUnit;

    async fn begin(&self) -> Result<Self::Unit, LedgerError> {
        let txn = self.db.begin().await.map_err(|e| storage(&e))?;
        Ok(SqlLedgerUnit { txn })
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, LedgerError> {
        Ok(AccountRepository::new(&self.db).create(account).await?)
    }

    async fn find_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        Ok(AccountRepository::new(&self.db).find(id).await?)
    }

    async fn accounts_by_user(&self, user_id: UserId) -> Result<Vec<Account>, LedgerError> {
        Ok(AccountRepository::new(&self.db).list_by_user(user_id).await?)
    }

    async fn update_account_details(
        &self,
        id: AccountId,
        details: AccountDetails,
    ) -> Result<Account, LedgerError> {
        Ok(AccountRepository::new(&self.db)
            .update_details(id, details)
            .await?)
    }

    async fn delete_account(&self, id: AccountId) -> Result<(), LedgerError> {
        // The row lock keeps new transactions off the account between the
        // reference count and the delete.
        let txn = self.db.begin().await.map_err(|e| storage(&e))?;
        let result = {
            let accounts = AccountRepository::new(&txn);
            match accounts.find_for_update(id).await {
                Ok(_) => accounts.delete(id).await,
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(()) => txn.commit().await.map_err(|e| storage(&e)),
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, account_id = %id, "Rollback failed");
                }
                Err(e.into())
            }
        }
    }

    async fn find_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        Ok(TransactionRepository::new(&self.db).find(id).await?)
    }

    async fn transactions_by_account(
        &self,
        account_id: AccountId,
        period: Option<&Period>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        Ok(TransactionRepository::new(&self.db)
            .list_by_account(account_id, period)
            .await?)
    }

    async fn transactions_by_user(
        &self,
        user_id: UserId,
        period: Option<&Period>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        Ok(TransactionRepository::new(&self.db)
            .list_by_user(user_id, period)
            .await?)
    }
}

/// A database transaction acting as one ledger unit.
///
/// Dropping it without `commit` rolls the database transaction back.
pub struct SqlLedgerUnit {
    txn: DatabaseTransaction,
}

#[async_trait]
impl LedgerUnit for SqlLedgerUnit {
    async fn lock_account(&mut self, id: AccountId) -> Result<Account, LedgerError> {
        let account = AccountRepository::new(&self.txn).find_for_update(id).await?;
        debug!(account_id = %id, "Account locked");
        Ok(account)
    }

    async fn get_balance(&mut self, id: AccountId) -> Result<Decimal, LedgerError> {
        Ok(AccountRepository::new(&self.txn).balance(id).await?)
    }

    async fn adjust_balance(&mut self, id: AccountId, delta: Decimal) -> Result<(), LedgerError> {
        AccountRepository::new(&self.txn)
            .adjust_balance(id, delta)
            .await?;
        debug!(account_id = %id, delta = %delta, "Balance adjusted");
        Ok(())
    }

    async fn lock_transaction(&mut self, id: TransactionId) -> Result<Transaction, LedgerError> {
        let tx = TransactionRepository::new(&self.txn)
            .find_for_update(id)
            .await?;
        debug!(transaction_id = %id, "Transaction locked");
        Ok(tx)
    }

    async fn insert_transaction(&mut self, tx: NewTransaction) -> Result<Transaction, LedgerError> {
        Ok(TransactionRepository::new(&self.txn).create(tx).await?)
    }

    async fn update_transaction_record(&mut self, tx: &Transaction) -> Result<(), LedgerError> {
        Ok(TransactionRepository::new(&self.txn).update(tx).await?)
    }

    async fn delete_transaction_record(&mut self, id: TransactionId) -> Result<(), LedgerError> {
        Ok(TransactionRepository::new(&self.txn).delete(id).await?)
    }

    async fn commit(self) -> Result<(), LedgerError> {
        self.txn.commit().await.map_err(|e| storage(&e))
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        self.txn.rollback().await.map_err(|e| storage(&e))
    }
}
