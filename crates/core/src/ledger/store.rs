//! Store contract consumed by the ledger engine.
//!
//! A [`LedgerStore`] serves reads and account administration. Every balance
//! mutation runs inside a [`LedgerUnit`], which commits or rolls back as a
//! whole. Dropping a unit without committing discards its writes.

use async_trait::async_trait;
use costs_shared::types::{AccountId, TransactionId, UserId};
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::summary::Period;
use super::types::{Account, AccountDetails, NewAccount, NewTransaction, Transaction};

/// Persistent storage for accounts and transactions.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Atomic unit type.
    type Unit: LedgerUnit;

    /// Opens a new atomic unit.
    async fn begin(&self) -> Result<Self::Unit, LedgerError>;

    /// Stores a new account with its opening balance.
    async fn insert_account(&self, account: NewAccount) -> Result<Account, LedgerError>;

    /// Loads an account.
    async fn find_account(&self, id: AccountId) -> Result<Account, LedgerError>;

    /// Lists a user's accounts, oldest first.
    async fn accounts_by_user(&self, user_id: UserId) -> Result<Vec<Account>, LedgerError>;

    /// Changes an account's name and description.
    async fn update_account_details(
        &self,
        id: AccountId,
        details: AccountDetails,
    ) -> Result<Account, LedgerError>;

    /// Deletes an account that no transaction references.
    ///
    /// Fails with `AccountInUse` otherwise.
    async fn delete_account(&self, id: AccountId) -> Result<(), LedgerError>;

    /// Loads a transaction.
    async fn find_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError>;

    /// Transactions where the account is source or destination, optionally
    /// restricted to a window on either side.
    async fn transactions_by_account(
        &self,
        account_id: AccountId,
        period: Option<&Period>,
    ) -> Result<Vec<Transaction>, LedgerError>;

    /// Transactions touching any account of the user.
    async fn transactions_by_user(
        &self,
        user_id: UserId,
        period: Option<&Period>,
    ) -> Result<Vec<Transaction>, LedgerError>;
}

/// Reads and writes that commit or roll back together.
#[async_trait]
pub trait LedgerUnit: Send {
    /// Loads an account and holds it exclusively until the unit ends.
    async fn lock_account(&mut self, id: AccountId) -> Result<Account, LedgerError>;

    /// Reads the balance as seen by this unit.
    async fn get_balance(&mut self, id: AccountId) -> Result<Decimal, LedgerError>;

    /// Adds `delta` to the balance.
    async fn adjust_balance(&mut self, id: AccountId, delta: Decimal) -> Result<(), LedgerError>;

    /// Loads a transaction and holds it exclusively until the unit ends, so a
    /// concurrent update or delete of the same record waits and then sees the
    /// committed version.
    async fn lock_transaction(&mut self, id: TransactionId) -> Result<Transaction, LedgerError>;

    /// Stores a new transaction record.
    async fn insert_transaction(&mut self, tx: NewTransaction) -> Result<Transaction, LedgerError>;

    /// Overwrites the mutable fields of an existing record.
    async fn update_transaction_record(&mut self, tx: &Transaction) -> Result<(), LedgerError>;

    /// Removes a transaction record.
    async fn delete_transaction_record(&mut self, id: TransactionId) -> Result<(), LedgerError>;

    /// Makes every write of the unit visible.
    async fn commit(self) -> Result<(), LedgerError>;

    /// Discards every write of the unit.
    async fn rollback(self) -> Result<(), LedgerError>;
}
