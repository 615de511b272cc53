//! Personal ledger logic.
//!
//! This module implements the core ledger functionality:
//! - Account type taxonomy and transaction kinds
//! - Transaction type rules and input validation
//! - Balance adjustment planning for create, update and delete
//! - Per-account and per-user summaries over a date window
//! - The store contract and an in-memory store
//! - The ledger engine running every mutation in one atomic unit

pub mod balance;
pub mod error;
pub mod memory;
pub mod service;
pub mod store;
pub mod summary;
pub mod types;
pub mod validation;

#[cfg(test)]
mod balance_props;
#[cfg(test)]
mod service_tests;

pub use balance::{BalanceAdjustment, TransactionEffect};
pub use error::LedgerError;
pub use memory::MemoryLedgerStore;
pub use service::{LedgerEngine, LedgerPolicy};
pub use store::{LedgerStore, LedgerUnit};
pub use summary::{
    AccountSummary, ExpenseCategorySummary, IncomeAccountSummary, Period, StandardAccountSummary,
    UserSummary,
};
pub use types::{
    Account, AccountClass, AccountDetails, AccountInput, AccountType, NewAccount, NewTransaction,
    Transaction, TransactionChanges, TransactionInput, TransactionKind, TransactionUpdate,
};
pub use validation::check_transaction_types;
