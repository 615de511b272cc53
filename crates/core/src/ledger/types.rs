//! Ledger domain types: the account taxonomy, transaction kinds and the
//! account/transaction records the engine works with.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use costs_shared::types::{AccountId, TransactionId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// The five account kinds.
///
/// `Current`, `Saving` and `Debt` carry a balance; `IncomeSource` and
/// `ExpenseCategory` only label where money comes from or goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Everyday account.
    Current,
    /// Savings account.
    Saving,
    /// Loan or credit account.
    Debt,
    /// Where income originates (salary, interest...).
    IncomeSource,
    /// Where money is spent (groceries, rent...).
    ExpenseCategory,
}

/// Coarse classification of [`AccountType`] used by the transaction rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountClass {
    /// Balance-bearing account (Current, Saving, Debt).
    Standard,
    /// Non-tracked origin of income.
    IncomeSource,
    /// Non-tracked spend target.
    ExpenseCategory,
}

impl AccountType {
    /// All account kinds, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Current,
        Self::Saving,
        Self::Debt,
        Self::IncomeSource,
        Self::ExpenseCategory,
    ];

    /// Returns the canonical name of the account type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Current => "Current",
            Self::Saving => "Saving",
            Self::Debt => "Debt",
            Self::IncomeSource => "IncomeSource",
            Self::ExpenseCategory => "ExpenseCategory",
        }
    }

    /// Returns the class this account type belongs to.
    #[must_use]
    pub const fn class(self) -> AccountClass {
        match self {
            Self::Current | Self::Saving | Self::Debt => AccountClass::Standard,
            Self::IncomeSource => AccountClass::IncomeSource,
            Self::ExpenseCategory => AccountClass::ExpenseCategory,
        }
    }

    /// Returns true for balance-bearing account types.
    #[must_use]
    pub const fn is_standard(self) -> bool {
        matches!(self.class(), AccountClass::Standard)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| LedgerError::InvalidAccountType(s.to_string()))
    }
}

/// The three transaction kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Transfer between two standard accounts.
    Standard,
    /// Money arriving from an income source into a standard account.
    Income,
    /// Money leaving a standard account into an expense category.
    Expense,
}

impl TransactionKind {
    /// All transaction kinds, in declaration order.
    pub const ALL: [Self; 3] = [Self::Standard, Self::Income, Self::Expense];

    /// Returns the canonical name of the transaction kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }

    /// Returns true if this kind takes the amount out of the source balance.
    #[must_use]
    pub const fn debits_source(self) -> bool {
        matches!(self, Self::Standard | Self::Expense)
    }

    /// Returns true if this kind adds the amount to the destination balance.
    #[must_use]
    pub const fn credits_destination(self) -> bool {
        matches!(self, Self::Standard | Self::Income)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| LedgerError::InvalidTransactionKind(s.to_string()))
    }
}

/// An account with its live balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Owning user.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Account type, fixed at creation.
    pub account_type: AccountType,
    /// Free-form description.
    pub description: String,
    /// Current balance.
    pub balance: Decimal,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Returns true if the account belongs to `user_id`.
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// Raw account creation request, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountInput {
    /// Display name (required).
    #[serde(default)]
    pub name: String,
    /// Account type name (required).
    pub account_type: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Opening balance.
    #[serde(default)]
    pub balance: Decimal,
}

/// Validated account ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    /// Owning user.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Free-form description.
    pub description: String,
    /// Opening balance.
    pub opening_balance: Decimal,
}

/// Mutable account fields. The type and balance are not among them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountDetails {
    /// Display name (required).
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// A persisted transaction. Accounts are referenced by ID only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the movement happened, as given by the caller.
    pub transaction_date: DateTime<Utc>,
    /// Transaction kind, fixed at creation.
    pub kind: TransactionKind,
    /// Account the money leaves.
    pub source: AccountId,
    /// Account the money arrives in.
    pub destination: AccountId,
    /// Amount moved (always positive).
    pub amount: Decimal,
    /// Free-form description.
    pub description: String,
}

impl Transaction {
    /// Returns true if the transaction touches `account_id` on either side.
    #[must_use]
    pub fn references(&self, account_id: AccountId) -> bool {
        self.source == account_id || self.destination == account_id
    }

    /// Returns a copy of this transaction with the given changes applied.
    #[must_use]
    pub fn with_changes(&self, changes: &TransactionChanges) -> Self {
        Self {
            id: self.id,
            created_at: self.created_at,
            transaction_date: changes.transaction_date.unwrap_or(self.transaction_date),
            kind: self.kind,
            source: changes.source,
            destination: changes.destination,
            amount: changes.amount,
            description: changes.description.clone(),
        }
    }
}

/// Raw transaction creation request, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionInput {
    /// Transaction kind name (required).
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Source account (required).
    pub source: Option<AccountId>,
    /// Destination account (required).
    pub destination: Option<AccountId>,
    /// Amount (required, strictly positive).
    pub amount: Option<Decimal>,
    /// When the movement happened; defaults to now.
    pub transaction_date: Option<DateTime<Utc>>,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// Validated transaction ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// When the movement happened.
    pub transaction_date: DateTime<Utc>,
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Source account.
    pub source: AccountId,
    /// Destination account.
    pub destination: AccountId,
    /// Amount moved.
    pub amount: Decimal,
    /// Free-form description.
    pub description: String,
}

/// Raw transaction edit request, before validation.
///
/// The kind cannot be edited; accounts, amount, date and description can.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionUpdate {
    /// New source account (required).
    pub source: Option<AccountId>,
    /// New destination account (required).
    pub destination: Option<AccountId>,
    /// New amount (required, strictly positive).
    pub amount: Option<Decimal>,
    /// New transaction date; keeps the current one when absent.
    pub transaction_date: Option<DateTime<Utc>>,
    /// New description.
    #[serde(default)]
    pub description: String,
}

/// Validated transaction edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionChanges {
    /// New source account.
    pub source: AccountId,
    /// New destination account.
    pub destination: AccountId,
    /// New amount.
    pub amount: Decimal,
    /// New transaction date, if changed.
    pub transaction_date: Option<DateTime<Utc>>,
    /// New description.
    pub description: String,
}
