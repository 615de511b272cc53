//! Income/expense summaries over a date window.
//!
//! The summary shape depends on the subject account's class:
//!
//! | Class           | income                    | expense                   |
//! |-----------------|---------------------------|---------------------------|
//! | Standard        | subject is destination    | subject is source         |
//! | IncomeSource    | subject is source         | -                         |
//! | ExpenseCategory | -                         | subject is destination    |

use chrono::{DateTime, Utc};
use costs_shared::types::{AccountId, UserId};
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::LedgerError;
use super::types::{Account, AccountClass, Transaction, TransactionKind};

/// A closed, non-empty date window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Period {
    /// Creates a period.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidPeriod` unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, LedgerError> {
        if start >= end {
            return Err(LedgerError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window start (inclusive).
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Window end (inclusive).
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns true if `at` falls inside the window.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Summary of a balance-bearing account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandardAccountSummary {
    /// Subject account.
    pub account_id: AccountId,
    /// Window the totals cover.
    pub period: Option<Period>,
    /// Money received.
    pub income: Decimal,
    /// Money sent.
    pub expense: Decimal,
}

/// Summary of an income source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncomeAccountSummary {
    /// Subject account.
    pub account_id: AccountId,
    /// Window the totals cover.
    pub period: Option<Period>,
    /// Money that originated here.
    pub income: Decimal,
}

/// Summary of an expense category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseCategorySummary {
    /// Subject account.
    pub account_id: AccountId,
    /// Window the totals cover.
    pub period: Option<Period>,
    /// Money spent here.
    pub expense: Decimal,
}

/// Per-account summary, shaped by the account's class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountSummary {
    /// Current, Saving or Debt account.
    Standard(StandardAccountSummary),
    /// Income source.
    IncomeSource(IncomeAccountSummary),
    /// Expense category.
    ExpenseCategory(ExpenseCategorySummary),
}

impl AccountSummary {
    /// Selects the summary variant for `account`.
    #[must_use]
    pub fn for_account(account: &Account) -> Self {
        let account_id = account.id;
        match account.account_type.class() {
            AccountClass::Standard => Self::Standard(StandardAccountSummary {
                account_id,
                period: None,
                income: Decimal::ZERO,
                expense: Decimal::ZERO,
            }),
            AccountClass::IncomeSource => Self::IncomeSource(IncomeAccountSummary {
                account_id,
                period: None,
                income: Decimal::ZERO,
            }),
            AccountClass::ExpenseCategory => Self::ExpenseCategory(ExpenseCategorySummary {
                account_id,
                period: None,
                expense: Decimal::ZERO,
            }),
        }
    }

    /// Sets the window the next [`compute`](Self::compute) covers.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidPeriod` unless `start < end`.
    pub fn set_period(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), LedgerError> {
        let period = Period::new(start, end)?;
        match self {
            Self::Standard(s) => s.period = Some(period),
            Self::IncomeSource(s) => s.period = Some(period),
            Self::ExpenseCategory(s) => s.period = Some(period),
        }
        Ok(())
    }

    /// The window, once set.
    #[must_use]
    pub fn period(&self) -> Option<Period> {
        match self {
            Self::Standard(s) => s.period,
            Self::IncomeSource(s) => s.period,
            Self::ExpenseCategory(s) => s.period,
        }
    }

    /// Subject account.
    #[must_use]
    pub fn account_id(&self) -> AccountId {
        match self {
            Self::Standard(s) => s.account_id,
            Self::IncomeSource(s) => s.account_id,
            Self::ExpenseCategory(s) => s.account_id,
        }
    }

    /// Total income (zero for expense categories).
    #[must_use]
    pub fn income(&self) -> Decimal {
        match self {
            Self::Standard(s) => s.income,
            Self::IncomeSource(s) => s.income,
            Self::ExpenseCategory(_) => Decimal::ZERO,
        }
    }

    /// Total expense (zero for income sources).
    #[must_use]
    pub fn expense(&self) -> Decimal {
        match self {
            Self::Standard(s) => s.expense,
            Self::IncomeSource(_) => Decimal::ZERO,
            Self::ExpenseCategory(s) => s.expense,
        }
    }

    /// Recomputes the totals from `transactions`.
    ///
    /// Totals start from zero on every call. Transactions dated outside the
    /// period, when one is set, are ignored.
    pub fn compute(&mut self, transactions: &[Transaction]) {
        let period = self.period();
        let in_window = |tx: &&Transaction| period.is_none_or(|p| p.contains(tx.transaction_date));

        match self {
            Self::Standard(s) => {
                s.income = Decimal::ZERO;
                s.expense = Decimal::ZERO;
                for tx in transactions.iter().filter(in_window) {
                    if tx.destination == s.account_id {
                        s.income += tx.amount;
                    }
                    if tx.source == s.account_id {
                        s.expense += tx.amount;
                    }
                }
            }
            Self::IncomeSource(s) => {
                s.income = transactions
                    .iter()
                    .filter(in_window)
                    .filter(|tx| tx.source == s.account_id)
                    .map(|tx| tx.amount)
                    .sum();
            }
            Self::ExpenseCategory(s) => {
                s.expense = transactions
                    .iter()
                    .filter(in_window)
                    .filter(|tx| tx.destination == s.account_id)
                    .map(|tx| tx.amount)
                    .sum();
            }
        }
    }
}

/// Income and expense across all of a user's accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    /// Subject user.
    pub user_id: UserId,
    /// Window the totals cover.
    pub period: Option<Period>,
    /// Sum of Income transactions.
    pub income: Decimal,
    /// Sum of Expense transactions.
    pub expense: Decimal,
}

impl UserSummary {
    /// Empty summary for `user_id`.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            period: None,
            income: Decimal::ZERO,
            expense: Decimal::ZERO,
        }
    }

    /// Sets the window the next [`compute`](Self::compute) covers.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidPeriod` unless `start < end`.
    pub fn set_period(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), LedgerError> {
        self.period = Some(Period::new(start, end)?);
        Ok(())
    }

    /// Recomputes the totals from the user's `transactions`. Standard
    /// transfers move money between the user's own accounts and are not counted.
    pub fn compute(&mut self, transactions: &[Transaction]) {
        self.income = Decimal::ZERO;
        self.expense = Decimal::ZERO;
        let period = self.period;
        for tx in transactions
            .iter()
            .filter(|tx| period.is_none_or(|p| p.contains(tx.transaction_date)))
        {
            match tx.kind {
                TransactionKind::Income => self.income += tx.amount,
                TransactionKind::Expense => self.expense += tx.amount,
                TransactionKind::Standard => {}
            }
        }
    }

    /// Income minus expense.
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.income - self.expense
    }
}
