//! Ledger error types.
//!
//! Every error is terminal for the operation that raised it. Validation errors
//! are raised before any write; storage errors abort the current unit, which
//! rolls back everything staged so far.

use chrono::{DateTime, Utc};
use costs_shared::types::{AccountId, TransactionId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{AccountType, TransactionKind};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// A required field was not supplied.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Amount must be strictly positive.
    #[error("Amount must be greater than zero, got {0}")]
    InvalidAmount(Decimal),

    /// Account type is not one of the known kinds.
    #[error("Invalid account type: {0}")]
    InvalidAccountType(String),

    /// Transaction kind is not one of the known kinds.
    #[error("Invalid transaction type: {0}")]
    InvalidTransactionKind(String),

    /// The transaction kind does not allow these account types.
    #[error("Transaction and account type mismatch: {kind} from {source_type} to {destination_type}")]
    TypeMismatch {
        /// Transaction kind.
        kind: TransactionKind,
        /// Type of the source account.
        source_type: AccountType,
        /// Type of the destination account.
        destination_type: AccountType,
    },

    /// Summary period is empty or inverted.
    #[error("Invalid period: start {start} must be before end {end}")]
    InvalidPeriod {
        /// Period start.
        start: DateTime<Utc>,
        /// Period end.
        end: DateTime<Utc>,
    },

    // ========== Balance Errors ==========
    /// Source account cannot cover the amount.
    #[error("Not enough funds on account {account_id}: balance {balance}, required {required}")]
    InsufficientFunds {
        /// The account being debited.
        account_id: AccountId,
        /// Its balance at check time.
        balance: Decimal,
        /// The amount that had to be covered.
        required: Decimal,
    },

    // ========== Account Errors ==========
    /// Stored account type has no summary or rule attached.
    #[error("Unsupported account type: {0}")]
    UnsupportedAccountType(String),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account belongs to a different user.
    #[error("Account {account_id} does not belong to user {user_id}")]
    AccountNotOwned {
        /// The account.
        account_id: AccountId,
        /// The calling user.
        user_id: UserId,
    },

    /// Account cannot be deleted while transactions reference it.
    #[error("Account {0} still has transactions")]
    AccountInUse(AccountId),

    // ========== Transaction Errors ==========
    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    // ========== Storage Errors ==========
    /// Storage failure (connection, commit, query).
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidAccountType(_) => "INVALID_ACCOUNT_TYPE",
            Self::InvalidTransactionKind(_) => "INVALID_TRANSACTION_TYPE",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::InvalidPeriod { .. } => "INVALID_PERIOD",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::UnsupportedAccountType(_) => "UNSUPPORTED_ACCOUNT_TYPE",
            Self::AccountNotFound(_) | Self::TransactionNotFound(_) => "NOT_FOUND",
            Self::AccountNotOwned { .. } => "ACCOUNT_NOT_OWNED",
            Self::AccountInUse(_) => "ACCOUNT_IN_USE",
            Self::Storage(_) => "STORAGE_FAILURE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::MissingField(_)
            | Self::InvalidAmount(_)
            | Self::InvalidAccountType(_)
            | Self::InvalidTransactionKind(_)
            | Self::TypeMismatch { .. }
            | Self::InvalidPeriod { .. } => 400,

            // 403 Forbidden
            Self::AccountNotOwned { .. } => 403,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::TransactionNotFound(_) => 404,

            // 409 Conflict
            Self::AccountInUse(_) => 409,

            // 422 Unprocessable - business rule
            Self::InsufficientFunds { .. } => 422,

            // 500 Internal Server Error
            Self::UnsupportedAccountType(_) | Self::Storage(_) => 500,
        }
    }

    /// Returns true for the not-found family of errors.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AccountNotFound(_) | Self::TransactionNotFound(_))
    }

    /// Returns true if the error was raised before anything was written.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.http_status_code() == 400
    }
}
