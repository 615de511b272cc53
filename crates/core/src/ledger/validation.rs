//! Input validation and the transaction-type rules.
//!
//! | Kind     | Source          | Destination     |
//! |----------|-----------------|-----------------|
//! | Standard | Standard        | Standard        |
//! | Income   | IncomeSource    | Standard        |
//! | Expense  | Standard        | ExpenseCategory |

use chrono::Utc;
use costs_shared::types::UserId;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{
    AccountClass, AccountDetails, AccountInput, AccountType, NewAccount, NewTransaction,
    TransactionChanges, TransactionInput, TransactionKind, TransactionUpdate,
};

/// Checks that `kind` may move money from `source` to `destination`.
///
/// # Errors
///
/// Returns `LedgerError::TypeMismatch` for any combination outside the table.
pub fn check_transaction_types(
    kind: TransactionKind,
    source: AccountType,
    destination: AccountType,
) -> Result<(), LedgerError> {
    let allowed = match kind {
        TransactionKind::Standard => source.is_standard() && destination.is_standard(),
        TransactionKind::Income => {
            source.class() == AccountClass::IncomeSource && destination.is_standard()
        }
        TransactionKind::Expense => {
            source.is_standard() && destination.class() == AccountClass::ExpenseCategory
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(LedgerError::TypeMismatch {
            kind,
            source_type: source,
            destination_type: destination,
        })
    }
}

/// Validates an account creation request for `user_id`.
///
/// # Errors
///
/// `MissingField` for a blank name or absent type, `InvalidAccountType` for an
/// unknown type name.
pub fn validate_account_input(
    user_id: UserId,
    input: &AccountInput,
) -> Result<NewAccount, LedgerError> {
    let name = required_name(&input.name)?;
    let account_type: AccountType = input
        .account_type
        .as_deref()
        .ok_or(LedgerError::MissingField("account_type"))?
        .parse()?;

    Ok(NewAccount {
        user_id,
        name,
        account_type,
        description: input.description.clone(),
        opening_balance: input.balance,
    })
}

/// Validates an account details edit.
///
/// # Errors
///
/// `MissingField` for a blank name.
pub fn validate_account_details(details: &AccountDetails) -> Result<AccountDetails, LedgerError> {
    Ok(AccountDetails {
        name: required_name(&details.name)?,
        description: details.description.clone(),
    })
}

/// Validates a transaction creation request. Account types are checked later,
/// once the accounts are loaded.
///
/// # Errors
///
/// `MissingField`, `InvalidTransactionKind` or `InvalidAmount`.
pub fn validate_transaction_input(input: &TransactionInput) -> Result<NewTransaction, LedgerError> {
    let source = input.source.ok_or(LedgerError::MissingField("source"))?;
    let destination = input
        .destination
        .ok_or(LedgerError::MissingField("destination"))?;
    let amount = positive_amount(input.amount)?;
    let kind: TransactionKind = input
        .kind
        .as_deref()
        .ok_or(LedgerError::MissingField("type"))?
        .parse()?;

    Ok(NewTransaction {
        transaction_date: input.transaction_date.unwrap_or_else(Utc::now),
        kind,
        source,
        destination,
        amount,
        description: input.description.clone(),
    })
}

/// Validates a transaction edit request.
///
/// # Errors
///
/// `MissingField` or `InvalidAmount`.
pub fn validate_transaction_update(
    update: &TransactionUpdate,
) -> Result<TransactionChanges, LedgerError> {
    let source = update.source.ok_or(LedgerError::MissingField("source"))?;
    let destination = update
        .destination
        .ok_or(LedgerError::MissingField("destination"))?;
    let amount = positive_amount(update.amount)?;

    Ok(TransactionChanges {
        source,
        destination,
        amount,
        transaction_date: update.transaction_date,
        description: update.description.clone(),
    })
}

fn required_name(name: &str) -> Result<String, LedgerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::MissingField("name"));
    }
    Ok(trimmed.to_string())
}

fn positive_amount(amount: Option<Decimal>) -> Result<Decimal, LedgerError> {
    let amount = amount.ok_or(LedgerError::MissingField("amount"))?;
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(amount)
}
