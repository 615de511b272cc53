//! Account repository for ledger account database operations.
//!
//! Works over any `SeaORM` connection, so the same queries serve the pool and
//! an open database transaction.

use chrono::Utc;
use costs_core::ledger::{Account, AccountDetails, AccountType, NewAccount};
use costs_shared::types::{AccountId, UserId};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{accounts, transactions};

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Account not found.
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    /// Cannot delete account because transactions reference it.
    #[error("Cannot delete account {0}: it has {1} transactions")]
    HasTransactions(AccountId, u64),

    /// Stored account type is not one the ledger knows.
    #[error("Unsupported account type '{0}'")]
    UnsupportedType(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Account repository.
#[derive(Debug, Clone, Copy)]
pub struct AccountRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> AccountRepository<'c, C> {
    /// Creates a repository over `conn`.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Inserts a new account with its opening balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create(&self, input: NewAccount) -> Result<Account, AccountError> {
        let account = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            user_id: Set(input.user_id.into_inner()),
            name: Set(input.name),
            account_type: Set(input.account_type.as_str().to_string()),
            description: Set(input.description),
            balance: Set(input.opening_balance),
            created_at: Set(Utc::now()),
        };

        let model = account.insert(self.conn).await?;
        to_account(model)
    }

    /// Finds an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such account.
    pub async fn find(&self, id: AccountId) -> Result<Account, AccountError> {
        let model = accounts::Entity::find_by_id(id.into_inner())
            .one(self.conn)
            .await?
            .ok_or(AccountError::NotFound(id))?;
        to_account(model)
    }

    /// Finds an account and locks its row until the surrounding database
    /// transaction ends.
    ///
    /// Row locks are only taken on PostgreSQL; SQLite serializes writers on
    /// its own.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such account.
    pub async fn find_for_update(&self, id: AccountId) -> Result<Account, AccountError> {
        let mut query = accounts::Entity::find_by_id(id.into_inner());
        if self.conn.get_database_backend() == DbBackend::Postgres {
            query = query.lock_exclusive();
        }
        let model = query
            .one(self.conn)
            .await?
            .ok_or(AccountError::NotFound(id))?;
        to_account(model)
    }

    /// Lists a user's accounts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Account>, AccountError> {
        accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id.into_inner()))
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .all(self.conn)
            .await?
            .into_iter()
            .map(to_account)
            .collect()
    }

    /// Reads the current balance.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such account.
    pub async fn balance(&self, id: AccountId) -> Result<Decimal, AccountError> {
        let balance: Option<Decimal> = accounts::Entity::find_by_id(id.into_inner())
            .select_only()
            .column(accounts::Column::Balance)
            .into_tuple()
            .one(self.conn)
            .await?;
        balance.ok_or(AccountError::NotFound(id))
    }

    /// Adds `delta` to the balance in a single `UPDATE`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no row was updated.
    pub async fn adjust_balance(&self, id: AccountId, delta: Decimal) -> Result<(), AccountError> {
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::Balance,
                Expr::col(accounts::Column::Balance).add(delta),
            )
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .exec(self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AccountError::NotFound(id));
        }
        Ok(())
    }

    /// Updates name and description.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such account.
    pub async fn update_details(
        &self,
        id: AccountId,
        details: AccountDetails,
    ) -> Result<Account, AccountError> {
        let model = accounts::Entity::find_by_id(id.into_inner())
            .one(self.conn)
            .await?
            .ok_or(AccountError::NotFound(id))?;

        let mut active: accounts::ActiveModel = model.into();
        active.name = Set(details.name);
        active.description = Set(details.description);

        let model = active.update(self.conn).await?;
        to_account(model)
    }

    /// Deletes an account that no transaction references.
    ///
    /// Call it inside a database transaction after `find_for_update`, so no
    /// transaction can reference the account between the count and the delete.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `HasTransactions`.
    pub async fn delete(&self, id: AccountId) -> Result<(), AccountError> {
        let uuid = id.into_inner();
        let references = transactions::Entity::find()
            .filter(
                transactions::Column::SourceAccountId
                    .eq(uuid)
                    .or(transactions::Column::DestinationAccountId.eq(uuid)),
            )
            .count(self.conn)
            .await?;

        if references > 0 {
            return Err(AccountError::HasTransactions(id, references));
        }

        let result = accounts::Entity::delete_by_id(uuid).exec(self.conn).await?;
        if result.rows_affected == 0 {
            return Err(AccountError::NotFound(id));
        }
        Ok(())
    }
}

/// Converts a row into the ledger's account type.
fn to_account(model: accounts::Model) -> Result<Account, AccountError> {
    let account_type: AccountType = model
        .account_type
        .parse()
        .map_err(|_| AccountError::UnsupportedType(model.account_type.clone()))?;

    Ok(Account {
        id: AccountId::from_uuid(model.id),
        user_id: UserId::from_uuid(model.user_id),
        name: model.name,
        account_type,
        description: model.description,
        balance: model.balance,
        created_at: model.created_at,
    })
}
