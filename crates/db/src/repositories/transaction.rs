//! Transaction repository for ledger transaction database operations.
//!
//! Records only. Balance changes are applied by the store in the same
//! database transaction.

use chrono::Utc;
use costs_core::ledger::{NewTransaction, Period, Transaction, TransactionKind};
use costs_shared::types::{AccountId, TransactionId, UserId};
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbBackend, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};

use crate::entities::{accounts, transactions};

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    NotFound(TransactionId),

    /// Stored transaction kind is not one the ledger knows.
    #[error("Unknown transaction kind '{0}'")]
    UnknownKind(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Transaction repository.
#[derive(Debug, Clone, Copy)]
pub struct TransactionRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> TransactionRepository<'c, C> {
    /// Creates a repository over `conn`.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Inserts a new transaction record.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create(&self, input: NewTransaction) -> Result<Transaction, TransactionError> {
        let record = transactions::ActiveModel {
            id: Set(TransactionId::new().into_inner()),
            created_at: Set(Utc::now()),
            transaction_date: Set(input.transaction_date),
            kind: Set(input.kind.as_str().to_string()),
            source_account_id: Set(input.source.into_inner()),
            destination_account_id: Set(input.destination.into_inner()),
            amount: Set(input.amount),
            description: Set(input.description),
        };

        let model = record.insert(self.conn).await?;
        to_transaction(model)
    }

    /// Finds a transaction by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such transaction.
    pub async fn find(&self, id: TransactionId) -> Result<Transaction, TransactionError> {
        let model = transactions::Entity::find_by_id(id.into_inner())
            .one(self.conn)
            .await?
            .ok_or(TransactionError::NotFound(id))?;
        to_transaction(model)
    }

    /// Finds a transaction and locks its row until the surrounding database
    /// transaction ends.
    ///
    /// Row locks are only taken on PostgreSQL; SQLite serializes writers on
    /// its own.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such transaction.
    pub async fn find_for_update(
        &self,
        id: TransactionId,
    ) -> Result<Transaction, TransactionError> {
        let mut query = transactions::Entity::find_by_id(id.into_inner());
        if self.conn.get_database_backend() == DbBackend::Postgres {
            query = query.lock_exclusive();
        }
        let model = query
            .one(self.conn)
            .await?
            .ok_or(TransactionError::NotFound(id))?;
        to_transaction(model)
    }

    /// Overwrites accounts, amount, date and description. Kind and creation
    /// time are left as stored.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no row was updated.
    pub async fn update(&self, tx: &Transaction) -> Result<(), TransactionError> {
        let result = transactions::Entity::update_many()
            .set(transactions::ActiveModel {
                transaction_date: Set(tx.transaction_date),
                source_account_id: Set(tx.source.into_inner()),
                destination_account_id: Set(tx.destination.into_inner()),
                amount: Set(tx.amount),
                description: Set(tx.description.clone()),
                ..Default::default()
            })
            .filter(transactions::Column::Id.eq(tx.id.into_inner()))
            .exec(self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(TransactionError::NotFound(tx.id));
        }
        Ok(())
    }

    /// Deletes a transaction record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no row was deleted.
    pub async fn delete(&self, id: TransactionId) -> Result<(), TransactionError> {
        let result = transactions::Entity::delete_by_id(id.into_inner())
            .exec(self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(TransactionError::NotFound(id));
        }
        Ok(())
    }

    /// Transactions where the account is source or destination. The window,
    /// when given, applies to both sides.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_by_account(
        &self,
        account_id: AccountId,
        period: Option<&Period>,
    ) -> Result<Vec<Transaction>, TransactionError> {
        let uuid = account_id.into_inner();
        let touches_account = Condition::any()
            .add(transactions::Column::SourceAccountId.eq(uuid))
            .add(transactions::Column::DestinationAccountId.eq(uuid));

        self.list(transactions::Entity::find().filter(touches_account), period)
            .await
    }

    /// Transactions touching any account owned by the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_by_user(
        &self,
        user_id: UserId,
        period: Option<&Period>,
    ) -> Result<Vec<Transaction>, TransactionError> {
        let user_accounts = Query::select()
            .column(accounts::Column::Id)
            .from(accounts::Entity)
            .and_where(accounts::Column::UserId.eq(user_id.into_inner()))
            .to_owned();

        let touches_user = Condition::any()
            .add(transactions::Column::SourceAccountId.in_subquery(user_accounts.clone()))
            .add(transactions::Column::DestinationAccountId.in_subquery(user_accounts));

        self.list(transactions::Entity::find().filter(touches_user), period)
            .await
    }

    async fn list(
        &self,
        query: Select<transactions::Entity>,
        period: Option<&Period>,
    ) -> Result<Vec<Transaction>, TransactionError> {
        let mut query = query;
        if let Some(period) = period {
            query = query.filter(
                transactions::Column::TransactionDate.between(period.start(), period.end()),
            );
        }

        query
            .order_by_asc(transactions::Column::TransactionDate)
            .order_by_asc(transactions::Column::Id)
            .all(self.conn)
            .await?
            .into_iter()
            .map(to_transaction)
            .collect()
    }
}

/// Converts a row into the ledger's transaction type.
fn to_transaction(model: transactions::Model) -> Result<Transaction, TransactionError> {
    let kind: TransactionKind = model
        .kind
        .parse()
        .map_err(|_| TransactionError::UnknownKind(model.kind.clone()))?;

    Ok(Transaction {
        id: TransactionId::from_uuid(model.id),
        created_at: model.created_at,
        transaction_date: model.transaction_date,
        kind,
        source: AccountId::from_uuid(model.source_account_id),
        destination: AccountId::from_uuid(model.destination_account_id),
        amount: model.amount,
        description: model.description,
    })
}
