use std::{future::Future, pin::Pin, time::Duration};

use db_migration::Migrator;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction,
    TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use utils_core::assets::asset_dir;

pub mod entities;
pub mod hierarchy;
pub mod models;
mod retry;

pub use hierarchy::{CascadeSummary, Children, EntityKind, Hierarchy, HierarchyError};
pub use sea_orm::DbErr;

use crate::retry::retry_on_sqlite_busy;

pub type DbPool = DatabaseConnection;

/// Future returned by a unit of work passed to [`DBService::transaction`].
pub type TxFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, HierarchyError>> + Send + 'c>>;

#[derive(Clone)]
pub struct DBService {
    pub pool: DbPool,
}

impl DBService {
    /// Connects to `database_url`, or to the SQLite file in the asset
    /// directory when none is configured, and brings the schema up to date.
    pub async fn new(database_url: Option<&str>) -> Result<DBService, DbErr> {
        let database_url = match database_url {
            Some(url) => url.to_string(),
            None => Self::default_sqlite_url(),
        };
        Self::connect(&database_url).await
    }

    pub async fn connect(database_url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(database_url.to_string());
        options
            .connect_timeout(Duration::from_secs(30))
            .acquire_timeout(Duration::from_secs(30));

        let pool = Database::connect(options).await?;
        Migrator::up(&pool, None).await?;
        tracing::debug!(backend = ?pool.get_database_backend(), "Database ready");
        Ok(DBService { pool })
    }

    pub fn default_sqlite_url() -> String {
        format!(
            "sqlite://{}?mode=rwc",
            asset_dir().join("db.sqlite").to_string_lossy()
        )
    }

    /// Runs `op` inside one transaction.
    ///
    /// Commits when `op` succeeds and rolls back otherwise. The whole unit is
    /// retried when SQLite reports the database as busy, so `op` may run more
    /// than once and must not have effects outside the transaction.
    pub async fn transaction<T, F>(&self, op: F) -> Result<T, HierarchyError>
    where
        T: Send,
        F: for<'c> Fn(&'c DatabaseTransaction) -> TxFuture<'c, T> + Send + Sync,
    {
        let pool = &self.pool;
        let op = &op;
        retry_on_sqlite_busy(move || async move {
            let tx = pool.begin().await?;
            match op(&tx).await {
                Ok(value) => {
                    tx.commit().await?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        tracing::warn!(error = %rollback_err, "Failed to roll back transaction");
                    }
                    Err(err)
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::workspace::{CreateWorkspace, Workspace};

    #[tokio::test]
    async fn transaction_rolls_back_when_op_fails() {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        let id = Uuid::new_v4();

        let result: Result<(), HierarchyError> = db
            .transaction(move |tx| {
                Box::pin(async move {
                    let payload = CreateWorkspace {
                        title: "Scratch".to_string(),
                        icon: None,
                    };
                    Workspace::create(tx, &payload, id).await?;
                    Err(HierarchyError::validation("title", "rejected after insert"))
                })
            })
            .await;

        assert!(matches!(result, Err(HierarchyError::Validation { .. })));
        assert!(Workspace::find_by_id(&db.pool, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transaction_commits_on_success() {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        let id = Uuid::new_v4();

        let created = db
            .transaction(move |tx| {
                Box::pin(async move {
                    let payload = CreateWorkspace {
                        title: "Work".to_string(),
                        icon: Some("🛠".to_string()),
                    };
                    Workspace::create(tx, &payload, id).await
                })
            })
            .await
            .unwrap();

        assert_eq!(created.id, id);
        let stored = Workspace::find_by_id(&db.pool, id).await.unwrap().unwrap();
        assert_eq!(stored.icon, "🛠");
    }
}
