//! Structural authority over the workspace → board → column → task tree.
//!
//! Every insert under a parent, every subtree removal and every ordered child
//! listing goes through [`Hierarchy`]. The schema only guarantees that no row
//! points at a missing parent; removing descendants is done here, explicitly,
//! inside a single transaction.

use std::future::Future;

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseTransaction, DbBackend, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, SqlErr, TransactionTrait,
    sea_query::SelectStatement,
};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{board, column, task, workspace},
    models::ids,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, Display)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Workspace,
    Board,
    Column,
    Task,
}

impl EntityKind {
    pub fn child(self) -> Option<EntityKind> {
        match self {
            EntityKind::Workspace => Some(EntityKind::Board),
            EntityKind::Board => Some(EntityKind::Column),
            EntityKind::Column => Some(EntityKind::Task),
            EntityKind::Task => None,
        }
    }

    fn childless(self) -> HierarchyError {
        HierarchyError::validation("parent_kind", format!("{self} has no children"))
    }
}

#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: Uuid },
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl HierarchyError {
    pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
        HierarchyError::NotFound { kind, id }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        HierarchyError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Splits integrity failures reported by the store from other database errors.
    pub fn from_db(err: DbErr) -> Self {
        match integrity_violation(&err) {
            Some(Integrity::ForeignKey(msg)) | Some(Integrity::Unique(msg)) => {
                HierarchyError::ConstraintViolation(msg)
            }
            None => HierarchyError::Database(err),
        }
    }
}

enum Integrity {
    ForeignKey(String),
    Unique(String),
}

// A RESTRICT refusal on SQLite carries the extended code 1811, which
// `sql_err()` does not classify, so the rendered message is checked as well.
fn integrity_violation(err: &DbErr) -> Option<Integrity> {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(msg)) => return Some(Integrity::ForeignKey(msg)),
        Some(SqlErr::UniqueConstraintViolation(msg)) => return Some(Integrity::Unique(msg)),
        _ => {}
    }
    let message = err.to_string();
    if message.contains("FOREIGN KEY constraint failed")
        || message.contains("violates foreign key constraint")
        || message.contains("(code: 787)")
        || message.contains("(code: 1811)")
    {
        Some(Integrity::ForeignKey(message))
    } else if message.contains("UNIQUE constraint failed")
        || message.contains("duplicate key value violates unique constraint")
    {
        Some(Integrity::Unique(message))
    } else {
        None
    }
}

/// Rows removed by one [`Hierarchy::delete_cascade`] call, per level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeSummary {
    pub workspaces: u64,
    pub boards: u64,
    pub columns: u64,
    pub tasks: u64,
}

impl CascadeSummary {
    pub fn total(&self) -> u64 {
        self.workspaces + self.boards + self.columns + self.tasks
    }
}

/// Direct children of one parent, as returned by [`Hierarchy::list_children_ordered`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Children {
    Boards(Vec<board::Model>),
    Columns(Vec<column::Model>),
    Tasks(Vec<task::Model>),
}

impl Children {
    pub fn len(&self) -> usize {
        match self {
            Children::Boards(rows) => rows.len(),
            Children::Columns(rows) => rows.len(),
            Children::Tasks(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Children::Boards(_) => EntityKind::Board,
            Children::Columns(_) => EntityKind::Column,
            Children::Tasks(_) => EntityKind::Task,
        }
    }

    pub fn uuids(&self) -> Vec<Uuid> {
        match self {
            Children::Boards(rows) => rows.iter().map(|row| row.uuid).collect(),
            Children::Columns(rows) => rows.iter().map(|row| row.uuid).collect(),
            Children::Tasks(rows) => rows.iter().map(|row| row.uuid).collect(),
        }
    }

    pub fn into_boards(self) -> Option<Vec<board::Model>> {
        match self {
            Children::Boards(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn into_columns(self) -> Option<Vec<column::Model>> {
        match self {
            Children::Columns(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn into_tasks(self) -> Option<Vec<task::Model>> {
        match self {
            Children::Tasks(rows) => Some(rows),
            _ => None,
        }
    }
}

pub struct Hierarchy;

impl Hierarchy {
    /// Resolves the row id behind a public id, or fails with `NotFound(kind, id)`.
    pub async fn require<C: ConnectionTrait>(
        db: &C,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<i64, HierarchyError> {
        let row_id = match kind {
            EntityKind::Workspace => ids::workspace_id_by_uuid(db, id).await?,
            EntityKind::Board => ids::board_id_by_uuid(db, id).await?,
            EntityKind::Column => ids::column_id_by_uuid(db, id).await?,
            EntityKind::Task => ids::task_id_by_uuid(db, id).await?,
        };
        row_id.ok_or(HierarchyError::not_found(kind, id))
    }

    /// Inserts a child under `parent_id`.
    ///
    /// `insert` receives the parent's row id. A parent that is missing, or
    /// that disappears between the lookup and the insert, is reported as
    /// `NotFound(parent_kind, parent_id)`.
    pub async fn create_under<C, T, F, Fut>(
        db: &C,
        parent_kind: EntityKind,
        parent_id: Uuid,
        insert: F,
    ) -> Result<T, HierarchyError>
    where
        C: ConnectionTrait,
        F: FnOnce(i64) -> Fut,
        Fut: Future<Output = Result<T, DbErr>>,
    {
        if parent_kind.child().is_none() {
            return Err(parent_kind.childless());
        }
        let parent_row_id = Self::require(db, parent_kind, parent_id).await?;
        match insert(parent_row_id).await {
            Ok(value) => Ok(value),
            Err(err) => match integrity_violation(&err) {
                Some(Integrity::ForeignKey(_)) => {
                    Err(HierarchyError::not_found(parent_kind, parent_id))
                }
                _ => Err(HierarchyError::from_db(err)),
            },
        }
    }

    /// Lists the direct children of a parent.
    ///
    /// Columns come back in ascending `order_index`, ties broken by creation
    /// order. Boards and tasks come back in creation order.
    pub async fn list_children_ordered<C: ConnectionTrait>(
        db: &C,
        parent_kind: EntityKind,
        parent_id: Uuid,
    ) -> Result<Children, HierarchyError> {
        let child_kind = parent_kind.child().ok_or_else(|| parent_kind.childless())?;
        let parent_row_id = Self::require(db, parent_kind, parent_id).await?;
        let children = match child_kind {
            EntityKind::Board => Children::Boards(Self::boards_of(db, parent_row_id).await?),
            EntityKind::Column => Children::Columns(Self::columns_of(db, parent_row_id).await?),
            EntityKind::Task => Children::Tasks(Self::tasks_of(db, &[parent_row_id]).await?),
            EntityKind::Workspace => return Err(parent_kind.childless()),
        };
        Ok(children)
    }

    async fn boards_of<C: ConnectionTrait>(
        db: &C,
        workspace_row_id: i64,
    ) -> Result<Vec<board::Model>, DbErr> {
        board::Entity::find()
            .filter(board::Column::WorkspaceId.eq(workspace_row_id))
            .order_by_asc(board::Column::Id)
            .all(db)
            .await
    }

    pub(crate) async fn columns_of<C: ConnectionTrait>(
        db: &C,
        board_row_id: i64,
    ) -> Result<Vec<column::Model>, DbErr> {
        column::Entity::find()
            .filter(column::Column::BoardId.eq(board_row_id))
            .order_by_asc(column::Column::OrderIndex)
            .order_by_asc(column::Column::Id)
            .all(db)
            .await
    }

    pub(crate) async fn tasks_of<C: ConnectionTrait>(
        db: &C,
        column_row_ids: &[i64],
    ) -> Result<Vec<task::Model>, DbErr> {
        if column_row_ids.is_empty() {
            return Ok(Vec::new());
        }
        task::Entity::find()
            .filter(task::Column::ColumnId.is_in(column_row_ids.to_vec()))
            .order_by_asc(task::Column::Id)
            .all(db)
            .await
    }

    /// Deletes an entity together with its whole subtree.
    ///
    /// Children go before parents and everything runs in one transaction
    /// (a savepoint when `db` is already a transaction), so readers observe
    /// either the full subtree or none of it.
    pub async fn delete_cascade<C>(
        db: &C,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<CascadeSummary, HierarchyError>
    where
        C: ConnectionTrait + TransactionTrait<Transaction = DatabaseTransaction>,
    {
        let tx = db.begin().await?;
        match Self::delete_subtree(&tx, kind, id).await {
            Ok(summary) => {
                tx.commit().await?;
                tracing::info!(
                    kind = %kind,
                    id = %id,
                    boards = summary.boards,
                    columns = summary.columns,
                    tasks = summary.tasks,
                    "Cascade delete completed"
                );
                Ok(summary)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        kind = %kind,
                        id = %id,
                        error = %rollback_err,
                        "Failed to roll back cascade delete"
                    );
                }
                Err(err)
            }
        }
    }

    async fn delete_subtree(
        tx: &DatabaseTransaction,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<CascadeSummary, HierarchyError> {
        let row_id = Self::require(tx, kind, id).await?;
        Self::lock_subtree(tx, kind, row_id).await?;
        Self::delete_rows(tx, kind, row_id).await
    }

    /// Takes row locks on the root and every interior row of the subtree,
    /// top down, so a concurrent insert under any of them waits for this
    /// transaction and then fails on the vanished parent.
    ///
    /// SQLite serializes writers and has no row locks, so this is Postgres only.
    async fn lock_subtree<C: ConnectionTrait>(
        db: &C,
        kind: EntityKind,
        row_id: i64,
    ) -> Result<(), DbErr> {
        if db.get_database_backend() != DbBackend::Postgres {
            return Ok(());
        }
        match kind {
            EntityKind::Workspace => {
                workspace::Entity::find_by_id(row_id)
                    .lock_exclusive()
                    .one(db)
                    .await?;
                board::Entity::find()
                    .filter(board::Column::WorkspaceId.eq(row_id))
                    .lock_exclusive()
                    .all(db)
                    .await?;
                column::Entity::find()
                    .filter(column::Column::BoardId.in_subquery(Self::board_ids_in(row_id)))
                    .lock_exclusive()
                    .all(db)
                    .await?;
            }
            EntityKind::Board => {
                board::Entity::find_by_id(row_id)
                    .lock_exclusive()
                    .one(db)
                    .await?;
                column::Entity::find()
                    .filter(column::Column::BoardId.eq(row_id))
                    .lock_exclusive()
                    .all(db)
                    .await?;
            }
            EntityKind::Column => {
                column::Entity::find_by_id(row_id)
                    .lock_exclusive()
                    .one(db)
                    .await?;
            }
            EntityKind::Task => {}
        }
        Ok(())
    }

    /// Removes the subtree level by level, selecting each level by its
    /// parent key so rows added after the lookup are removed too.
    pub(crate) async fn delete_rows<C: ConnectionTrait>(
        db: &C,
        kind: EntityKind,
        row_id: i64,
    ) -> Result<CascadeSummary, HierarchyError> {
        let (tasks, columns, boards) = match kind {
            EntityKind::Workspace => (
                Some(task::Column::ColumnId.in_subquery(Self::column_ids_in_workspace(row_id))),
                Some(column::Column::BoardId.in_subquery(Self::board_ids_in(row_id))),
                Some(board::Column::WorkspaceId.eq(row_id)),
            ),
            EntityKind::Board => (
                Some(task::Column::ColumnId.in_subquery(Self::column_ids_in_board(row_id))),
                Some(column::Column::BoardId.eq(row_id)),
                Some(board::Column::Id.eq(row_id)),
            ),
            EntityKind::Column => (
                Some(task::Column::ColumnId.eq(row_id)),
                Some(column::Column::Id.eq(row_id)),
                None,
            ),
            EntityKind::Task => (Some(task::Column::Id.eq(row_id)), None, None),
        };

        let mut summary = CascadeSummary::default();

        if let Some(scope) = tasks {
            summary.tasks = task::Entity::delete_many()
                .filter(scope)
                .exec(db)
                .await
                .map_err(HierarchyError::from_db)?
                .rows_affected;
        }

        if let Some(scope) = columns {
            summary.columns = column::Entity::delete_many()
                .filter(scope)
                .exec(db)
                .await
                .map_err(HierarchyError::from_db)?
                .rows_affected;
        }

        if let Some(scope) = boards {
            summary.boards = board::Entity::delete_many()
                .filter(scope)
                .exec(db)
                .await
                .map_err(HierarchyError::from_db)?
                .rows_affected;
        }

        if kind == EntityKind::Workspace {
            summary.workspaces = workspace::Entity::delete_by_id(row_id)
                .exec(db)
                .await
                .map_err(HierarchyError::from_db)?
                .rows_affected;
        }

        Ok(summary)
    }

    fn board_ids_in(workspace_row_id: i64) -> SelectStatement {
        board::Entity::find()
            .select_only()
            .column(board::Column::Id)
            .filter(board::Column::WorkspaceId.eq(workspace_row_id))
            .into_query()
    }

    fn column_ids_in_board(board_row_id: i64) -> SelectStatement {
        column::Entity::find()
            .select_only()
            .column(column::Column::Id)
            .filter(column::Column::BoardId.eq(board_row_id))
            .into_query()
    }

    fn column_ids_in_workspace(workspace_row_id: i64) -> SelectStatement {
        column::Entity::find()
            .select_only()
            .column(column::Column::Id)
            .filter(column::Column::BoardId.in_subquery(Self::board_ids_in(workspace_row_id)))
            .into_query()
    }
}
