use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    ids,
    patch::Patch,
    validate::{TASK_TITLE_MAX_CHARS, optional_text, required_text},
};
use crate::{
    entities::task,
    hierarchy::{CascadeSummary, EntityKind, Hierarchy, HierarchyError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub column_id: Uuid,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub column_id: Uuid,
}

impl CreateTask {
    pub fn from_title(column_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            start_date: None,
            due_date: None,
            column_id,
        }
    }
}

/// Fields left out of the body keep their value; `null` clears the nullable ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateTask {
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[ts(type = "string | null")]
    pub title: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[ts(type = "string | null")]
    pub description: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[ts(type = "string | null")]
    pub start_date: Patch<NaiveDate>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[ts(type = "string | null")]
    pub due_date: Patch<NaiveDate>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[ts(type = "string | null")]
    pub column_id: Patch<Uuid>,
}

impl Task {
    fn from_model(model: task::Model, column_id: Uuid) -> Self {
        Self {
            id: model.uuid,
            title: model.title,
            description: model.description,
            start_date: model.start_date,
            due_date: model.due_date,
            column_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let Some(model) = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
        else {
            return Ok(None);
        };
        let column_id = ids::column_uuid_by_id(db, model.column_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
        Ok(Some(Self::from_model(model, column_id)))
    }

    pub async fn find_by_column_id<C: ConnectionTrait>(
        db: &C,
        column_id: Uuid,
    ) -> Result<Vec<Self>, HierarchyError> {
        let models = Hierarchy::list_children_ordered(db, EntityKind::Column, column_id)
            .await?
            .into_tasks()
            .unwrap_or_default();
        Ok(models
            .into_iter()
            .map(|model| Self::from_model(model, column_id))
            .collect())
    }

    /// Tasks in every column of the board, in creation order.
    pub async fn find_by_board_id<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
    ) -> Result<Vec<Self>, HierarchyError> {
        let board_row_id = Hierarchy::require(db, EntityKind::Board, board_id).await?;
        let columns = Hierarchy::columns_of(db, board_row_id).await?;
        let column_uuid_map: HashMap<i64, Uuid> = columns
            .iter()
            .map(|column| (column.id, column.uuid))
            .collect();
        let column_row_ids: Vec<i64> = columns.iter().map(|column| column.id).collect();

        let models = Hierarchy::tasks_of(db, &column_row_ids).await?;
        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            let column_id = column_uuid_map
                .get(&model.column_id)
                .copied()
                .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
            tasks.push(Self::from_model(model, column_id));
        }
        Ok(tasks)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTask,
        task_id: Uuid,
    ) -> Result<Self, HierarchyError> {
        let title = required_text("title", &data.title, TASK_TITLE_MAX_CHARS)?;
        let description = optional_text(data.description.as_ref());
        let now = Utc::now();

        let model =
            Hierarchy::create_under(db, EntityKind::Column, data.column_id, |column_row_id| {
                task::ActiveModel {
                    uuid: Set(task_id),
                    title: Set(title),
                    description: Set(description),
                    start_date: Set(data.start_date),
                    due_date: Set(data.due_date),
                    column_id: Set(column_row_id),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(db)
            })
            .await?;
        Ok(Self::from_model(model, data.column_id))
    }

    /// Applies the fields present in `payload` and refreshes `updated_at`.
    ///
    /// Setting `column_id` moves the task; the target column must exist.
    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateTask,
    ) -> Result<Self, HierarchyError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(HierarchyError::not_found(EntityKind::Task, id))?;
        let current_column_row_id = record.column_id;

        let mut active: task::ActiveModel = record.into();
        if let Some(title) = payload.title.required("title")? {
            active.title = Set(required_text("title", title, TASK_TITLE_MAX_CHARS)?);
        }
        if let Some(description) = payload.description.nullable() {
            active.description = Set(optional_text(description));
        }
        if let Some(start_date) = payload.start_date.nullable() {
            active.start_date = Set(start_date.copied());
        }
        if let Some(due_date) = payload.due_date.nullable() {
            active.due_date = Set(due_date.copied());
        }

        let column_id = match payload.column_id.required("column_id")? {
            Some(target) => {
                let target_row_id = Hierarchy::require(db, EntityKind::Column, *target).await?;
                active.column_id = Set(target_row_id);
                *target
            }
            None => ids::column_uuid_by_id(db, current_column_row_id)
                .await?
                .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?,
        };
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await.map_err(HierarchyError::from_db)?;
        Ok(Self::from_model(updated, column_id))
    }

    pub async fn delete<C>(db: &C, id: Uuid) -> Result<CascadeSummary, HierarchyError>
    where
        C: ConnectionTrait + TransactionTrait<Transaction = DatabaseTransaction>,
    {
        Hierarchy::delete_cascade(db, EntityKind::Task, id).await
    }
}
