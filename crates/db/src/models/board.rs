use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait, TryIntoModel,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    ids,
    patch::Patch,
    validate::{TITLE_MAX_CHARS, optional_text, required_text},
};
use crate::{
    entities::board,
    hierarchy::{CascadeSummary, EntityKind, Hierarchy, HierarchyError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Board {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub workspace_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateBoard {
    pub title: String,
    pub description: Option<String>,
    pub workspace_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateBoard {
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[ts(type = "string | null")]
    pub title: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[ts(type = "string | null")]
    pub description: Patch<String>,
}

impl Board {
    pub(crate) fn from_model(model: board::Model, workspace_id: Uuid) -> Self {
        Self {
            id: model.uuid,
            title: model.title,
            description: model.description,
            workspace_id,
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let Some(model) = board::Entity::find()
            .filter(board::Column::Uuid.eq(id))
            .one(db)
            .await?
        else {
            return Ok(None);
        };
        let workspace_id = ids::workspace_uuid_by_id(db, model.workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;
        Ok(Some(Self::from_model(model, workspace_id)))
    }

    /// Boards of one workspace in creation order.
    pub async fn find_by_workspace_id<C: ConnectionTrait>(
        db: &C,
        workspace_id: Uuid,
    ) -> Result<Vec<Self>, HierarchyError> {
        let models = Hierarchy::list_children_ordered(db, EntityKind::Workspace, workspace_id)
            .await?
            .into_boards()
            .unwrap_or_default();
        Ok(models
            .into_iter()
            .map(|model| Self::from_model(model, workspace_id))
            .collect())
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateBoard,
        board_id: Uuid,
    ) -> Result<Self, HierarchyError> {
        let title = required_text("title", &data.title, TITLE_MAX_CHARS)?;
        let description = optional_text(data.description.as_ref());

        let model = Hierarchy::create_under(
            db,
            EntityKind::Workspace,
            data.workspace_id,
            |workspace_row_id| {
                board::ActiveModel {
                    uuid: Set(board_id),
                    title: Set(title),
                    description: Set(description),
                    workspace_id: Set(workspace_row_id),
                    ..Default::default()
                }
                .insert(db)
            },
        )
        .await?;
        Ok(Self::from_model(model, data.workspace_id))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateBoard,
    ) -> Result<Self, HierarchyError> {
        let record = board::Entity::find()
            .filter(board::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(HierarchyError::not_found(EntityKind::Board, id))?;
        let workspace_id = ids::workspace_uuid_by_id(db, record.workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

        let mut active: board::ActiveModel = record.into();
        if let Some(title) = payload.title.required("title")? {
            active.title = Set(required_text("title", title, TITLE_MAX_CHARS)?);
        }
        if let Some(description) = payload.description.nullable() {
            active.description = Set(optional_text(description));
        }

        let updated = if active.is_changed() {
            active.update(db).await.map_err(HierarchyError::from_db)?
        } else {
            active.try_into_model()?
        };
        Ok(Self::from_model(updated, workspace_id))
    }

    /// Deletes the board with its columns and their tasks.
    pub async fn delete<C>(db: &C, id: Uuid) -> Result<CascadeSummary, HierarchyError>
    where
        C: ConnectionTrait + TransactionTrait<Transaction = DatabaseTransaction>,
    {
        Hierarchy::delete_cascade(db, EntityKind::Board, id).await
    }
}
