use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, TryIntoModel,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    ids,
    patch::Patch,
    validate::{self, TITLE_MAX_CHARS, required_text},
};
use crate::{
    entities::column,
    hierarchy::{CascadeSummary, EntityKind, Hierarchy, HierarchyError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Column {
    pub id: Uuid,
    pub title: String,
    pub order_index: i32,
    pub board_id: Uuid,
}

/// `order_index` may be omitted, in which case the column goes last.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateColumn {
    pub title: String,
    pub order_index: Option<i32>,
    pub board_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateColumn {
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[ts(type = "string | null")]
    pub title: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[ts(type = "number | null")]
    pub order_index: Patch<i32>,
}

impl Column {
    fn from_model(model: column::Model, board_id: Uuid) -> Self {
        Self {
            id: model.uuid,
            title: model.title,
            order_index: model.order_index,
            board_id,
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let Some(model) = column::Entity::find()
            .filter(column::Column::Uuid.eq(id))
            .one(db)
            .await?
        else {
            return Ok(None);
        };
        let board_id = ids::board_uuid_by_id(db, model.board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        Ok(Some(Self::from_model(model, board_id)))
    }

    /// Columns of one board, ascending `order_index`, ties in creation order.
    pub async fn find_by_board_id<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
    ) -> Result<Vec<Self>, HierarchyError> {
        let models = Hierarchy::list_children_ordered(db, EntityKind::Board, board_id)
            .await?
            .into_columns()
            .unwrap_or_default();
        Ok(models
            .into_iter()
            .map(|model| Self::from_model(model, board_id))
            .collect())
    }

    async fn next_order_index<C: ConnectionTrait>(db: &C, board_row_id: i64) -> Result<i32, DbErr> {
        let max: Option<i32> = column::Entity::find()
            .select_only()
            .column(column::Column::OrderIndex)
            .filter(column::Column::BoardId.eq(board_row_id))
            .order_by_desc(column::Column::OrderIndex)
            .into_tuple()
            .one(db)
            .await?;
        Ok(max.map_or(0, |max| max.saturating_add(1)))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateColumn,
        column_id: Uuid,
    ) -> Result<Self, HierarchyError> {
        let title = required_text("title", &data.title, TITLE_MAX_CHARS)?;
        let order_index = data.order_index.map(validate::order_index).transpose()?;

        let model = Hierarchy::create_under(db, EntityKind::Board, data.board_id, |board_row_id| {
            async move {
                let order_index = match order_index {
                    Some(order_index) => order_index,
                    None => Self::next_order_index(db, board_row_id).await?,
                };
                column::ActiveModel {
                    uuid: Set(column_id),
                    title: Set(title),
                    order_index: Set(order_index),
                    board_id: Set(board_row_id),
                    ..Default::default()
                }
                .insert(db)
                .await
            }
        })
        .await?;
        Ok(Self::from_model(model, data.board_id))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateColumn,
    ) -> Result<Self, HierarchyError> {
        let record = column::Entity::find()
            .filter(column::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(HierarchyError::not_found(EntityKind::Column, id))?;
        let board_id = ids::board_uuid_by_id(db, record.board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;

        let mut active: column::ActiveModel = record.into();
        if let Some(title) = payload.title.required("title")? {
            active.title = Set(required_text("title", title, TITLE_MAX_CHARS)?);
        }
        if let Some(order_index) = payload.order_index.required("order_index")? {
            active.order_index = Set(validate::order_index(*order_index)?);
        }

        let updated = if active.is_changed() {
            active.update(db).await.map_err(HierarchyError::from_db)?
        } else {
            active.try_into_model()?
        };
        Ok(Self::from_model(updated, board_id))
    }

    /// Deletes the column and its tasks.
    pub async fn delete<C>(db: &C, id: Uuid) -> Result<CascadeSummary, HierarchyError>
    where
        C: ConnectionTrait + TransactionTrait<Transaction = DatabaseTransaction>,
    {
        Hierarchy::delete_cascade(db, EntityKind::Column, id).await
    }
}
