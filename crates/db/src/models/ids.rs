use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::{board, column, task, workspace};

pub async fn workspace_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    workspace::Entity::find()
        .select_only()
        .column(workspace::Column::Id)
        .filter(workspace::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn workspace_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    workspace::Entity::find()
        .select_only()
        .column(workspace::Column::Uuid)
        .filter(workspace::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn board_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    board::Entity::find()
        .select_only()
        .column(board::Column::Id)
        .filter(board::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn board_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    board::Entity::find()
        .select_only()
        .column(board::Column::Uuid)
        .filter(board::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn column_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    column::Entity::find()
        .select_only()
        .column(column::Column::Id)
        .filter(column::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn column_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    column::Entity::find()
        .select_only()
        .column(column::Column::Uuid)
        .filter(column::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn task_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    task::Entity::find()
        .select_only()
        .column(task::Column::Id)
        .filter(task::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}
