use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait, TryIntoModel,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    board::Board,
    patch::Patch,
    validate::{ICON_MAX_CHARS, TITLE_MAX_CHARS, required_text},
};
use crate::{
    entities::{board, workspace},
    hierarchy::{CascadeSummary, EntityKind, Hierarchy, HierarchyError},
};

pub const DEFAULT_WORKSPACE_ICON: &str = "💼";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Workspace {
    pub id: Uuid,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct WorkspaceWithBoards {
    #[serde(flatten)]
    #[ts(flatten)]
    pub workspace: Workspace,
    pub boards: Vec<Board>,
}

impl std::ops::Deref for WorkspaceWithBoards {
    type Target = Workspace;
    fn deref(&self) -> &Self::Target {
        &self.workspace
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateWorkspace {
    pub title: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateWorkspace {
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[ts(type = "string | null")]
    pub title: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_missing")]
    #[ts(type = "string | null")]
    pub icon: Patch<String>,
}

impl Workspace {
    fn from_model(model: workspace::Model) -> Self {
        Self {
            id: model.uuid,
            title: model.title,
            icon: model.icon,
        }
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = workspace::Entity::find()
            .order_by_asc(workspace::Column::Id)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    /// Every workspace with its boards nested, in creation order.
    pub async fn find_all_with_boards<C: ConnectionTrait>(
        db: &C,
    ) -> Result<Vec<WorkspaceWithBoards>, DbErr> {
        let workspaces = workspace::Entity::find()
            .order_by_asc(workspace::Column::Id)
            .all(db)
            .await?;
        let boards = board::Entity::find()
            .order_by_asc(board::Column::Id)
            .all(db)
            .await?;

        let workspace_uuid_map: HashMap<i64, Uuid> = workspaces
            .iter()
            .map(|model| (model.id, model.uuid))
            .collect();
        let mut boards_by_workspace: HashMap<i64, Vec<Board>> = HashMap::new();
        for model in boards {
            let Some(workspace_uuid) = workspace_uuid_map.get(&model.workspace_id).copied() else {
                continue;
            };
            boards_by_workspace
                .entry(model.workspace_id)
                .or_default()
                .push(Board::from_model(model, workspace_uuid));
        }

        Ok(workspaces
            .into_iter()
            .map(|model| {
                let boards = boards_by_workspace.remove(&model.id).unwrap_or_default();
                WorkspaceWithBoards {
                    workspace: Self::from_model(model),
                    boards,
                }
            })
            .collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = workspace::Entity::find()
            .filter(workspace::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateWorkspace,
        workspace_id: Uuid,
    ) -> Result<Self, HierarchyError> {
        let title = required_text("title", &data.title, TITLE_MAX_CHARS)?;
        let icon = match data.icon.as_deref() {
            Some(icon) => required_text("icon", icon, ICON_MAX_CHARS)?,
            None => DEFAULT_WORKSPACE_ICON.to_string(),
        };

        let active = workspace::ActiveModel {
            uuid: Set(workspace_id),
            title: Set(title),
            icon: Set(icon),
            ..Default::default()
        };
        let model = active.insert(db).await.map_err(HierarchyError::from_db)?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateWorkspace,
    ) -> Result<Self, HierarchyError> {
        let record = workspace::Entity::find()
            .filter(workspace::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(HierarchyError::not_found(EntityKind::Workspace, id))?;

        let mut active: workspace::ActiveModel = record.into();
        if let Some(title) = payload.title.required("title")? {
            active.title = Set(required_text("title", title, TITLE_MAX_CHARS)?);
        }
        if let Some(icon) = payload.icon.required("icon")? {
            active.icon = Set(required_text("icon", icon, ICON_MAX_CHARS)?);
        }

        let updated = if active.is_changed() {
            active.update(db).await.map_err(HierarchyError::from_db)?
        } else {
            active.try_into_model()?
        };
        Ok(Self::from_model(updated))
    }

    /// Deletes the workspace and every board, column and task beneath it.
    pub async fn delete<C>(db: &C, id: Uuid) -> Result<CascadeSummary, HierarchyError>
    where
        C: ConnectionTrait + TransactionTrait<Transaction = DatabaseTransaction>,
    {
        Hierarchy::delete_cascade(db, EntityKind::Workspace, id).await
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{Database, DatabaseConnection};
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::board::CreateBoard;

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    fn create_payload(title: &str) -> CreateWorkspace {
        CreateWorkspace {
            title: title.to_string(),
            icon: None,
        }
    }

    #[tokio::test]
    async fn create_defaults_icon_and_trims_title() {
        let db = setup_db().await;
        let id = Uuid::new_v4();

        let workspace = Workspace::create(&db, &create_payload("  Personal "), id)
            .await
            .unwrap();
        assert_eq!(workspace.id, id);
        assert_eq!(workspace.title, "Personal");
        assert_eq!(workspace.icon, DEFAULT_WORKSPACE_ICON);
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let db = setup_db().await;

        let err = Workspace::create(&db, &create_payload("   "), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, HierarchyError::Validation { field: "title", .. }));
        assert!(Workspace::find_all(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_only_touches_present_fields() {
        let db = setup_db().await;
        let id = Uuid::new_v4();
        Workspace::create(
            &db,
            &CreateWorkspace {
                title: "Personal".to_string(),
                icon: Some("🏠".to_string()),
            },
            id,
        )
        .await
        .unwrap();

        let updated = Workspace::update(
            &db,
            id,
            &UpdateWorkspace {
                title: Patch::Value("Home".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Home");
        assert_eq!(updated.icon, "🏠");

        let err = Workspace::update(
            &db,
            id,
            &UpdateWorkspace {
                icon: Patch::Null,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HierarchyError::Validation { field: "icon", .. }));
    }

    #[tokio::test]
    async fn missing_workspace_is_not_found() {
        let db = setup_db().await;
        let missing = Uuid::new_v4();

        assert!(Workspace::find_by_id(&db, missing).await.unwrap().is_none());

        let err = Workspace::update(&db, missing, &UpdateWorkspace::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HierarchyError::NotFound { kind: EntityKind::Workspace, id } if id == missing
        ));

        let err = Workspace::delete(&db, missing).await.unwrap_err();
        assert!(matches!(
            err,
            HierarchyError::NotFound { kind: EntityKind::Workspace, .. }
        ));
    }

    #[tokio::test]
    async fn find_all_with_boards_nests_boards_under_owner() {
        let db = setup_db().await;
        let personal = Workspace::create(&db, &create_payload("Personal"), Uuid::new_v4())
            .await
            .unwrap();
        let work = Workspace::create(&db, &create_payload("Work"), Uuid::new_v4())
            .await
            .unwrap();
        for title in ["Launch", "Errands"] {
            Board::create(
                &db,
                &CreateBoard {
                    title: title.to_string(),
                    description: None,
                    workspace_id: personal.id,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
        }

        let tree = Workspace::find_all_with_boards(&db).await.unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, personal.id);
        let titles: Vec<_> = tree[0].boards.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Launch", "Errands"]);
        assert!(tree[0].boards.iter().all(|b| b.workspace_id == personal.id));
        assert_eq!(tree[1].id, work.id);
        assert!(tree[1].boards.is_empty());
    }
}
