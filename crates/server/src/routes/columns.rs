use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    column::{Column, CreateColumn, UpdateColumn},
    task::Task,
};
use deployment::Deployment;
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl, error::ApiError, extract::ApiJson, middleware::load_column_middleware,
};

pub async fn get_column(
    Extension(column): Extension<Column>,
) -> Result<ResponseJson<ApiResponse<Column>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(column)))
}

pub async fn get_column_tasks(
    Extension(column): Extension<Column>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let tasks = Task::find_by_column_id(&deployment.db().pool, column.id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn create_column(
    State(deployment): State<DeploymentImpl>,
    ApiJson(payload): ApiJson<CreateColumn>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Column>>), ApiError> {
    let id = Uuid::new_v4();
    let column = deployment
        .db()
        .transaction(move |tx| {
            let payload = payload.clone();
            Box::pin(async move { Column::create(tx, &payload, id).await })
        })
        .await?;

    tracing::debug!(
        column_id = %column.id,
        board_id = %column.board_id,
        order_index = column.order_index,
        "Created column"
    );
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(column)),
    ))
}

pub async fn update_column(
    Extension(existing): Extension<Column>,
    State(deployment): State<DeploymentImpl>,
    ApiJson(payload): ApiJson<UpdateColumn>,
) -> Result<ResponseJson<ApiResponse<Column>>, ApiError> {
    let id = existing.id;
    let column = deployment
        .db()
        .transaction(move |tx| {
            let payload = payload.clone();
            Box::pin(async move { Column::update(tx, id, &payload).await })
        })
        .await?;

    Ok(ResponseJson(ApiResponse::success(column)))
}

pub async fn delete_column(
    Extension(existing): Extension<Column>,
    State(deployment): State<DeploymentImpl>,
) -> Result<StatusCode, ApiError> {
    let id = existing.id;
    let summary = deployment
        .db()
        .transaction(move |tx| Box::pin(async move { Column::delete(tx, id).await }))
        .await?;

    tracing::info!(column_id = %id, tasks = summary.tasks, "Deleted column");
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let column_id_router = Router::new()
        .route(
            "/",
            get(get_column).patch(update_column).delete(delete_column),
        )
        .route("/tasks", get(get_column_tasks))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_column_middleware::<DeploymentImpl>,
        ));

    let inner = Router::new()
        .route("/", post(create_column))
        .nest("/{column_id}", column_id_router);

    Router::new().nest("/columns", inner)
}

#[cfg(test)]
mod tests {
    use db::{
        HierarchyError,
        models::{
            board::{Board, CreateBoard},
            task::CreateTask,
            workspace::{CreateWorkspace, Workspace},
        },
    };

    use super::*;
    use crate::test_support::memory_deployment;

    async fn seed_board(deployment: &DeploymentImpl) -> Board {
        let pool = &deployment.db().pool;
        let workspace = Workspace::create(
            pool,
            &CreateWorkspace {
                title: "Work".to_string(),
                icon: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        Board::create(
            pool,
            &CreateBoard {
                title: "Sprint".to_string(),
                description: None,
                workspace_id: workspace.id,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    async fn post_column(
        deployment: &DeploymentImpl,
        board_id: Uuid,
        title: &str,
        order_index: Option<i32>,
    ) -> Column {
        let (status, ResponseJson(body)) = create_column(
            State(deployment.clone()),
            ApiJson(CreateColumn {
                title: title.to_string(),
                order_index,
                board_id,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        body.into_data().unwrap()
    }

    #[tokio::test]
    async fn create_column_without_index_appends() {
        let deployment = memory_deployment().await;
        let board = seed_board(&deployment).await;

        let first = post_column(&deployment, board.id, "Todo", Some(3)).await;
        let second = post_column(&deployment, board.id, "Doing", None).await;

        assert_eq!(first.order_index, 3);
        assert_eq!(second.order_index, 4);
        assert_eq!(second.board_id, board.id);
    }

    #[tokio::test]
    async fn update_column_rejects_negative_index() {
        let deployment = memory_deployment().await;
        let board = seed_board(&deployment).await;
        let column = post_column(&deployment, board.id, "Todo", None).await;

        let payload: UpdateColumn = serde_json::from_str(r#"{ "order_index": -1 }"#).unwrap();
        let err = update_column(Extension(column.clone()), State(deployment.clone()), ApiJson(payload))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Hierarchy(HierarchyError::Validation {
                field: "order_index",
                ..
            })
        ));

        let stored = Column::find_by_id(&deployment.db().pool, column.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.order_index, 0);
    }

    #[tokio::test]
    async fn delete_column_removes_its_tasks() {
        let deployment = memory_deployment().await;
        let board = seed_board(&deployment).await;
        let column = post_column(&deployment, board.id, "Todo", None).await;
        let task = Task::create(
            &deployment.db().pool,
            &CreateTask::from_title(column.id, "Write notes"),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let ResponseJson(body) =
            get_column_tasks(Extension(column.clone()), State(deployment.clone()))
                .await
                .unwrap();
        assert_eq!(body.into_data().unwrap().len(), 1);

        let status = delete_column(Extension(column), State(deployment.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(
            Task::find_by_id(&deployment.db().pool, task.id)
                .await
                .unwrap()
                .is_none()
        );
    }
}
