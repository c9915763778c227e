use axum::{
    Extension, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::task::{CreateTask, Task, UpdateTask};
use deployment::Deployment;
use serde::Deserialize;
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, extract::ApiJson, middleware::load_task_middleware};

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub board_id: Option<Uuid>,
}

/// Tasks across every column of `board_id`.
pub async fn get_tasks(
    State(deployment): State<DeploymentImpl>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let Query(query) = query?;
    let board_id = query
        .board_id
        .ok_or(ApiError::BadRequest("board_id is required".to_string()))?;

    let tasks = Task::find_by_board_id(&deployment.db().pool, board_id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn get_task(
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn create_task(
    State(deployment): State<DeploymentImpl>,
    ApiJson(payload): ApiJson<CreateTask>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Task>>), ApiError> {
    let id = Uuid::new_v4();
    let task = deployment
        .db()
        .transaction(move |tx| {
            let payload = payload.clone();
            Box::pin(async move { Task::create(tx, &payload, id).await })
        })
        .await?;

    tracing::debug!(task_id = %task.id, column_id = %task.column_id, "Created task");
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(task))))
}

pub async fn update_task(
    Extension(existing): Extension<Task>,
    State(deployment): State<DeploymentImpl>,
    ApiJson(payload): ApiJson<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let id = existing.id;
    let task = deployment
        .db()
        .transaction(move |tx| {
            let payload = payload.clone();
            Box::pin(async move { Task::update(tx, id, &payload).await })
        })
        .await?;

    if task.column_id != existing.column_id {
        tracing::debug!(
            task_id = %id,
            from = %existing.column_id,
            to = %task.column_id,
            "Moved task"
        );
    }
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    Extension(existing): Extension<Task>,
    State(deployment): State<DeploymentImpl>,
) -> Result<StatusCode, ApiError> {
    let id = existing.id;
    deployment
        .db()
        .transaction(move |tx| Box::pin(async move { Task::delete(tx, id).await }))
        .await?;

    tracing::info!(task_id = %id, "Deleted task");
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let task_id_router = Router::new()
        .route("/", get(get_task).patch(update_task).delete(delete_task))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_task_middleware::<DeploymentImpl>,
        ));

    let inner = Router::new()
        .route("/", get(get_tasks).post(create_task))
        .nest("/{task_id}", task_id_router);

    Router::new().nest("/tasks", inner)
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, response::IntoResponse};
    use chrono::NaiveDate;
    use db::{
        EntityKind, HierarchyError,
        models::{
            board::{Board, CreateBoard},
            column::{Column, CreateColumn},
            workspace::{CreateWorkspace, Workspace},
        },
    };

    use super::*;
    use crate::test_support::memory_deployment;

    async fn seed_columns(deployment: &DeploymentImpl) -> (Board, Column, Column) {
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
        let board = Board::create(
            pool,
            &CreateBoard {
                title: "Sprint".to_string(),
                description: None,
                workspace_id: workspace.id,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let mut columns = Vec::new();
        for title in ["Todo", "Done"] {
            let column = Column::create(
                pool,
                &CreateColumn {
                    title: title.to_string(),
                    order_index: None,
                    board_id: board.id,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
            columns.push(column);
        }
        let done = columns.pop().unwrap();
        let todo = columns.pop().unwrap();
        (board, todo, done)
    }

    async fn post_task(deployment: &DeploymentImpl, payload: CreateTask) -> Task {
        let (status, ResponseJson(body)) =
            create_task(State(deployment.clone()), ApiJson(payload))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        body.into_data().unwrap()
    }

    #[tokio::test]
    async fn create_task_with_dates() {
        let deployment = memory_deployment().await;
        let (_, todo, _) = seed_columns(&deployment).await;

        let payload: CreateTask = serde_json::from_value(serde_json::json!({
            "title": "Ship release",
            "description": "Cut the tag",
            "start_date": "2025-03-01",
            "due_date": "2025-03-15",
            "column_id": todo.id,
        }))
        .unwrap();
        let task = post_task(&deployment, payload).await;

        assert_eq!(task.title, "Ship release");
        assert_eq!(task.start_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2025, 3, 15));
        assert_eq!(task.column_id, todo.id);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[tokio::test]
    async fn create_task_in_missing_column_is_not_found() {
        let deployment = memory_deployment().await;

        let err = create_task(
            State(deployment),
            ApiJson(CreateTask::from_title(Uuid::new_v4(), "Lost")),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ApiError::Hierarchy(HierarchyError::NotFound {
                kind: EntityKind::Column,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn get_tasks_requires_board_id() {
        let deployment = memory_deployment().await;

        let err = get_tasks(
            State(deployment),
            Ok(Query(TaskQuery { board_id: None })),
        )
        .await
        .unwrap_err();

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "board_id is required");
    }

    #[tokio::test]
    async fn get_tasks_lists_every_column_of_the_board() {
        let deployment = memory_deployment().await;
        let (board, todo, done) = seed_columns(&deployment).await;
        post_task(&deployment, CreateTask::from_title(todo.id, "Plan")).await;
        post_task(&deployment, CreateTask::from_title(done.id, "Kickoff")).await;

        let ResponseJson(body) = get_tasks(
            State(deployment.clone()),
            Ok(Query(TaskQuery {
                board_id: Some(board.id),
            })),
        )
        .await
        .unwrap();
        let tasks = body.into_data().unwrap();
        assert_eq!(tasks.len(), 2);

        let err = get_tasks(
            State(deployment),
            Ok(Query(TaskQuery {
                board_id: Some(Uuid::new_v4()),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_task_moves_between_columns() {
        let deployment = memory_deployment().await;
        let (_, todo, done) = seed_columns(&deployment).await;
        let task = post_task(&deployment, CreateTask::from_title(todo.id, "Review")).await;

        let payload: UpdateTask =
            serde_json::from_value(serde_json::json!({ "column_id": done.id })).unwrap();
        let ResponseJson(body) =
            update_task(Extension(task.clone()), State(deployment.clone()), ApiJson(payload))
                .await
                .unwrap();
        let moved = body.into_data().unwrap();

        assert_eq!(moved.column_id, done.id);
        assert_eq!(moved.title, "Review");
        assert!(
            Task::find_by_column_id(&deployment.db().pool, todo.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn update_task_rejects_null_title() {
        let deployment = memory_deployment().await;
        let (_, todo, _) = seed_columns(&deployment).await;
        let task = post_task(&deployment, CreateTask::from_title(todo.id, "Review")).await;

        let payload: UpdateTask = serde_json::from_str(r#"{ "title": null }"#).unwrap();
        let err = update_task(Extension(task), State(deployment), ApiJson(payload))
            .await
            .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_task_returns_no_content() {
        let deployment = memory_deployment().await;
        let (_, todo, _) = seed_columns(&deployment).await;
        let task = post_task(&deployment, CreateTask::from_title(todo.id, "Review")).await;

        let status = delete_task(Extension(task.clone()), State(deployment.clone()))
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
