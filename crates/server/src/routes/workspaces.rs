use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    board::Board,
    workspace::{CreateWorkspace, UpdateWorkspace, Workspace, WorkspaceWithBoards},
};
use deployment::Deployment;
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl, error::ApiError, extract::ApiJson, middleware::load_workspace_middleware,
};

pub async fn get_workspaces(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<WorkspaceWithBoards>>>, ApiError> {
    let workspaces = Workspace::find_all_with_boards(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(workspaces)))
}

pub async fn get_workspace(
    Extension(workspace): Extension<Workspace>,
) -> Result<ResponseJson<ApiResponse<Workspace>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(workspace)))
}

pub async fn get_workspace_boards(
    Extension(workspace): Extension<Workspace>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Board>>>, ApiError> {
    let boards = Board::find_by_workspace_id(&deployment.db().pool, workspace.id).await?;
    Ok(ResponseJson(ApiResponse::success(boards)))
}

pub async fn create_workspace(
    State(deployment): State<DeploymentImpl>,
    ApiJson(payload): ApiJson<CreateWorkspace>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Workspace>>), ApiError> {
    let id = Uuid::new_v4();
    let workspace = deployment
        .db()
        .transaction(move |tx| {
            let payload = payload.clone();
            Box::pin(async move { Workspace::create(tx, &payload, id).await })
        })
        .await?;

    tracing::debug!(workspace_id = %workspace.id, "Created workspace");
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(workspace)),
    ))
}

pub async fn update_workspace(
    Extension(existing): Extension<Workspace>,
    State(deployment): State<DeploymentImpl>,
    ApiJson(payload): ApiJson<UpdateWorkspace>,
) -> Result<ResponseJson<ApiResponse<Workspace>>, ApiError> {
    let id = existing.id;
    let workspace = deployment
        .db()
        .transaction(move |tx| {
            let payload = payload.clone();
            Box::pin(async move { Workspace::update(tx, id, &payload).await })
        })
        .await?;

    Ok(ResponseJson(ApiResponse::success(workspace)))
}

pub async fn delete_workspace(
    Extension(existing): Extension<Workspace>,
    State(deployment): State<DeploymentImpl>,
) -> Result<StatusCode, ApiError> {
    let id = existing.id;
    let summary = deployment
        .db()
        .transaction(move |tx| Box::pin(async move { Workspace::delete(tx, id).await }))
        .await?;

    tracing::info!(
        workspace_id = %id,
        boards = summary.boards,
        columns = summary.columns,
        tasks = summary.tasks,
        "Deleted workspace"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let workspace_id_router = Router::new()
        .route(
            "/",
            get(get_workspace)
                .patch(update_workspace)
                .delete(delete_workspace),
        )
        .route("/boards", get(get_workspace_boards))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_workspace_middleware::<DeploymentImpl>,
        ));

    let inner = Router::new()
        .route("/", get(get_workspaces).post(create_workspace))
        .nest("/{workspace_id}", workspace_id_router);

    Router::new().nest("/workspaces", inner)
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, response::IntoResponse};
    use db::{
        HierarchyError,
        models::{
            board::{Board, CreateBoard},
            workspace::DEFAULT_WORKSPACE_ICON,
        },
    };

    use super::*;
    use crate::test_support::memory_deployment;

    fn new_workspace(title: &str) -> ApiJson<CreateWorkspace> {
        ApiJson(CreateWorkspace {
            title: title.to_string(),
            icon: None,
        })
    }

    #[tokio::test]
    async fn create_workspace_returns_created_with_default_icon() {
        let deployment = memory_deployment().await;

        let (status, ResponseJson(body)) =
            create_workspace(State(deployment.clone()), new_workspace("  Personal  "))
                .await
                .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        let workspace = body.into_data().unwrap();
        assert_eq!(workspace.title, "Personal");
        assert_eq!(workspace.icon, DEFAULT_WORKSPACE_ICON);
    }

    #[tokio::test]
    async fn create_workspace_rejects_blank_title() {
        let deployment = memory_deployment().await;

        let err = create_workspace(State(deployment.clone()), new_workspace("   "))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Hierarchy(HierarchyError::Validation { field: "title", .. })
        ));

        let ResponseJson(body) = get_workspaces(State(deployment)).await.unwrap();
        assert!(body.into_data().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_returns_workspaces_with_their_boards() {
        let deployment = memory_deployment().await;
        let (_, ResponseJson(body)) =
            create_workspace(State(deployment.clone()), new_workspace("Work"))
                .await
                .unwrap();
        let workspace = body.into_data().unwrap();

        Board::create(
            &deployment.db().pool,
            &CreateBoard {
                title: "Roadmap".to_string(),
                description: None,
                workspace_id: workspace.id,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let ResponseJson(body) = get_workspaces(State(deployment.clone())).await.unwrap();
        let tree = body.into_data().unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, workspace.id);
        assert_eq!(tree[0].boards.len(), 1);
        assert_eq!(tree[0].boards[0].title, "Roadmap");

        let ResponseJson(body) =
            get_workspace_boards(Extension(workspace), State(deployment))
                .await
                .unwrap();
        assert_eq!(body.into_data().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_workspace_changes_only_present_fields() {
        let deployment = memory_deployment().await;
        let (_, ResponseJson(body)) =
            create_workspace(State(deployment.clone()), new_workspace("Work"))
                .await
                .unwrap();
        let workspace = body.into_data().unwrap();

        let payload: UpdateWorkspace = serde_json::from_str(r#"{ "icon": "🚀" }"#).unwrap();
        let ResponseJson(body) = update_workspace(
            Extension(workspace.clone()),
            State(deployment),
            ApiJson(payload),
        )
        .await
        .unwrap();

        let updated = body.into_data().unwrap();
        assert_eq!(updated.title, "Work");
        assert_eq!(updated.icon, "🚀");
    }

    #[tokio::test]
    async fn delete_workspace_returns_no_content_and_removes_it() {
        let deployment = memory_deployment().await;
        let (_, ResponseJson(body)) =
            create_workspace(State(deployment.clone()), new_workspace("Temp"))
                .await
                .unwrap();
        let workspace = body.into_data().unwrap();

        let status = delete_workspace(Extension(workspace.clone()), State(deployment.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = delete_workspace(Extension(workspace), State(deployment))
            .await
            .unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Workspace not found");
    }
}
