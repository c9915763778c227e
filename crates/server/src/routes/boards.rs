use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    board::{Board, CreateBoard, UpdateBoard},
    column::Column,
};
use deployment::Deployment;
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, extract::ApiJson, middleware::load_board_middleware};

pub async fn get_board(
    Extension(board): Extension<Board>,
) -> Result<ResponseJson<ApiResponse<Board>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(board)))
}

/// Columns in display order.
pub async fn get_board_columns(
    Extension(board): Extension<Board>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Column>>>, ApiError> {
    let columns = Column::find_by_board_id(&deployment.db().pool, board.id).await?;
    Ok(ResponseJson(ApiResponse::success(columns)))
}

pub async fn create_board(
    State(deployment): State<DeploymentImpl>,
    ApiJson(payload): ApiJson<CreateBoard>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Board>>), ApiError> {
    let id = Uuid::new_v4();
    let board = deployment
        .db()
        .transaction(move |tx| {
            let payload = payload.clone();
            Box::pin(async move { Board::create(tx, &payload, id).await })
        })
        .await?;

    tracing::debug!(board_id = %board.id, workspace_id = %board.workspace_id, "Created board");
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(board))))
}

pub async fn update_board(
    Extension(existing): Extension<Board>,
    State(deployment): State<DeploymentImpl>,
    ApiJson(payload): ApiJson<UpdateBoard>,
) -> Result<ResponseJson<ApiResponse<Board>>, ApiError> {
    let id = existing.id;
    let board = deployment
        .db()
        .transaction(move |tx| {
            let payload = payload.clone();
            Box::pin(async move { Board::update(tx, id, &payload).await })
        })
        .await?;

    Ok(ResponseJson(ApiResponse::success(board)))
}

pub async fn delete_board(
    Extension(existing): Extension<Board>,
    State(deployment): State<DeploymentImpl>,
) -> Result<StatusCode, ApiError> {
    let id = existing.id;
    let summary = deployment
        .db()
        .transaction(move |tx| Box::pin(async move { Board::delete(tx, id).await }))
        .await?;

    tracing::info!(
        board_id = %id,
        columns = summary.columns,
        tasks = summary.tasks,
        "Deleted board"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let board_id_router = Router::new()
        .route("/", get(get_board).patch(update_board).delete(delete_board))
        .route("/columns", get(get_board_columns))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_board_middleware::<DeploymentImpl>,
        ));

    let inner = Router::new()
        .route("/", post(create_board))
        .nest("/{board_id}", board_id_router);

    Router::new().nest("/boards", inner)
}
