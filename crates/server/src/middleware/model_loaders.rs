use std::{fmt::Display, future::Future};

use axum::{
    extract::{Path, Request, State, rejection::PathRejection},
    middleware::Next,
    response::Response,
};
use db::{
    DBService, EntityKind,
    models::{board::Board, column::Column, task::Task, workspace::Workspace},
};
use deployment::Deployment;
use uuid::Uuid;

use crate::error::ApiError;

pub trait ModelLoaderDeps {
    fn db_service(&self) -> &DBService;
}

impl<D> ModelLoaderDeps for D
where
    D: Deployment,
{
    fn db_service(&self) -> &DBService {
        self.db()
    }
}

async fn fetch_model_or_error<M, E, Fut>(
    kind: EntityKind,
    model_id: Uuid,
    load_future: Fut,
) -> Result<M, ApiError>
where
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    match load_future.await {
        Ok(Some(model)) => Ok(model),
        Ok(None) => {
            tracing::warn!("{kind} {model_id} not found");
            Err(ApiError::NotFound(format!("{kind} not found")))
        }
        Err(error) => {
            tracing::error!("Failed to fetch {kind} {model_id}: {error}");
            Err(ApiError::Internal(format!("Failed to fetch {kind}")))
        }
    }
}

async fn load_request_extension<M, E, Fut>(
    request: Request,
    next: Next,
    kind: EntityKind,
    model_id: Uuid,
    load_future: Fut,
) -> Result<Response, ApiError>
where
    M: Clone + Send + Sync + 'static,
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    let model = fetch_model_or_error(kind, model_id, load_future).await?;
    let mut request = request;
    request.extensions_mut().insert(model);
    Ok(next.run(request).await)
}

pub async fn load_workspace_middleware<S>(
    State(deployment): State<S>,
    path: Result<Path<Uuid>, PathRejection>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: ModelLoaderDeps,
{
    let Path(workspace_id) = path?;
    load_request_extension(
        request,
        next,
        EntityKind::Workspace,
        workspace_id,
        Workspace::find_by_id(&deployment.db_service().pool, workspace_id),
    )
    .await
}

pub async fn load_board_middleware<S>(
    State(deployment): State<S>,
    path: Result<Path<Uuid>, PathRejection>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: ModelLoaderDeps,
{
    let Path(board_id) = path?;
    load_request_extension(
        request,
        next,
        EntityKind::Board,
        board_id,
        Board::find_by_id(&deployment.db_service().pool, board_id),
    )
    .await
}

pub async fn load_column_middleware<S>(
    State(deployment): State<S>,
    path: Result<Path<Uuid>, PathRejection>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: ModelLoaderDeps,
{
    let Path(column_id) = path?;
    load_request_extension(
        request,
        next,
        EntityKind::Column,
        column_id,
        Column::find_by_id(&deployment.db_service().pool, column_id),
    )
    .await
}

pub async fn load_task_middleware<S>(
    State(deployment): State<S>,
    path: Result<Path<Uuid>, PathRejection>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: ModelLoaderDeps,
{
    let Path(task_id) = path?;
    load_request_extension(
        request,
        next,
        EntityKind::Task,
        task_id,
        Task::find_by_id(&deployment.db_service().pool, task_id),
    )
    .await
}
