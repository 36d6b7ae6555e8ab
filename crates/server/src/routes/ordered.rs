//! Insert, delete, move and reorder routes, shared by every ordered family.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post, put},
};
use db::ordering::{OrderedFamily, OrderedRow};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, extract::CurrentActor};

/// `?position=` on an insert; omitted means append.
#[derive(Debug, Deserialize, TS)]
pub struct InsertChildQuery {
    pub position: Option<i64>,
}

#[derive(Debug, Deserialize, TS)]
pub struct MoveChildRequest {
    pub new_position: i64,
    pub new_parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, TS)]
pub struct ReorderChildrenRequest {
    pub ordered_ids: Vec<Uuid>,
}

/// GET /api/{parent}/{id}/{children}
pub async fn list_children<F: OrderedFamily>(
    State(deployment): State<DeploymentImpl>,
    CurrentActor(actor): CurrentActor,
    Path(parent_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<OrderedRow>>>, ApiError> {
    let rows = deployment.editor().list_children::<F>(&actor, parent_id).await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

/// POST /api/{parent}/{id}/{children}?position=N
pub async fn insert_child<F>(
    State(deployment): State<DeploymentImpl>,
    CurrentActor(actor): CurrentActor,
    Path(parent_id): Path<Uuid>,
    Query(query): Query<InsertChildQuery>,
    Json(payload): Json<F::Payload>,
) -> Result<ResponseJson<ApiResponse<Uuid>>, ApiError>
where
    F: OrderedFamily,
    F::Payload: DeserializeOwned,
{
    let id = deployment
        .editor()
        .insert_child::<F>(&actor, parent_id, query.position, &payload)
        .await?;
    info!(family = F::NAME, parent_id = %parent_id, child_id = %id, "Inserted child");
    Ok(ResponseJson(ApiResponse::success(id)))
}

/// PUT /api/{parent}/{id}/{children}/order
/// Replace the whole order; the response carries the order the server kept
pub async fn reorder_children<F: OrderedFamily>(
    State(deployment): State<DeploymentImpl>,
    CurrentActor(actor): CurrentActor,
    Path(parent_id): Path<Uuid>,
    Json(request): Json<ReorderChildrenRequest>,
) -> Result<ResponseJson<ApiResponse<Vec<OrderedRow>>>, ApiError> {
    let rows = deployment
        .editor()
        .reorder_all::<F>(&actor, parent_id, &request.ordered_ids)
        .await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

/// DELETE /api/{children}/{id}
pub async fn delete_child<F: OrderedFamily>(
    State(deployment): State<DeploymentImpl>,
    CurrentActor(actor): CurrentActor,
    Path(child_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.editor().delete_child::<F>(&actor, child_id).await?;
    info!(family = F::NAME, child_id = %child_id, "Deleted child");
    Ok(ResponseJson(ApiResponse::success(())))
}

/// POST /api/{children}/{id}/move
pub async fn move_child<F: OrderedFamily>(
    State(deployment): State<DeploymentImpl>,
    CurrentActor(actor): CurrentActor,
    Path(child_id): Path<Uuid>,
    Json(request): Json<MoveChildRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .editor()
        .move_child::<F>(&actor, child_id, request.new_position, request.new_parent_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Routes for family `F`, whose parents live under `/{parent_path}` and whose rows live
/// under `/{child_path}`.
pub fn router<F>(parent_path: &str, child_path: &str) -> Router<DeploymentImpl>
where
    F: OrderedFamily,
    F::Payload: DeserializeOwned,
{
    Router::new()
        .route(
            &format!("/{parent_path}/{{id}}/{child_path}"),
            get(list_children::<F>).post(insert_child::<F>),
        )
        .route(
            &format!("/{parent_path}/{{id}}/{child_path}/order"),
            put(reorder_children::<F>),
        )
        .route(&format!("/{child_path}/{{id}}"), delete(delete_child::<F>))
        .route(&format!("/{child_path}/{{id}}/move"), post(move_child::<F>))
}
