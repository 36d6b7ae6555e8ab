use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::post,
};
use db::completion::CompletionOutcome;
use uuid::Uuid;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, extract::CurrentActor};

/// POST /api/sets/{id}/complete
/// Log a set as done; the response says which ancestors completed with it
pub async fn complete_set(
    State(deployment): State<DeploymentImpl>,
    CurrentActor(actor): CurrentActor,
    Path(set_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<CompletionOutcome>>, ApiError> {
    let outcome = deployment.editor().complete_set(&actor, set_id).await?;
    Ok(ResponseJson(ApiResponse::success(outcome)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/sets/{id}/complete", post(complete_set))
}
