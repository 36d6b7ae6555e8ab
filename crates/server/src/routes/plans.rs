use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    nutrition_plan::{CreateNutritionPlan, NutritionPlan},
    training_plan::{CreateTrainingPlan, TrainingPlan},
};
use services::services::plan_editor::{NutritionPlanTree, TrainingPlanTree};
use uuid::Uuid;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, extract::CurrentActor};

/// POST /api/training-plans
pub async fn create_training_plan(
    State(deployment): State<DeploymentImpl>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<CreateTrainingPlan>,
) -> Result<ResponseJson<ApiResponse<TrainingPlan>>, ApiError> {
    let plan = deployment
        .editor()
        .create_training_plan(&actor, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(plan)))
}

/// GET /api/training-plans/{id}
/// Whole plan with weeks, days, exercises and sets in position order
pub async fn get_training_plan(
    State(deployment): State<DeploymentImpl>,
    CurrentActor(actor): CurrentActor,
    Path(plan_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<TrainingPlanTree>>, ApiError> {
    let tree = deployment
        .editor()
        .training_plan_tree(&actor, plan_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(tree)))
}

/// POST /api/nutrition-plans
pub async fn create_nutrition_plan(
    State(deployment): State<DeploymentImpl>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<CreateNutritionPlan>,
) -> Result<ResponseJson<ApiResponse<NutritionPlan>>, ApiError> {
    let plan = deployment
        .editor()
        .create_nutrition_plan(&actor, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(plan)))
}

/// GET /api/nutrition-plans/{id}
pub async fn get_nutrition_plan(
    State(deployment): State<DeploymentImpl>,
    CurrentActor(actor): CurrentActor,
    Path(plan_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<NutritionPlanTree>>, ApiError> {
    let tree = deployment
        .editor()
        .nutrition_plan_tree(&actor, plan_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(tree)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/training-plans", post(create_training_plan))
        .route("/training-plans/{id}", get(get_training_plan))
        .route("/nutrition-plans", post(create_nutrition_plan))
        .route("/nutrition-plans/{id}", get(get_nutrition_plan))
}
