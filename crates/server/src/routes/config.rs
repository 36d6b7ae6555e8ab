use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::DeploymentImpl;

/// Debounce windows the frontend should use when reconciling reorders.
#[derive(Debug, Serialize, TS)]
pub struct ReconcileSettings {
    pub meal_debounce_ms: u64,
    pub default_debounce_ms: u64,
}

/// GET /api/config/reconcile
pub async fn get_reconcile_settings(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<ReconcileSettings>> {
    let config = deployment.reconcile_config();
    ResponseJson(ApiResponse::success(ReconcileSettings {
        meal_debounce_ms: config.meal_debounce.as_millis() as u64,
        default_debounce_ms: config.default_debounce.as_millis() as u64,
    }))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/config/reconcile", get(get_reconcile_settings))
}
