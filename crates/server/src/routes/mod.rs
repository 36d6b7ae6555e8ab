use axum::Router;
use db::models::{
    exercise::Exercise, exercise_set::ExerciseSet, plan_meal::PlanMeal,
    training_week::TrainingWeek,
};
use tower_http::trace::TraceLayer;

use crate::DeploymentImpl;

pub mod config;
pub mod ordered;
pub mod plans;
pub mod sets;

pub fn router(deployment: DeploymentImpl) -> Router {
    let api = Router::new()
        .merge(plans::router(&deployment))
        .merge(config::router(&deployment))
        .merge(sets::router(&deployment))
        .merge(ordered::router::<TrainingWeek>("training-plans", "weeks"))
        .merge(ordered::router::<Exercise>("days", "exercises"))
        .merge(ordered::router::<ExerciseSet>("exercises", "sets"))
        .merge(ordered::router::<PlanMeal>("nutrition-days", "meals"));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}
