pub mod exercise;
pub mod exercise_set;
pub mod nutrition_plan;
pub mod plan_meal;
pub mod training_day;
pub mod training_plan;
pub mod training_week;
