use std::{env, fs, path::Path};

use ts_rs::TS;

fn generate_types_content() -> String {
    let header = "// This file was generated by `cargo run --bin generate_types`. Do not edit.\n\n";
    let decls = [
        utils::response::ApiResponse::<()>::decl(),
        db::ordering::Role::decl(),
        db::ordering::OrderedRow::decl(),
        db::completion::CompletionOutcome::decl(),
        db::models::training_plan::TrainingPlan::decl(),
        db::models::training_plan::CreateTrainingPlan::decl(),
        db::models::training_week::TrainingWeek::decl(),
        db::models::training_week::CreateTrainingWeek::decl(),
        db::models::training_day::TrainingDay::decl(),
        db::models::exercise::Exercise::decl(),
        db::models::exercise::CreateExercise::decl(),
        db::models::exercise_set::ExerciseSet::decl(),
        db::models::exercise_set::CreateExerciseSet::decl(),
        db::models::nutrition_plan::NutritionPlan::decl(),
        db::models::nutrition_plan::NutritionDay::decl(),
        db::models::nutrition_plan::CreateNutritionPlan::decl(),
        db::models::plan_meal::PlanMeal::decl(),
        db::models::plan_meal::CreatePlanMeal::decl(),
        services::services::plan_editor::ExerciseTree::decl(),
        services::services::plan_editor::DayTree::decl(),
        services::services::plan_editor::WeekTree::decl(),
        services::services::plan_editor::TrainingPlanTree::decl(),
        services::services::plan_editor::NutritionDayTree::decl(),
        services::services::plan_editor::NutritionPlanTree::decl(),
        services::services::ordered_collection::SyncState::decl(),
        server::routes::ordered::InsertChildQuery::decl(),
        server::routes::ordered::MoveChildRequest::decl(),
        server::routes::ordered::ReorderChildrenRequest::decl(),
        server::routes::config::ReconcileSettings::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|decl| format!("export {}", decl.trim_start_matches("export ")))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{header}{body}\n")
}

fn main() {
    let check_mode = env::args().any(|arg| arg == "--check");
    let shared_path = Path::new("shared");
    let types_path = shared_path.join("types.ts");
    let generated = generate_types_content();

    if check_mode {
        let current = fs::read_to_string(&types_path).unwrap_or_default();
        if current == generated {
            println!("✅ shared/types.ts is up to date.");
            std::process::exit(0);
        }
        eprintln!("❌ shared/types.ts is not up to date. Run `cargo run --bin generate_types`.");
        std::process::exit(1);
    }

    fs::create_dir_all(shared_path).expect("cannot create shared");
    fs::write(&types_path, generated).expect("unable to write types.ts");
    println!("✅ TypeScript types written to {}", types_path.display());
}
