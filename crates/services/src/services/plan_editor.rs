//! Service for editing training and nutrition plans on behalf of a trainer or client.

use std::{future::Future, time::Duration};

use backon::{ConstantBuilder, Retryable};
use db::{
    completion::CompletionOutcome,
    models::{
        exercise::Exercise,
        exercise_set::ExerciseSet,
        nutrition_plan::{CreateNutritionPlan, MAX_NUTRITION_DAYS, NutritionDay, NutritionPlan},
        plan_meal::PlanMeal,
        training_day::TrainingDay,
        training_plan::{CreateTrainingPlan, TrainingPlan},
        training_week::TrainingWeek,
    },
    ordering::{Actor, OrderedChildren, OrderedFamily, OrderedRow, OrderingError, Role},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

/// Pause before the single retry of a conflicting edit
const CONFLICT_RETRY_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum PlanEditorError {
    #[error(transparent)]
    Ordering(#[from] OrderingError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("only trainers can create plans")]
    Forbidden,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ExerciseTree {
    #[serde(flatten)]
    #[ts(flatten)]
    pub exercise: Exercise,
    pub sets: Vec<ExerciseSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DayTree {
    #[serde(flatten)]
    #[ts(flatten)]
    pub day: TrainingDay,
    pub exercises: Vec<ExerciseTree>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct WeekTree {
    #[serde(flatten)]
    #[ts(flatten)]
    pub week: TrainingWeek,
    pub days: Vec<DayTree>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TrainingPlanTree {
    #[serde(flatten)]
    #[ts(flatten)]
    pub plan: TrainingPlan,
    pub weeks: Vec<WeekTree>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct NutritionDayTree {
    #[serde(flatten)]
    #[ts(flatten)]
    pub day: NutritionDay,
    pub meals: Vec<PlanMeal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct NutritionPlanTree {
    #[serde(flatten)]
    #[ts(flatten)]
    pub plan: NutritionPlan,
    pub days: Vec<NutritionDayTree>,
}

/// Run an ordering operation, retrying once with fresh reads if it hit a concurrent writer.
///
/// Safe for every operation because a conflicting transaction is rolled back as a whole.
pub async fn with_conflict_retry<T, Fut, FutureFn>(operation: FutureFn) -> Result<T, OrderingError>
where
    FutureFn: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OrderingError>>,
{
    operation
        .retry(
            ConstantBuilder::default()
                .with_delay(CONFLICT_RETRY_DELAY)
                .with_max_times(1),
        )
        .when(|e: &OrderingError| e.should_retry())
        .notify(|e, dur| {
            warn!(
                "Ordering edit conflicted, retrying after {:.2}s: {}",
                dur.as_secs_f64(),
                e
            )
        })
        .await
}

/// Entry point for every structural edit of training and nutrition plans
#[derive(Clone)]
pub struct PlanEditor {
    pool: SqlitePool,
}

impl PlanEditor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_training_plan(
        &self,
        actor: &Actor,
        data: &CreateTrainingPlan,
    ) -> Result<TrainingPlan, PlanEditorError> {
        if actor.role != Role::Trainer {
            return Err(PlanEditorError::Forbidden);
        }
        let plan = TrainingPlan::create(&self.pool, Uuid::new_v4(), actor.user_id, data).await?;
        info!(plan_id = %plan.id, trainer_id = %actor.user_id, "Created training plan");
        Ok(plan)
    }

    pub async fn create_nutrition_plan(
        &self,
        actor: &Actor,
        data: &CreateNutritionPlan,
    ) -> Result<NutritionPlan, PlanEditorError> {
        if actor.role != Role::Trainer {
            return Err(PlanEditorError::Forbidden);
        }
        if let Some(days) = data.days
            && !(1..=MAX_NUTRITION_DAYS).contains(&days)
        {
            return Err(OrderingError::validation(format!(
                "a nutrition plan needs between 1 and {MAX_NUTRITION_DAYS} days, got {days}"
            ))
            .into());
        }
        let plan = NutritionPlan::create(&self.pool, Uuid::new_v4(), actor.user_id, data).await?;
        info!(plan_id = %plan.id, trainer_id = %actor.user_id, "Created nutrition plan");
        Ok(plan)
    }

    /// Full plan hierarchy, visible to the owning trainer and the assigned client.
    pub async fn training_plan_tree(
        &self,
        actor: &Actor,
        plan_id: Uuid,
    ) -> Result<TrainingPlanTree, PlanEditorError> {
        let plan = TrainingPlan::find_by_id(&self.pool, plan_id)
            .await?
            .filter(|plan| can_view(actor, plan.created_by, plan.assigned_to))
            .ok_or(PlanEditorError::NotFound("training plan"))?;

        let mut weeks = Vec::new();
        for week in TrainingWeek::find_by_plan_id(&self.pool, plan_id).await? {
            let mut days = Vec::new();
            for day in TrainingDay::find_by_week_id(&self.pool, week.id).await? {
                let mut exercises = Vec::new();
                for exercise in Exercise::find_by_day_id(&self.pool, day.id).await? {
                    let sets = ExerciseSet::find_by_exercise_id(&self.pool, exercise.id).await?;
                    exercises.push(ExerciseTree { exercise, sets });
                }
                days.push(DayTree { day, exercises });
            }
            weeks.push(WeekTree { week, days });
        }

        Ok(TrainingPlanTree { plan, weeks })
    }

    pub async fn nutrition_plan_tree(
        &self,
        actor: &Actor,
        plan_id: Uuid,
    ) -> Result<NutritionPlanTree, PlanEditorError> {
        let plan = NutritionPlan::find_by_id(&self.pool, plan_id)
            .await?
            .filter(|plan| can_view(actor, plan.created_by, plan.assigned_to))
            .ok_or(PlanEditorError::NotFound("nutrition plan"))?;

        let mut days = Vec::new();
        for day in NutritionDay::find_by_plan_id(&self.pool, plan_id).await? {
            let meals = PlanMeal::find_by_day_id(&self.pool, day.id).await?;
            days.push(NutritionDayTree { day, meals });
        }

        Ok(NutritionPlanTree { plan, days })
    }

    pub async fn list_children<F: OrderedFamily>(
        &self,
        actor: &Actor,
        parent_id: Uuid,
    ) -> Result<Vec<OrderedRow>, PlanEditorError> {
        Ok(OrderedChildren::<F>::list_visible(&self.pool, actor, parent_id).await?)
    }

    pub async fn insert_child<F: OrderedFamily>(
        &self,
        actor: &Actor,
        parent_id: Uuid,
        position: Option<i64>,
        payload: &F::Payload,
    ) -> Result<Uuid, PlanEditorError> {
        let pool = &self.pool;
        let id = with_conflict_retry(move || {
            OrderedChildren::<F>::insert(pool, actor, parent_id, position, payload)
        })
        .await?;
        Ok(id)
    }

    pub async fn delete_child<F: OrderedFamily>(
        &self,
        actor: &Actor,
        child_id: Uuid,
    ) -> Result<(), PlanEditorError> {
        let pool = &self.pool;
        with_conflict_retry(move || OrderedChildren::<F>::delete(pool, actor, child_id)).await?;
        Ok(())
    }

    pub async fn move_child<F: OrderedFamily>(
        &self,
        actor: &Actor,
        child_id: Uuid,
        new_position: i64,
        new_parent_id: Option<Uuid>,
    ) -> Result<(), PlanEditorError> {
        let pool = &self.pool;
        with_conflict_retry(move || {
            OrderedChildren::<F>::move_child(pool, actor, child_id, new_position, new_parent_id)
        })
        .await?;
        Ok(())
    }

    pub async fn reorder_all<F: OrderedFamily>(
        &self,
        actor: &Actor,
        parent_id: Uuid,
        ordered_ids: &[Uuid],
    ) -> Result<Vec<OrderedRow>, PlanEditorError> {
        let pool = &self.pool;
        let rows = with_conflict_retry(move || {
            OrderedChildren::<F>::reorder_all(pool, actor, parent_id, ordered_ids)
        })
        .await?;
        Ok(rows)
    }

    pub async fn complete_set(
        &self,
        actor: &Actor,
        set_id: Uuid,
    ) -> Result<CompletionOutcome, PlanEditorError> {
        let pool = &self.pool;
        let outcome = with_conflict_retry(move || ExerciseSet::complete(pool, actor, set_id)).await?;
        if outcome.plan {
            info!(set_id = %set_id, "Training plan completed");
        }
        Ok(outcome)
    }
}

fn can_view(actor: &Actor, owner: Uuid, assignee: Option<Uuid>) -> bool {
    owner == actor.user_id || assignee == Some(actor.user_id)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use db::{
        DBService,
        models::{
            exercise::CreateExercise, exercise_set::CreateExerciseSet,
            training_week::CreateTrainingWeek,
        },
    };

    use super::*;

    #[tokio::test]
    async fn test_conflict_is_retried_once() {
        let attempts = AtomicUsize::new(0);
        let counter = &attempts;
        let result = with_conflict_retry(move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(OrderingError::ConcurrencyConflict)
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistent_conflict_surfaces() {
        let attempts = AtomicUsize::new(0);
        let counter = &attempts;
        let result: Result<(), _> = with_conflict_retry(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(OrderingError::ConcurrencyConflict)
        })
        .await;
        assert!(matches!(result, Err(OrderingError::ConcurrencyConflict)));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_domain_errors_are_not_retried() {
        let attempts = AtomicUsize::new(0);
        let counter = &attempts;
        let result: Result<(), _> = with_conflict_retry(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(OrderingError::LockedByCompletion)
        })
        .await;
        assert!(matches!(result, Err(OrderingError::LockedByCompletion)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_nutrition_plan_day_count_is_bounded() {
        let db = DBService::new_in_memory().await.unwrap();
        let editor = PlanEditor::new(db.pool.clone());
        let trainer = Actor::trainer(Uuid::new_v4());
        let plan_with = |days| CreateNutritionPlan {
            title: "Maintenance".to_string(),
            assigned_to: None,
            days: Some(days),
        };

        for days in [0, -3, MAX_NUTRITION_DAYS + 1, 100_000_000] {
            let result = editor.create_nutrition_plan(&trainer, &plan_with(days)).await;
            assert!(
                matches!(result, Err(PlanEditorError::Ordering(OrderingError::Validation(_)))),
                "{days} days should be rejected"
            );
        }

        let plan = editor
            .create_nutrition_plan(&trainer, &plan_with(MAX_NUTRITION_DAYS))
            .await
            .unwrap();
        let tree = editor.nutrition_plan_tree(&trainer, plan.id).await.unwrap();
        assert_eq!(tree.days.len() as i64, MAX_NUTRITION_DAYS);
    }

    #[tokio::test]
    async fn test_plan_tree_reflects_edits() {
        let db = DBService::new_in_memory().await.unwrap();
        let editor = PlanEditor::new(db.pool.clone());
        let trainer = Actor::trainer(Uuid::new_v4());
        let client = Actor::client(Uuid::new_v4());

        let denied = editor
            .create_training_plan(
                &client,
                &CreateTrainingPlan {
                    title: "Mine".to_string(),
                    assigned_to: None,
                },
            )
            .await;
        assert!(matches!(denied, Err(PlanEditorError::Forbidden)));

        let plan = editor
            .create_training_plan(
                &trainer,
                &CreateTrainingPlan {
                    title: "Strength".to_string(),
                    assigned_to: Some(client.user_id),
                },
            )
            .await
            .unwrap();
        let week = editor
            .insert_child::<TrainingWeek>(&trainer, plan.id, None, &CreateTrainingWeek::default())
            .await
            .unwrap();
        let tree = editor.training_plan_tree(&client, plan.id).await.unwrap();
        let monday = tree.weeks[0].days[0].day.id;
        assert_eq!(tree.weeks[0].week.id, week);
        assert_eq!(tree.weeks[0].days.len(), 7);

        let squat = editor
            .insert_child::<Exercise>(&trainer, monday, None, &CreateExercise::named("Squat"))
            .await
            .unwrap();
        let set = editor
            .insert_child::<ExerciseSet>(&trainer, squat, None, &CreateExerciseSet::default())
            .await
            .unwrap();
        let outcome = editor.complete_set(&client, set).await.unwrap();
        assert!(outcome.plan);

        let tree = editor.training_plan_tree(&trainer, plan.id).await.unwrap();
        assert!(tree.plan.completed_at.is_some());
        assert_eq!(tree.weeks[0].days[0].exercises[0].sets.len(), 1);

        let stranger = Actor::client(Uuid::new_v4());
        let hidden = editor.training_plan_tree(&stranger, plan.id).await;
        assert!(matches!(hidden, Err(PlanEditorError::NotFound(_))));
    }
}
