use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    completion::{self, CompletionOutcome},
    ordering::{Actor, OrderedFamily, OrderingError, ParentScope},
};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ExerciseSet {
    pub id: Uuid,
    pub exercise_id: Uuid,
    pub position: i64, // Set number, starting at 1
    pub reps: Option<i64>,
    pub weight_kg: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreateExerciseSet {
    pub reps: Option<i64>,
    pub weight_kg: Option<f64>,
}

#[async_trait]
impl OrderedFamily for ExerciseSet {
    const NAME: &'static str = "exercise set";
    const TABLE: &'static str = "exercise_sets";
    const PARENT_COLUMN: &'static str = "exercise_id";
    const PARENT_TABLE: &'static str = "exercises";
    const PARENT_NAME: &'static str = "exercise";
    const BASE: i64 = 1;
    const SCOPE_QUERY: &'static str = r#"SELECT
            p.created_by AS owner_id,
            p.assigned_to AS assignee_id,
            (e.completed_at IS NOT NULL
                OR d.completed_at IS NOT NULL
                OR w.completed_at IS NOT NULL
                OR p.completed_at IS NOT NULL) AS locked
        FROM exercises e
        JOIN training_days d ON d.id = e.day_id
        JOIN training_weeks w ON w.id = d.week_id
        JOIN training_plans p ON p.id = w.plan_id
        WHERE e.id = $1"#;

    type Payload = CreateExerciseSet;

    async fn insert_row(
        conn: &mut SqliteConnection,
        id: Uuid,
        parent_id: Uuid,
        position: i64,
        payload: &CreateExerciseSet,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO exercise_sets (id, exercise_id, position, reps, weight_kg)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(id)
        .bind(parent_id)
        .bind(position)
        .bind(payload.reps)
        .bind(payload.weight_kg)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Deleting the last incomplete set finishes the exercise.
    async fn after_delete(conn: &mut SqliteConnection, parent_id: Uuid) -> Result<(), sqlx::Error> {
        let outcome = completion::propagate_from_exercise(conn, parent_id).await?;
        if outcome.exercise {
            debug!(exercise_id = %parent_id, ?outcome, "Exercise completed by set deletion");
        }
        Ok(())
    }
}

impl ExerciseSet {
    pub async fn find_by_exercise_id(
        pool: &SqlitePool,
        exercise_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ExerciseSet>(
            r#"SELECT id, exercise_id, position, reps, weight_kg, completed_at, created_at, updated_at
               FROM exercise_sets
               WHERE exercise_id = $1
               ORDER BY position ASC"#,
        )
        .bind(exercise_id)
        .fetch_all(pool)
        .await
    }

    /// Mark a set as done and propagate completion up the plan.
    ///
    /// Open to the plan owner and the assigned client. Completing an already
    /// completed set is a no-op.
    pub async fn complete(
        pool: &SqlitePool,
        actor: &Actor,
        id: Uuid,
    ) -> Result<CompletionOutcome, OrderingError> {
        let mut tx = pool.begin().await?;

        let touched = sqlx::query("UPDATE exercise_sets SET updated_at = updated_at WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(OrderingError::NotFound(Self::NAME));
        }

        let (exercise_id, completed_at): (Uuid, Option<DateTime<Utc>>) =
            sqlx::query_as("SELECT exercise_id, completed_at FROM exercise_sets WHERE id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        let scope = sqlx::query_as::<_, ParentScope>(Self::SCOPE_QUERY)
            .bind(exercise_id)
            .fetch_one(&mut *tx)
            .await?;
        if !actor.can_log_progress(&scope) {
            return Err(OrderingError::NotFound(Self::NAME));
        }
        if completed_at.is_some() {
            return Ok(CompletionOutcome::default());
        }

        sqlx::query(
            r#"UPDATE exercise_sets
               SET completed_at = datetime('now', 'subsec'), updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let outcome = completion::propagate_from_exercise(&mut tx, exercise_id).await?;
        tx.commit().await?;

        debug!(set_id = %id, exercise_id = %exercise_id, ?outcome, "Completed exercise set");
        Ok(outcome)
    }
}
