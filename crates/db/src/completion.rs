//! Upward completion propagation through the training plan hierarchy.
//!
//! An exercise completes once it has sets and all of them are completed, a day once it has
//! exercises and all of them are completed, a week once every day that has exercises is
//! completed, and a plan once all of its weeks are. Each step only runs if the step below
//! actually flipped, and all of it happens on the caller's connection so it shares the
//! caller's transaction.

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use ts_rs::TS;
use uuid::Uuid;

/// Which ancestors were marked completed by a propagation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct CompletionOutcome {
    pub exercise: bool,
    pub day: bool,
    pub week: bool,
    pub plan: bool,
}

const COMPLETE_EXERCISE: &str = r#"UPDATE exercises
    SET completed_at = datetime('now', 'subsec'), updated_at = datetime('now', 'subsec')
    WHERE id = $1
      AND completed_at IS NULL
      AND EXISTS (SELECT 1 FROM exercise_sets WHERE exercise_id = $1)
      AND NOT EXISTS (SELECT 1 FROM exercise_sets WHERE exercise_id = $1 AND completed_at IS NULL)"#;

const COMPLETE_DAY: &str = r#"UPDATE training_days
    SET completed_at = datetime('now', 'subsec'), updated_at = datetime('now', 'subsec')
    WHERE id = $1
      AND completed_at IS NULL
      AND EXISTS (SELECT 1 FROM exercises WHERE day_id = $1)
      AND NOT EXISTS (SELECT 1 FROM exercises WHERE day_id = $1 AND completed_at IS NULL)"#;

// Rest days (no exercises) never complete and do not hold their week back.
const COMPLETE_WEEK: &str = r#"UPDATE training_weeks
    SET completed_at = datetime('now', 'subsec'), updated_at = datetime('now', 'subsec')
    WHERE id = $1
      AND completed_at IS NULL
      AND EXISTS (SELECT 1 FROM training_days WHERE week_id = $1 AND completed_at IS NOT NULL)
      AND NOT EXISTS (
          SELECT 1 FROM training_days d
          WHERE d.week_id = $1
            AND d.completed_at IS NULL
            AND EXISTS (SELECT 1 FROM exercises e WHERE e.day_id = d.id)
      )"#;

const COMPLETE_PLAN: &str = r#"UPDATE training_plans
    SET completed_at = datetime('now', 'subsec'), updated_at = datetime('now', 'subsec')
    WHERE id = $1
      AND completed_at IS NULL
      AND EXISTS (SELECT 1 FROM training_weeks WHERE plan_id = $1)
      AND NOT EXISTS (SELECT 1 FROM training_weeks WHERE plan_id = $1 AND completed_at IS NULL)"#;

async fn complete_if_done(
    conn: &mut SqliteConnection,
    sql: &str,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(sql).bind(id).execute(&mut *conn).await?;
    Ok(result.rows_affected() > 0)
}

async fn parent_of(
    conn: &mut SqliteConnection,
    sql: &str,
    id: Uuid,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
}

/// Complete `exercise_id` if all of its sets are done, then walk up the hierarchy.
pub async fn propagate_from_exercise(
    conn: &mut SqliteConnection,
    exercise_id: Uuid,
) -> Result<CompletionOutcome, sqlx::Error> {
    let mut outcome = CompletionOutcome::default();

    outcome.exercise = complete_if_done(conn, COMPLETE_EXERCISE, exercise_id).await?;
    if !outcome.exercise {
        return Ok(outcome);
    }

    let day_id = parent_of(conn, "SELECT day_id FROM exercises WHERE id = $1", exercise_id).await?;
    outcome.day = complete_if_done(conn, COMPLETE_DAY, day_id).await?;
    if !outcome.day {
        return Ok(outcome);
    }

    let week_id = parent_of(conn, "SELECT week_id FROM training_days WHERE id = $1", day_id).await?;
    outcome.week = complete_if_done(conn, COMPLETE_WEEK, week_id).await?;
    if !outcome.week {
        return Ok(outcome);
    }

    let plan_id = parent_of(conn, "SELECT plan_id FROM training_weeks WHERE id = $1", week_id).await?;
    outcome.plan = complete_if_done(conn, COMPLETE_PLAN, plan_id).await?;

    Ok(outcome)
}
