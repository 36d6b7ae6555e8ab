use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use crate::ordering::OrderedFamily;

/// Every week is created with one training day per weekday.
pub const DAYS_PER_WEEK: i64 = 7;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct TrainingWeek {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub position: i64, // Week number, starting at 1
    pub label: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreateTrainingWeek {
    pub label: Option<String>,
}

#[async_trait]
impl OrderedFamily for TrainingWeek {
    const NAME: &'static str = "training week";
    const TABLE: &'static str = "training_weeks";
    const PARENT_COLUMN: &'static str = "plan_id";
    const PARENT_TABLE: &'static str = "training_plans";
    const PARENT_NAME: &'static str = "training plan";
    const BASE: i64 = 1;
    const SCOPE_QUERY: &'static str = r#"SELECT
            created_by                 AS owner_id,
            assigned_to                AS assignee_id,
            (completed_at IS NOT NULL) AS locked
        FROM training_plans
        WHERE id = $1"#;

    type Payload = CreateTrainingWeek;

    async fn insert_row(
        conn: &mut SqliteConnection,
        id: Uuid,
        parent_id: Uuid,
        position: i64,
        payload: &CreateTrainingWeek,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO training_weeks (id, plan_id, position, label) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(parent_id)
            .bind(position)
            .bind(&payload.label)
            .execute(&mut *conn)
            .await?;

        for day_of_week in 1..=DAYS_PER_WEEK {
            sqlx::query("INSERT INTO training_days (id, week_id, day_of_week) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(id)
                .bind(day_of_week)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}

impl TrainingWeek {
    pub async fn find_by_plan_id(
        pool: &SqlitePool,
        plan_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TrainingWeek>(
            r#"SELECT id, plan_id, position, label, completed_at, created_at, updated_at
               FROM training_weeks
               WHERE plan_id = $1
               ORDER BY position ASC"#,
        )
        .bind(plan_id)
        .fetch_all(pool)
        .await
    }
}
