use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct TrainingPlan {
    pub id: Uuid,
    pub title: String,
    pub created_by: Uuid,           // Trainer who owns the plan
    pub assigned_to: Option<Uuid>,  // Client following the plan
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTrainingPlan {
    pub title: String,
    pub assigned_to: Option<Uuid>,
}

impl TrainingPlan {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        created_by: Uuid,
        data: &CreateTrainingPlan,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TrainingPlan>(
            r#"INSERT INTO training_plans (id, title, created_by, assigned_to)
               VALUES ($1, $2, $3, $4)
               RETURNING id, title, created_by, assigned_to, completed_at, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(created_by)
        .bind(data.assigned_to)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TrainingPlan>(
            r#"SELECT id, title, created_by, assigned_to, completed_at, created_at, updated_at
               FROM training_plans
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
