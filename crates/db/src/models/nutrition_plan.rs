use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Number of days a nutrition plan gets when the request does not say
pub const DEFAULT_NUTRITION_DAYS: i64 = 7;
/// Upper bound on the day count, one leap year
pub const MAX_NUTRITION_DAYS: i64 = 366;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct NutritionPlan {
    pub id: Uuid,
    pub title: String,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct NutritionDay {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub day_number: i64,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateNutritionPlan {
    pub title: String,
    pub assigned_to: Option<Uuid>,
    pub days: Option<i64>,
}

impl NutritionPlan {
    /// Create the plan together with its numbered days.
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        created_by: Uuid,
        data: &CreateNutritionPlan,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let plan = sqlx::query_as::<_, NutritionPlan>(
            r#"INSERT INTO nutrition_plans (id, title, created_by, assigned_to)
               VALUES ($1, $2, $3, $4)
               RETURNING id, title, created_by, assigned_to, completed_at, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(created_by)
        .bind(data.assigned_to)
        .fetch_one(&mut *tx)
        .await?;

        for day_number in 1..=data.days.unwrap_or(DEFAULT_NUTRITION_DAYS) {
            sqlx::query("INSERT INTO nutrition_days (id, plan_id, day_number) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(id)
                .bind(day_number)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(plan)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, NutritionPlan>(
            r#"SELECT id, title, created_by, assigned_to, completed_at, created_at, updated_at
               FROM nutrition_plans
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

impl NutritionDay {
    pub async fn find_by_plan_id(
        pool: &SqlitePool,
        plan_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, NutritionDay>(
            r#"SELECT id, plan_id, day_number, completed_at, created_at, updated_at
               FROM nutrition_days
               WHERE plan_id = $1
               ORDER BY day_number ASC"#,
        )
        .bind(plan_id)
        .fetch_all(pool)
        .await
    }
}
