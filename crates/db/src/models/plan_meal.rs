use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use crate::ordering::OrderedFamily;

/// A meal slot in a nutrition plan day. Meal order is zero-based.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct PlanMeal {
    pub id: Uuid,
    pub day_id: Uuid, // Foreign key to NutritionDay
    pub position: i64,
    pub name: String,
    pub calories: Option<i64>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreatePlanMeal {
    pub name: String,
    pub calories: Option<i64>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
}

impl CreatePlanMeal {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calories: None,
            protein_g: None,
            carbs_g: None,
            fat_g: None,
        }
    }
}

#[async_trait]
impl OrderedFamily for PlanMeal {
    const NAME: &'static str = "meal";
    const TABLE: &'static str = "plan_meals";
    const PARENT_COLUMN: &'static str = "day_id";
    const PARENT_TABLE: &'static str = "nutrition_days";
    const PARENT_NAME: &'static str = "nutrition day";
    const BASE: i64 = 0;
    const SCOPE_QUERY: &'static str = r#"SELECT
            p.created_by AS owner_id,
            p.assigned_to AS assignee_id,
            (d.completed_at IS NOT NULL OR p.completed_at IS NOT NULL) AS locked
        FROM nutrition_days d
        JOIN nutrition_plans p ON p.id = d.plan_id
        WHERE d.id = $1"#;

    type Payload = CreatePlanMeal;

    async fn insert_row(
        conn: &mut SqliteConnection,
        id: Uuid,
        parent_id: Uuid,
        position: i64,
        payload: &CreatePlanMeal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO plan_meals (id, day_id, position, name, calories, protein_g, carbs_g, fat_g)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(id)
        .bind(parent_id)
        .bind(position)
        .bind(&payload.name)
        .bind(payload.calories)
        .bind(payload.protein_g)
        .bind(payload.carbs_g)
        .bind(payload.fat_g)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

impl PlanMeal {
    pub async fn find_by_day_id(pool: &SqlitePool, day_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PlanMeal>(
            r#"SELECT id, day_id, position, name, calories, protein_g, carbs_g, fat_g,
                      completed_at, created_at, updated_at
               FROM plan_meals
               WHERE day_id = $1
               ORDER BY position ASC"#,
        )
        .bind(day_id)
        .fetch_all(pool)
        .await
    }
}
