use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use crate::ordering::OrderedFamily;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Exercise {
    pub id: Uuid,
    pub day_id: Uuid, // Foreign key to TrainingDay
    pub position: i64,
    pub name: String,
    pub notes: Option<String>,
    pub rest_seconds: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateExercise {
    pub name: String,
    pub notes: Option<String>,
    pub rest_seconds: Option<i64>,
}

impl CreateExercise {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notes: None,
            rest_seconds: None,
        }
    }
}

#[async_trait]
impl OrderedFamily for Exercise {
    const NAME: &'static str = "exercise";
    const TABLE: &'static str = "exercises";
    const PARENT_COLUMN: &'static str = "day_id";
    const PARENT_TABLE: &'static str = "training_days";
    const PARENT_NAME: &'static str = "training day";
    const BASE: i64 = 1;
    const ALLOWS_REPARENT: bool = true;
    const SCOPE_QUERY: &'static str = r#"SELECT
            p.created_by AS owner_id,
            p.assigned_to AS assignee_id,
            (d.completed_at IS NOT NULL
                OR w.completed_at IS NOT NULL
                OR p.completed_at IS NOT NULL) AS locked
        FROM training_days d
        JOIN training_weeks w ON w.id = d.week_id
        JOIN training_plans p ON p.id = w.plan_id
        WHERE d.id = $1"#;

    type Payload = CreateExercise;

    async fn insert_row(
        conn: &mut SqliteConnection,
        id: Uuid,
        parent_id: Uuid,
        position: i64,
        payload: &CreateExercise,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO exercises (id, day_id, position, name, notes, rest_seconds)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(id)
        .bind(parent_id)
        .bind(position)
        .bind(&payload.name)
        .bind(&payload.notes)
        .bind(payload.rest_seconds)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

impl Exercise {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Exercise>(
            r#"SELECT id, day_id, position, name, notes, rest_seconds, completed_at, created_at, updated_at
               FROM exercises
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_day_id(pool: &SqlitePool, day_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Exercise>(
            r#"SELECT id, day_id, position, name, notes, rest_seconds, completed_at, created_at, updated_at
               FROM exercises
               WHERE day_id = $1
               ORDER BY position ASC"#,
        )
        .bind(day_id)
        .fetch_all(pool)
        .await
    }
}
