use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A weekday slot inside a training week. Days are created with their week and never reordered.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct TrainingDay {
    pub id: Uuid,
    pub week_id: Uuid,
    pub day_of_week: i64, // 1 = Monday
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainingDay {
    pub async fn find_by_week_id(
        pool: &SqlitePool,
        week_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TrainingDay>(
            r#"SELECT id, week_id, day_of_week, completed_at, created_at, updated_at
               FROM training_days
               WHERE week_id = $1
               ORDER BY day_of_week ASC"#,
        )
        .bind(week_id)
        .fetch_all(pool)
        .await
    }
}
