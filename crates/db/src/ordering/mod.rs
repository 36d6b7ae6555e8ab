//! Position index model and the renumbering operator shared by every ordered entity family.
//!
//! Children of a parent carry an integer `position` that is unique and contiguous from
//! [`OrderedFamily::BASE`]. Every mutation runs in one transaction whose first statement
//! touches the parent row, which takes the SQLite write lock before any position is read.
//! Concurrent shift sequences are therefore serialised instead of interleaving.

use std::{
    collections::{HashMap, HashSet},
    marker::PhantomData,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use ts_rs::TS;
use uuid::Uuid;

mod error;
mod family;

pub use error::OrderingError;
pub use family::{Actor, OrderedFamily, ParentScope, Role};

/// The position-relevant projection of any ordered row.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct OrderedRow {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub position: i64,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Renumbering operator for family `F`.
pub struct OrderedChildren<F>(PhantomData<F>);

impl<F: OrderedFamily> OrderedChildren<F> {
    /// Children of `parent_id` in position order.
    pub async fn list(pool: &SqlitePool, parent_id: Uuid) -> Result<Vec<OrderedRow>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::rows(&mut conn, parent_id).await
    }

    /// Children of `parent_id` for a caller who owns the plan or is assigned to it.
    ///
    /// A missing parent and a parent the caller cannot see both yield `NotFound`.
    pub async fn list_visible(
        pool: &SqlitePool,
        actor: &Actor,
        parent_id: Uuid,
    ) -> Result<Vec<OrderedRow>, OrderingError> {
        let mut conn = pool.acquire().await?;
        let visible = sqlx::query_as::<_, ParentScope>(F::SCOPE_QUERY)
            .bind(parent_id)
            .fetch_optional(&mut *conn)
            .await?
            .is_some_and(|scope| actor.can_view(&scope));
        if !visible {
            return Err(OrderingError::NotFound(F::PARENT_NAME));
        }
        Ok(Self::rows(&mut conn, parent_id).await?)
    }

    /// Insert a child at `position`, or append when `position` is `None`.
    pub async fn insert(
        pool: &SqlitePool,
        actor: &Actor,
        parent_id: Uuid,
        position: Option<i64>,
        payload: &F::Payload,
    ) -> Result<Uuid, OrderingError> {
        if let Some(position) = position {
            Self::check_lower_bound(position)?;
        }

        let mut tx = pool.begin().await?;
        Self::lock_parent(&mut tx, parent_id).await?;
        Self::authorize(&mut tx, actor, parent_id).await?;

        let end = F::BASE + Self::count(&mut tx, parent_id).await?;
        let position = match position {
            None => end,
            Some(p) if p <= end => p,
            Some(p) => {
                return Err(OrderingError::validation(format!(
                    "{} position {} is past the end of the list ({})",
                    F::NAME,
                    p,
                    end
                )));
            }
        };

        Self::shift(&mut tx, parent_id, position, i64::MAX, 1).await?;
        let id = Uuid::new_v4();
        F::insert_row(&mut tx, id, parent_id, position, payload).await?;
        Self::verify_contiguous(&mut tx, parent_id).await?;
        tx.commit().await?;

        debug!(
            family = F::NAME,
            child_id = %id,
            parent_id = %parent_id,
            position,
            "Inserted ordered child"
        );
        Ok(id)
    }

    /// Delete a child and close the gap it leaves behind.
    pub async fn delete(
        pool: &SqlitePool,
        actor: &Actor,
        child_id: Uuid,
    ) -> Result<(), OrderingError> {
        let mut tx = pool.begin().await?;
        Self::lock_parent_of(&mut tx, child_id).await?;
        let child = Self::fetch_child(&mut tx, child_id).await?;
        Self::authorize(&mut tx, actor, child.parent_id).await?;
        if child.completed_at.is_some() {
            return Err(OrderingError::LockedByCompletion);
        }

        let sql = format!("DELETE FROM {} WHERE id = $1", F::TABLE);
        sqlx::query(&sql).bind(child_id).execute(&mut *tx).await?;
        Self::shift(&mut tx, child.parent_id, child.position + 1, i64::MAX, -1).await?;
        F::after_delete(&mut tx, child.parent_id).await?;
        Self::verify_contiguous(&mut tx, child.parent_id).await?;
        tx.commit().await?;

        debug!(
            family = F::NAME,
            child_id = %child_id,
            parent_id = %child.parent_id,
            position = child.position,
            "Deleted ordered child"
        );
        Ok(())
    }

    /// Move a child to `new_position`, optionally under a different parent.
    pub async fn move_child(
        pool: &SqlitePool,
        actor: &Actor,
        child_id: Uuid,
        new_position: i64,
        new_parent_id: Option<Uuid>,
    ) -> Result<(), OrderingError> {
        Self::check_lower_bound(new_position)?;

        let mut tx = pool.begin().await?;
        Self::lock_parent_of(&mut tx, child_id).await?;
        let child = Self::fetch_child(&mut tx, child_id).await?;
        Self::authorize(&mut tx, actor, child.parent_id).await?;
        if child.completed_at.is_some() {
            return Err(OrderingError::LockedByCompletion);
        }

        let source = child.parent_id;
        let old_position = child.position;

        match new_parent_id.filter(|dest| *dest != source) {
            None => {
                if new_position == old_position {
                    return Ok(());
                }
                let last = F::BASE + Self::count(&mut tx, source).await? - 1;
                if new_position > last {
                    return Err(OrderingError::validation(format!(
                        "{} position {} is past the end of the list ({})",
                        F::NAME,
                        new_position,
                        last
                    )));
                }

                if new_position < old_position {
                    Self::shift(&mut tx, source, new_position, old_position - 1, 1).await?;
                } else {
                    Self::shift(&mut tx, source, old_position + 1, new_position, -1).await?;
                }
                Self::set_position(&mut tx, child_id, source, new_position).await?;
                Self::verify_contiguous(&mut tx, source).await?;
            }
            Some(dest) => {
                if !F::ALLOWS_REPARENT {
                    return Err(OrderingError::validation(format!(
                        "{} cannot be moved to another {}",
                        F::NAME,
                        F::PARENT_NAME
                    )));
                }
                Self::lock_parent(&mut tx, dest).await?;
                Self::authorize(&mut tx, actor, dest).await?;

                let end = F::BASE + Self::count(&mut tx, dest).await?;
                if new_position > end {
                    return Err(OrderingError::validation(format!(
                        "{} position {} is past the end of the list ({})",
                        F::NAME,
                        new_position,
                        end
                    )));
                }

                Self::shift(&mut tx, source, old_position + 1, i64::MAX, -1).await?;
                Self::shift(&mut tx, dest, new_position, i64::MAX, 1).await?;
                Self::set_position(&mut tx, child_id, dest, new_position).await?;
                Self::verify_contiguous(&mut tx, source).await?;
                Self::verify_contiguous(&mut tx, dest).await?;
            }
        }
        tx.commit().await?;

        debug!(
            family = F::NAME,
            child_id = %child_id,
            from_parent = %source,
            to_parent = ?new_parent_id,
            from = old_position,
            to = new_position,
            "Moved ordered child"
        );
        Ok(())
    }

    /// Assign `BASE + index` to every child following the complete desired order.
    ///
    /// `ordered` must list every current child exactly once. Returns the canonical
    /// order after the write.
    pub async fn reorder_all(
        pool: &SqlitePool,
        actor: &Actor,
        parent_id: Uuid,
        ordered: &[Uuid],
    ) -> Result<Vec<OrderedRow>, OrderingError> {
        if ordered.is_empty() {
            return Err(OrderingError::validation("order must list every child"));
        }
        let mut seen = HashSet::with_capacity(ordered.len());
        if let Some(dup) = ordered.iter().find(|id| !seen.insert(**id)) {
            return Err(OrderingError::validation(format!(
                "{} {} appears more than once",
                F::NAME,
                dup
            )));
        }

        let mut tx = pool.begin().await?;
        Self::lock_parent(&mut tx, parent_id).await?;
        Self::authorize(&mut tx, actor, parent_id).await?;

        let current = Self::rows(&mut tx, parent_id).await?;
        let by_id: HashMap<Uuid, &OrderedRow> = current.iter().map(|row| (row.id, row)).collect();
        if current.len() != ordered.len() || ordered.iter().any(|id| !by_id.contains_key(id)) {
            return Err(OrderingError::validation(format!(
                "order does not match the {}s of this {}",
                F::NAME,
                F::PARENT_NAME
            )));
        }

        let mut changes = Vec::new();
        for (index, id) in ordered.iter().enumerate() {
            let row = by_id[id];
            let target = F::BASE + index as i64;
            if row.position != target {
                if row.completed_at.is_some() {
                    return Err(OrderingError::LockedByCompletion);
                }
                changes.push((*id, target));
            }
        }

        for (id, position) in &changes {
            Self::set_position(&mut tx, *id, parent_id, *position).await?;
        }
        Self::verify_contiguous(&mut tx, parent_id).await?;
        let rows = Self::rows(&mut tx, parent_id).await?;
        tx.commit().await?;

        debug!(
            family = F::NAME,
            parent_id = %parent_id,
            changed = changes.len(),
            "Reordered children"
        );
        Ok(rows)
    }

    fn check_lower_bound(position: i64) -> Result<(), OrderingError> {
        if position < F::BASE {
            return Err(OrderingError::validation(format!(
                "{} position must be at least {}, got {}",
                F::NAME,
                F::BASE,
                position
            )));
        }
        Ok(())
    }

    async fn lock_parent(conn: &mut SqliteConnection, parent_id: Uuid) -> Result<(), OrderingError> {
        let sql = format!(
            "UPDATE {} SET updated_at = updated_at WHERE id = $1",
            F::PARENT_TABLE
        );
        let result = sqlx::query(&sql).bind(parent_id).execute(&mut *conn).await?;
        if result.rows_affected() == 0 {
            return Err(OrderingError::NotFound(F::PARENT_NAME));
        }
        Ok(())
    }

    /// Same as [`Self::lock_parent`], resolving the parent through the child in the same statement.
    async fn lock_parent_of(conn: &mut SqliteConnection, child_id: Uuid) -> Result<(), OrderingError> {
        let sql = format!(
            "UPDATE {} SET updated_at = updated_at WHERE id = (SELECT {} FROM {} WHERE id = $1)",
            F::PARENT_TABLE,
            F::PARENT_COLUMN,
            F::TABLE
        );
        let result = sqlx::query(&sql).bind(child_id).execute(&mut *conn).await?;
        if result.rows_affected() == 0 {
            return Err(OrderingError::NotFound(F::NAME));
        }
        Ok(())
    }

    async fn authorize(
        conn: &mut SqliteConnection,
        actor: &Actor,
        parent_id: Uuid,
    ) -> Result<ParentScope, OrderingError> {
        let scope = sqlx::query_as::<_, ParentScope>(F::SCOPE_QUERY)
            .bind(parent_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(OrderingError::NotFound(F::PARENT_NAME))?;

        if !actor.can_edit(&scope) {
            return Err(OrderingError::NotFound(F::PARENT_NAME));
        }
        if scope.locked {
            return Err(OrderingError::LockedByCompletion);
        }
        Ok(scope)
    }

    async fn fetch_child(
        conn: &mut SqliteConnection,
        child_id: Uuid,
    ) -> Result<OrderedRow, OrderingError> {
        let sql = format!(
            r#"SELECT id, {} AS parent_id, position, completed_at FROM {} WHERE id = $1"#,
            F::PARENT_COLUMN,
            F::TABLE
        );
        sqlx::query_as::<_, OrderedRow>(&sql)
            .bind(child_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(OrderingError::NotFound(F::NAME))
    }

    async fn rows(
        conn: &mut SqliteConnection,
        parent_id: Uuid,
    ) -> Result<Vec<OrderedRow>, sqlx::Error> {
        let sql = format!(
            r#"SELECT id, {parent} AS parent_id, position, completed_at
               FROM {table}
               WHERE {parent} = $1
               ORDER BY position ASC"#,
            parent = F::PARENT_COLUMN,
            table = F::TABLE
        );
        sqlx::query_as::<_, OrderedRow>(&sql)
            .bind(parent_id)
            .fetch_all(&mut *conn)
            .await
    }

    async fn count(conn: &mut SqliteConnection, parent_id: Uuid) -> Result<i64, sqlx::Error> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            F::TABLE,
            F::PARENT_COLUMN
        );
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(parent_id)
            .fetch_one(&mut *conn)
            .await
    }

    /// Add `delta` to the position of every child of `parent_id` within `from..=to`.
    async fn shift(
        conn: &mut SqliteConnection,
        parent_id: Uuid,
        from: i64,
        to: i64,
        delta: i64,
    ) -> Result<u64, sqlx::Error> {
        let sql = format!(
            r#"UPDATE {table}
               SET position = position + $2, updated_at = datetime('now', 'subsec')
               WHERE {parent} = $1 AND position BETWEEN $3 AND $4"#,
            table = F::TABLE,
            parent = F::PARENT_COLUMN
        );
        let result = sqlx::query(&sql)
            .bind(parent_id)
            .bind(delta)
            .bind(from)
            .bind(to)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    async fn set_position(
        conn: &mut SqliteConnection,
        child_id: Uuid,
        parent_id: Uuid,
        position: i64,
    ) -> Result<(), sqlx::Error> {
        let sql = format!(
            r#"UPDATE {} SET {} = $2, position = $3, updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
            F::TABLE,
            F::PARENT_COLUMN
        );
        sqlx::query(&sql)
            .bind(child_id)
            .bind(parent_id)
            .bind(position)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn verify_contiguous(
        conn: &mut SqliteConnection,
        parent_id: Uuid,
    ) -> Result<(), OrderingError> {
        let sql = format!(
            "SELECT position FROM {} WHERE {} = $1 ORDER BY position ASC",
            F::TABLE,
            F::PARENT_COLUMN
        );
        let positions: Vec<i64> = sqlx::query_scalar(&sql)
            .bind(parent_id)
            .fetch_all(&mut *conn)
            .await?;

        if let Some((expected, actual)) = (F::BASE..)
            .zip(positions)
            .find(|(expected, actual)| expected != actual)
        {
            return Err(OrderingError::InvariantViolated(format!(
                "{} under {} has position {} where {} was expected",
                F::NAME,
                parent_id,
                actual,
                expected
            )));
        }
        Ok(())
    }
}
