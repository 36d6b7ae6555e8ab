use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Role of the user performing an operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Trainer,
    Client,
}

/// The user on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn trainer(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Trainer,
        }
    }

    pub fn client(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Client,
        }
    }

    /// Structural edits are reserved for the trainer who created the plan.
    pub fn can_edit(&self, scope: &ParentScope) -> bool {
        self.role == Role::Trainer && scope.owner_id == self.user_id
    }

    /// Reading a plan is open to its owner and the assigned client.
    pub fn can_view(&self, scope: &ParentScope) -> bool {
        scope.owner_id == self.user_id || scope.assignee_id == Some(self.user_id)
    }

    /// Progress updates (completing sets) follow the same rule as reading.
    pub fn can_log_progress(&self, scope: &ParentScope) -> bool {
        self.can_view(scope)
    }
}

/// Ownership and lock state of a parent, resolved through its ancestor chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct ParentScope {
    pub owner_id: Uuid,
    pub assignee_id: Option<Uuid>,
    /// True when the parent or any of its ancestors has `completed_at` set.
    pub locked: bool,
}

/// An entity family whose rows form a contiguous, positioned list under a parent.
///
/// Implementors describe where the rows live and how to create one; the
/// shifting arithmetic lives in [`super::OrderedChildren`] and is shared by all
/// families.
#[async_trait]
pub trait OrderedFamily: Send + Sync + 'static {
    /// Human-readable name used in errors and logs.
    const NAME: &'static str;
    const TABLE: &'static str;
    const PARENT_COLUMN: &'static str;
    const PARENT_TABLE: &'static str;
    const PARENT_NAME: &'static str;
    /// Position of the first child.
    const BASE: i64;
    /// Whether rows may be moved to a different parent.
    const ALLOWS_REPARENT: bool = false;
    /// Query with a single `$1` parent id bind, selecting `owner_id`,
    /// `assignee_id` and `locked`.
    const SCOPE_QUERY: &'static str;

    type Payload: Send + Sync;

    /// Insert the row itself. Sibling positions have already been shifted.
    async fn insert_row(
        conn: &mut SqliteConnection,
        id: Uuid,
        parent_id: Uuid,
        position: i64,
        payload: &Self::Payload,
    ) -> Result<(), sqlx::Error>;

    /// Family-specific policy run in the delete transaction after siblings were renumbered.
    async fn after_delete(
        _conn: &mut SqliteConnection,
        _parent_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        Ok(())
    }
}
