//! Debounced, optimistic reconciliation of a locally reordered child list.
//!
//! A [`ReorderSession`] owns the order the user sees for one parent. Gestures apply
//! immediately, and once the debounce window passes without another gesture the full
//! order is sent to the backend. The server's answer is canonical. When a request fails
//! and nothing newer is queued, the session restores the last order the server confirmed
//! and then refetches.

use std::{collections::HashSet, marker::PhantomData, sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::DashMap;
use db::ordering::{Actor, OrderedFamily, OrderingError};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::plan_editor::{PlanEditor, PlanEditorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncState {
    Synced,
    LocallyReordered,
    PendingSync,
    RollingBack,
}

#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("reorder rejected: {0}")]
    Rejected(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid gesture: {0}")]
    InvalidGesture(String),
}

/// Where a session reads the server order from and sends full reorders to.
#[async_trait]
pub trait OrderingBackend: Send + Sync + 'static {
    async fn fetch(&self, parent_id: Uuid) -> Result<Vec<Uuid>, ReconcileError>;

    /// Submit the complete desired order and return the canonical order the server kept.
    async fn reorder(
        &self,
        parent_id: Uuid,
        ordered_ids: Vec<Uuid>,
    ) -> Result<Vec<Uuid>, ReconcileError>;
}

struct Inner {
    /// What the user sees
    local: Vec<Uuid>,
    /// Last order confirmed by the server
    snapshot: Vec<Uuid>,
    /// Bumped on every gesture; a debounce cycle only acts while it still matches
    generation: u64,
    /// Generation of the newest response folded into `snapshot`
    acknowledged: u64,
    last_error: Option<ReconcileError>,
}

pub struct ReorderSession<B: OrderingBackend> {
    parent_id: Uuid,
    backend: Arc<B>,
    debounce: Duration,
    inner: Arc<Mutex<Inner>>,
    state: Arc<watch::Sender<SyncState>>,
}

impl<B: OrderingBackend> Clone for ReorderSession<B> {
    fn clone(&self) -> Self {
        Self {
            parent_id: self.parent_id,
            backend: self.backend.clone(),
            debounce: self.debounce,
            inner: self.inner.clone(),
            state: self.state.clone(),
        }
    }
}

impl<B: OrderingBackend> ReorderSession<B> {
    pub async fn open(
        backend: Arc<B>,
        parent_id: Uuid,
        debounce: Duration,
    ) -> Result<Self, ReconcileError> {
        let order = backend.fetch(parent_id).await?;
        let (state, _) = watch::channel(SyncState::Synced);
        Ok(Self {
            parent_id,
            backend,
            debounce,
            inner: Arc::new(Mutex::new(Inner {
                local: order.clone(),
                snapshot: order,
                generation: 0,
                acknowledged: 0,
                last_error: None,
            })),
            state: Arc::new(state),
        })
    }

    pub async fn order(&self) -> Vec<Uuid> {
        self.inner.lock().await.local.clone()
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// The failure that caused the most recent rollback, if any.
    pub async fn last_error(&self) -> Option<ReconcileError> {
        self.inner.lock().await.last_error.clone()
    }

    /// Apply a freely reordered list. It must contain exactly the current items.
    pub async fn reorder(&self, order: Vec<Uuid>) -> Result<(), ReconcileError> {
        let mut inner = self.inner.lock().await;
        let current: HashSet<&Uuid> = inner.local.iter().collect();
        let proposed: HashSet<&Uuid> = order.iter().collect();
        if order.len() != inner.local.len() || proposed != current {
            return Err(ReconcileError::InvalidGesture(
                "reordered list must contain every item exactly once".to_string(),
            ));
        }
        self.apply_gesture(&mut inner, order);
        Ok(())
    }

    /// Drag the item at index `from` so it lands at index `to`.
    pub async fn move_item(&self, from: usize, to: usize) -> Result<(), ReconcileError> {
        let mut inner = self.inner.lock().await;
        let len = inner.local.len();
        if from >= len || to >= len {
            return Err(ReconcileError::InvalidGesture(format!(
                "cannot move {from} to {to} in a list of {len}"
            )));
        }
        let mut order = inner.local.clone();
        let item = order.remove(from);
        order.insert(to, item);
        self.apply_gesture(&mut inner, order);
        Ok(())
    }

    fn apply_gesture(&self, inner: &mut Inner, order: Vec<Uuid>) {
        inner.local = order;
        inner.generation += 1;
        self.state.send_replace(SyncState::LocallyReordered);

        // An in-flight request is left alone; this cycle resends once the window passes.
        let session = self.clone();
        let generation = inner.generation;
        tokio::spawn(async move { session.debounce_then_send(generation).await });
    }

    async fn debounce_then_send(self, generation: u64) {
        tokio::time::sleep(self.debounce).await;

        let order = {
            let inner = self.inner.lock().await;
            if inner.generation != generation {
                return;
            }
            self.state.send_replace(SyncState::PendingSync);
            inner.local.clone()
        };
        debug!(parent_id = %self.parent_id, generation, items = order.len(), "Sending reorder");

        let result = self.backend.reorder(self.parent_id, order).await;

        let mut inner = self.inner.lock().await;
        match result {
            Ok(server_order) => {
                if generation >= inner.acknowledged {
                    inner.snapshot = server_order.clone();
                    inner.acknowledged = generation;
                }
                if inner.generation == generation {
                    inner.local = server_order;
                    inner.last_error = None;
                    self.state.send_replace(SyncState::Synced);
                }
            }
            Err(e) if inner.generation == generation => {
                warn!(parent_id = %self.parent_id, error = %e, "Reorder failed, rolling back");
                self.state.send_replace(SyncState::RollingBack);
                inner.local = inner.snapshot.clone();
                inner.last_error = Some(e);
                drop(inner);

                let refetched = self.backend.fetch(self.parent_id).await;

                let mut inner = self.inner.lock().await;
                match refetched {
                    Ok(fresh) => {
                        // Responses to older cycles must not replace the refetched order.
                        inner.acknowledged = inner.generation;
                        inner.snapshot = fresh.clone();
                        if inner.generation == generation {
                            inner.local = fresh;
                        }
                    }
                    Err(e) => {
                        warn!(parent_id = %self.parent_id, error = %e, "Refetch after rollback failed")
                    }
                }
                if inner.generation == generation {
                    self.state.send_replace(SyncState::Synced);
                }
            }
            Err(e) => {
                debug!(
                    parent_id = %self.parent_id,
                    generation,
                    error = %e,
                    "Superseded reorder failed, newer order will be resent"
                );
            }
        }
    }
}

/// One session per parent for a single family backend.
pub struct SessionRegistry<B: OrderingBackend> {
    backend: Arc<B>,
    debounce: Duration,
    sessions: DashMap<Uuid, ReorderSession<B>>,
}

impl<B: OrderingBackend> SessionRegistry<B> {
    pub fn new(backend: Arc<B>, debounce: Duration) -> Self {
        Self {
            backend,
            debounce,
            sessions: DashMap::new(),
        }
    }

    pub async fn session(&self, parent_id: Uuid) -> Result<ReorderSession<B>, ReconcileError> {
        if let Some(session) = self.sessions.get(&parent_id) {
            return Ok(session.clone());
        }
        let opened = ReorderSession::open(self.backend.clone(), parent_id, self.debounce).await?;
        Ok(self.sessions.entry(parent_id).or_insert(opened).clone())
    }

    pub fn remove(&self, parent_id: Uuid) -> Option<ReorderSession<B>> {
        self.sessions.remove(&parent_id).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Backend that talks to the plan editor directly, acting as one user.
pub struct EditorBackend<F: OrderedFamily> {
    editor: PlanEditor,
    actor: Actor,
    _family: PhantomData<F>,
}

impl<F: OrderedFamily> EditorBackend<F> {
    pub fn new(editor: PlanEditor, actor: Actor) -> Self {
        Self {
            editor,
            actor,
            _family: PhantomData,
        }
    }
}

#[async_trait]
impl<F: OrderedFamily> OrderingBackend for EditorBackend<F> {
    async fn fetch(&self, parent_id: Uuid) -> Result<Vec<Uuid>, ReconcileError> {
        let rows = self
            .editor
            .list_children::<F>(&self.actor, parent_id)
            .await
            .map_err(reconcile_error)?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    async fn reorder(
        &self,
        parent_id: Uuid,
        ordered_ids: Vec<Uuid>,
    ) -> Result<Vec<Uuid>, ReconcileError> {
        let rows = self
            .editor
            .reorder_all::<F>(&self.actor, parent_id, &ordered_ids)
            .await
            .map_err(reconcile_error)?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }
}

fn reconcile_error(err: PlanEditorError) -> ReconcileError {
    match err {
        PlanEditorError::Database(e) | PlanEditorError::Ordering(OrderingError::Database(e)) => {
            ReconcileError::Transport(e.to_string())
        }
        other => ReconcileError::Rejected(other.to_string()),
    }
}
