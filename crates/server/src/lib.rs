use db::DBService;
use services::services::{config::ReconcileConfig, plan_editor::PlanEditor};

pub mod error;
pub mod extract;
pub mod routes;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct DeploymentImpl {
    editor: PlanEditor,
    reconcile: ReconcileConfig,
}

impl DeploymentImpl {
    pub fn new(db: DBService, reconcile: ReconcileConfig) -> Self {
        let editor = PlanEditor::new(db.pool.clone());
        Self { editor, reconcile }
    }

    pub fn editor(&self) -> &PlanEditor {
        &self.editor
    }

    pub fn reconcile_config(&self) -> ReconcileConfig {
        self.reconcile
    }
}
