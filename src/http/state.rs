use crate::archive::ArchivalReconciler;
use crate::session::SessionController;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,

    pub reconciler: Arc<ArchivalReconciler>,

    /// Agent used when a start request names none
    pub default_agent_id: String,
}

impl AppState {
    pub fn new(controller: Arc<SessionController>, default_agent_id: impl Into<String>) -> Self {
        let reconciler = Arc::clone(controller.reconciler());

        Self {
            controller,
            reconciler,
            default_agent_id: default_agent_id.into(),
        }
    }
}
