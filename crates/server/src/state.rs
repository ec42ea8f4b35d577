use std::sync::Arc;

use checkmp_upstream::MediaService;

use crate::catalog::Catalog;
use crate::reconcile::Reconciler;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Reconciler,
    pub catalog: Catalog,
}

impl AppState {
    pub fn new(service: Arc<dyn MediaService>) -> Self {
        Self {
            reconciler: Reconciler::new(service.clone()),
            catalog: Catalog::new(service),
        }
    }
}
