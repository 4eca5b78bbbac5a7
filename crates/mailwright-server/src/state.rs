use mailwright::composer::Composer;
use mailwright::store::EmailStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub composer: Composer,
    pub store: Arc<dyn EmailStore>,
}

impl AppState {
    pub fn new(composer: Composer, store: Arc<dyn EmailStore>) -> Self {
        Self { composer, store }
    }
}
