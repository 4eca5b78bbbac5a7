// Export route modules
pub mod emails;
pub mod generate;
pub mod status;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(status::routes())
        .merge(emails::routes(state.clone()))
        .merge(generate::routes(state))
}
