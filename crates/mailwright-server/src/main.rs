mod configuration;
mod error;
mod routes;
mod state;

use http::HeaderValue;
use mailwright::{composer::Composer, providers::factory, store::InMemoryEmailStore};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

fn cors_layer(allowed_origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    Ok(match allowed_origin {
        Some(origin) => cors.allow_origin(HeaderValue::from_str(origin)?),
        None => cors.allow_origin(Any),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    // Load configuration
    let settings = configuration::Settings::new()?;
    info!(
        "Using {} provider",
        settings.provider.provider_type()
    );

    let provider = factory::get_provider(settings.provider.into_config())?;
    let composer =
        Composer::new(provider).with_upstream_timeout(settings.generation.upstream_timeout());
    let state = state::AppState::new(composer, Arc::new(InMemoryEmailStore::new()));

    let app = routes::configure(state).layer(cors_layer(settings.server.allowed_origin.as_deref())?);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()?).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
