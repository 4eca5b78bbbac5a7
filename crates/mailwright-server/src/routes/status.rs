use axum::{routing::get, Router};

async fn ping() -> &'static str {
    "pong\n"
}

pub fn routes() -> Router {
    Router::new().route("/ping", get(ping))
}
