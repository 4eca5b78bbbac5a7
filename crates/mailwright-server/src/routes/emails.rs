use crate::{error::ApiError, state::AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use mailwright::models::email::{EmailUpdate, NewEmail};
use serde_json::{json, Value};

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let emails = state.store.list().await?;
    Ok(Json(json!({ "emails": emails })))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let email = state.store.get(&id).await?;
    Ok(Json(json!({ "email": email })))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewEmail>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let email = state.store.create(body(payload)?).await?;
    tracing::info!("Created email {}", email.id);
    Ok((StatusCode::CREATED, Json(json!({ "email": email }))))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EmailUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let email = state.store.update(&id, body(payload)?).await?;
    Ok(Json(json!({ "email": email })))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(&id).await?;
    tracing::info!("Deleted email {}", id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/emails", get(list).post(create))
        .route("/emails/:id", get(show).put(update).delete(remove))
        .with_state(state)
}
