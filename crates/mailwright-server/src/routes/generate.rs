use crate::{error::ApiError, state::AppState};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::{stream::StreamExt, Stream};
use mailwright::{
    composer::STREAM_FAILURE_MESSAGE,
    models::draft::{GeneratedEmail, GenerationRequest},
    sse,
};
use serde::Deserialize;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

// Incoming body; `prompt` is optional here so a missing one gets our own 400
#[derive(Debug, Deserialize)]
struct GenerateBody {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default, rename = "recipientInfo")]
    recipient_info: Option<String>,
}

impl GenerateBody {
    fn into_request(self) -> Result<GenerationRequest, ApiError> {
        let prompt = self
            .prompt
            .filter(|prompt| !prompt.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("Prompt is required".to_string()))?;

        Ok(GenerationRequest {
            prompt,
            recipient_info: self.recipient_info,
        })
    }
}

fn parse_request(
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<GenerationRequest, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::warn!("Rejected generation request: {}", rejection);
        ApiError::BadRequest(rejection.body_text())
    })?;
    body.into_request()
}

/// Streams already framed SSE records to the client
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
            ],
            Body::from_stream(self),
        )
            .into_response()
    }
}

async fn handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<SseResponse, ApiError> {
    let request = parse_request(payload)?;

    let classified = state.composer.classify(request).await;
    tracing::info!("Streaming {} email", classified.kind);

    let upstream = state
        .composer
        .open_stream(&classified)
        .await
        .map_err(|e| {
            tracing::error!("Failed to start generation stream: {}", e);
            ApiError::Internal(STREAM_FAILURE_MESSAGE.to_string())
        })?;
    let mut events = state.composer.events(classified, upstream);

    // Create channel for streaming
    let (tx, rx) = mpsc::channel(100);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.next() => {
                    let Some(event) = event else {
                        break;
                    };
                    if let Err(e) = tx.send(sse::encode(&event)).await {
                        tracing::warn!("Client went away mid-stream: {}", e);
                        break;
                    }
                }
                _ = tx.closed() => {
                    tracing::info!("Client disconnected, stopping generation");
                    break;
                }
            }
        }
    });

    Ok(SseResponse::new(ReceiverStream::new(rx)))
}

// Whole draft in one JSON response
async fn simple_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<GeneratedEmail>, ApiError> {
    let request = parse_request(payload)?;
    let email = state.composer.compose(request).await;
    tracing::info!("Generated {} email", email.assistant_type);
    Ok(Json(email))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/ai/generate-email", post(handler))
        .route("/ai/generate-email-simple", post(simple_handler))
        .with_state(state)
}
