use reqwest::Response;
use serde_json::Value;
use tracing::warn;

use super::base::FragmentStream;
use crate::errors::{ProviderError, ProviderResult};
use crate::sse::SseLineDecoder;

/// Pulls the text out of one upstream payload. `Ok(None)` means the payload
/// carried no text (usage metadata, role announcements and the like).
pub type TextExtractor = fn(&Value) -> ProviderResult<Option<String>>;

/// Turn a non-success response into a `ProviderError::Status`, keeping the body for the log
pub async fn ensure_success(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Read an upstream SSE response body as a stream of text fragments.
///
/// Payloads that are not JSON are skipped; `[DONE]` ends the stream.
pub fn sse_text_fragments(mut response: Response, extract: TextExtractor) -> FragmentStream {
    Box::pin(async_stream::try_stream! {
        let mut lines = SseLineDecoder::new();
        'read: while let Some(chunk) = response.chunk().await? {
            for payload in lines.feed(&chunk) {
                if payload == "[DONE]" {
                    break 'read;
                }
                let value: Value = match serde_json::from_str(&payload) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!("Skipping unparseable upstream payload: {}", e);
                        continue;
                    }
                };
                if let Some(text) = extract(&value)? {
                    if !text.is_empty() {
                        yield text;
                    }
                }
            }
        }
    })
}

/// An `{"error": {...}}` body sent with a success status
pub fn check_error_payload(value: &Value) -> ProviderResult<()> {
    match value.get("error") {
        Some(error) => Err(ProviderError::Malformed(format!(
            "generation service reported an error: {}",
            error
        ))),
        None => Ok(()),
    }
}
