//! HTTP client for the mailwright service.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::{ClientError, ClientResult};
use crate::models::draft::{AssistantKind, EmailDraft, GeneratedEmail, GenerationRequest};
use crate::models::email::{EmailUpdate, NewEmail, StoredEmail};
use crate::models::event::SseEvent;
use crate::sse::EventDecoder;

pub const DEFAULT_SERVER: &str = "http://localhost:3001";

/// Receives the events of one streamed generation
pub trait EventHandler {
    fn on_assistant_type(&mut self, kind: AssistantKind);
    fn on_subject(&mut self, subject: &str);
    fn on_body(&mut self, body: &str);
    fn on_complete(&mut self);
    fn on_error(&mut self, message: &str);
}

/// Keeps the latest state of a streamed draft
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftCollector {
    pub kind: Option<AssistantKind>,
    pub draft: EmailDraft,
    pub completed: bool,
    pub error: Option<String>,
}

impl DraftCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.completed || self.error.is_some()
    }
}

impl EventHandler for DraftCollector {
    fn on_assistant_type(&mut self, kind: AssistantKind) {
        self.kind = Some(kind);
    }

    fn on_subject(&mut self, subject: &str) {
        self.draft.subject = subject.to_string();
    }

    fn on_body(&mut self, body: &str) {
        self.draft.body = body.to_string();
    }

    fn on_complete(&mut self) {
        self.completed = true;
    }

    fn on_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }
}

/// Route one event to the matching callback
pub fn dispatch<H: EventHandler + ?Sized>(handler: &mut H, event: &SseEvent) {
    match event {
        SseEvent::AssistantType(kind) => handler.on_assistant_type(*kind),
        SseEvent::Subject(subject) => handler.on_subject(subject),
        SseEvent::Body(body) => handler.on_body(body),
        SseEvent::Complete => handler.on_complete(),
        SseEvent::Error(message) => handler.on_error(message),
    }
}

#[derive(Deserialize)]
struct EmailList {
    emails: Vec<StoredEmail>,
}

#[derive(Deserialize)]
struct EmailEnvelope {
    email: StoredEmail,
}

pub struct ComposeClient {
    client: Client,
    base_url: String,
}

impl ComposeClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request a streamed draft, feeding each event to `handler` as it arrives.
    ///
    /// Reading stops at the first `complete` or `error` event. A body that
    /// ends without one counts as complete. A server that answers with plain
    /// JSON instead of an event stream is handled as a single update.
    pub async fn stream_email<H: EventHandler + Send + ?Sized>(
        &self,
        request: &GenerationRequest,
        handler: &mut H,
    ) -> ClientResult<()> {
        let response = self
            .client
            .post(self.url("/ai/generate-email"))
            .json(request)
            .send()
            .await?;
        let mut response = ensure_success(response).await?;

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("text/event-stream"))
            .unwrap_or(false);

        if !is_event_stream {
            warn!("Response is not an event stream, reading it as one document");
            let body = response.bytes().await?;
            let value: Value = serde_json::from_slice(&body)?;
            dispatch_document(handler, &value);
            return Ok(());
        }

        let mut decoder = EventDecoder::new();
        while let Some(chunk) = response.chunk().await? {
            for event in decoder.feed(&chunk) {
                dispatch(handler, &event);
            }
            if decoder.is_finished() {
                return Ok(());
            }
        }

        debug!("Event stream ended without a terminal event");
        handler.on_complete();
        Ok(())
    }

    pub async fn generate_simple(&self, request: &GenerationRequest) -> ClientResult<GeneratedEmail> {
        let response = self
            .client
            .post(self.url("/ai/generate-email-simple"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn list_emails(&self) -> ClientResult<Vec<StoredEmail>> {
        let response = self.client.get(self.url("/emails")).send().await?;
        Ok(decode::<EmailList>(response).await?.emails)
    }

    pub async fn get_email(&self, id: &str) -> ClientResult<StoredEmail> {
        let response = self
            .client
            .get(self.url(&format!("/emails/{}", id)))
            .send()
            .await?;
        Ok(decode::<EmailEnvelope>(response).await?.email)
    }

    pub async fn create_email(&self, email: &NewEmail) -> ClientResult<StoredEmail> {
        let response = self
            .client
            .post(self.url("/emails"))
            .json(email)
            .send()
            .await?;
        Ok(decode::<EmailEnvelope>(response).await?.email)
    }

    pub async fn update_email(&self, id: &str, update: &EmailUpdate) -> ClientResult<StoredEmail> {
        let response = self
            .client
            .put(self.url(&format!("/emails/{}", id)))
            .json(update)
            .send()
            .await?;
        Ok(decode::<EmailEnvelope>(response).await?.email)
    }

    pub async fn delete_email(&self, id: &str) -> ClientResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("/emails/{}", id)))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Non-2xx responses become [`ClientError::Status`], preferring the
/// server's `{"error": ...}` message over the raw body
async fn ensure_success(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(text);
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let body = ensure_success(response).await?.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

fn dispatch_document<H: EventHandler + ?Sized>(handler: &mut H, value: &Value) {
    let kind = value
        .get("assistantType")
        .or_else(|| value.get("assistant_type"))
        .and_then(|kind| serde_json::from_value::<AssistantKind>(kind.clone()).ok());
    if let Some(kind) = kind {
        handler.on_assistant_type(kind);
    }

    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
    };
    if let Some(subject) = text("subject") {
        handler.on_subject(subject);
    }
    if let Some(body) = text("body") {
        handler.on_body(body);
    }
    handler.on_complete();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn event_stream(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/event-stream")
    }

    async fn stream_from(template: ResponseTemplate) -> (DraftCollector, ClientResult<()>) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ai/generate-email"))
            .respond_with(template)
            .mount(&server)
            .await;

        let client = ComposeClient::new(&server.uri()).unwrap();
        let mut collector = DraftCollector::new();
        let result = client
            .stream_email(&GenerationRequest::new("check in"), &mut collector)
            .await;
        (collector, result)
    }

    #[tokio::test]
    async fn test_stream_email() {
        let body = concat!(
            "data: {\"type\":\"assistant_type\",\"data\":\"sales\"}\n\n",
            ": keep-alive\n\n",
            "data: {\"type\":\"subject\",\"data\":\"Hi\"}\n\n",
            "data: not json\n\n",
            "data: {\"type\":\"body\",\"data\":\"Yo\"}\n\n",
            "data: {\"type\":\"complete\"}\n\n",
            "data: {\"type\":\"body\",\"data\":\"late\"}\n\n",
        );
        let (collector, result) = stream_from(event_stream(body)).await;

        result.unwrap();
        assert_eq!(collector.kind, Some(AssistantKind::Sales));
        assert_eq!(collector.draft, EmailDraft::new("Hi", "Yo"));
        assert!(collector.completed);
        assert!(collector.error.is_none());
    }

    #[tokio::test]
    async fn test_stream_error_event() {
        let body = concat!(
            "data: {\"type\":\"assistant_type\",\"data\":\"followup\"}\n\n",
            "data: {\"type\":\"error\",\"data\":\"Failed to generate email content\"}\n\n",
        );
        let (collector, result) = stream_from(event_stream(body)).await;

        result.unwrap();
        assert_eq!(collector.error.as_deref(), Some("Failed to generate email content"));
        assert!(!collector.completed);
    }

    #[tokio::test]
    async fn test_stream_without_terminal_event_completes() {
        let body = "data: {\"type\":\"subject\",\"data\":\"Hi\"}\n\ndata: {\"type\":\"bo";
        let (collector, result) = stream_from(event_stream(body)).await;

        result.unwrap();
        assert_eq!(collector.draft.subject, "Hi");
        assert_eq!(collector.draft.body, "");
        assert!(collector.completed);
    }

    #[tokio::test]
    async fn test_done_marker_completes() {
        let (collector, result) = stream_from(event_stream("data: [DONE]\n\n")).await;
        result.unwrap();
        assert!(collector.completed);
    }

    #[tokio::test]
    async fn test_plain_json_response() {
        let template = ResponseTemplate::new(200).set_body_json(json!({
            "assistant_type": "followup",
            "subject": "Checking in",
            "body": ""
        }));
        let (collector, result) = stream_from(template).await;

        result.unwrap();
        assert_eq!(collector.kind, Some(AssistantKind::Followup));
        assert_eq!(collector.draft, EmailDraft::new("Checking in", ""));
        assert!(collector.completed);
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let template =
            ResponseTemplate::new(400).set_body_json(json!({"error": "Prompt is required"}));
        let (collector, result) = stream_from(template).await;

        match result {
            Err(ClientError::Status { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "Prompt is required");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(collector, DraftCollector::new());
    }

    #[tokio::test]
    async fn test_generate_simple() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ai/generate-email-simple"))
            .and(body_json(json!({"prompt": "pitch", "recipientInfo": "Ana, CTO"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "assistantType": "sales",
                "subject": "Save 20%",
                "body": "Let's talk."
            })))
            .mount(&server)
            .await;

        let client = ComposeClient::new(&format!("{}/", server.uri())).unwrap();
        let email = client
            .generate_simple(&GenerationRequest::new("pitch").with_recipient("Ana, CTO"))
            .await
            .unwrap();
        assert_eq!(email.assistant_type, AssistantKind::Sales);
        assert_eq!(email.subject, "Save 20%");
    }

    fn stored(id: &str) -> Value {
        json!({
            "id": id,
            "to": "ana@example.com",
            "subject": "Hello",
            "body": "Body",
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_email_crud() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/emails"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"emails": [stored("1"), stored("2")]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"email": stored("3")})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/emails/3"))
            .and(body_json(json!({"subject": "New"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"email": stored("3")})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/emails/3"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/emails/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Email not found"})))
            .mount(&server)
            .await;

        let client = ComposeClient::new(&server.uri()).unwrap();

        let emails = client.list_emails().await.unwrap();
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[1].id, "2");

        let created = client
            .create_email(&NewEmail {
                to: "ana@example.com".into(),
                subject: "Hello".into(),
                body: "Body".into(),
                ..NewEmail::default()
            })
            .await
            .unwrap();
        assert_eq!(created.id, "3");

        let update = EmailUpdate {
            subject: Some("New".into()),
            ..EmailUpdate::default()
        };
        client.update_email("3", &update).await.unwrap();
        client.delete_email("3").await.unwrap();

        match client.get_email("missing").await {
            Err(ClientError::Status { status: 404, body }) => assert_eq!(body, "Email not found"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
