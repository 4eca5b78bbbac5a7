//! One generation cycle: classify, then stream or generate the draft.

use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::classifier;
use crate::errors::{ProviderError, ProviderResult};
use crate::extraction::ExtractionState;
use crate::generator::{self, FallbackTable};
use crate::models::draft::{AssistantKind, EmailDraft, GeneratedEmail, GenerationRequest};
use crate::models::event::SseEvent;
use crate::providers::base::{FragmentStream, Provider};

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Message carried by the terminal `Error` event
pub const STREAM_FAILURE_MESSAGE: &str = "Failed to generate email content";

/// A request together with the assistant chosen for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub request: GenerationRequest,
    pub kind: AssistantKind,
}

/// Drives classification and generation against a [`Provider`]
#[derive(Clone)]
pub struct Composer {
    provider: Arc<dyn Provider>,
    fallbacks: Arc<FallbackTable>,
    upstream_timeout: Duration,
}

impl Composer {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            fallbacks: Arc::new(FallbackTable::default()),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    pub fn with_fallbacks(mut self, fallbacks: FallbackTable) -> Self {
        self.fallbacks = Arc::new(fallbacks);
        self
    }

    /// Longest wait for any upstream call. A stream that goes quiet this long
    /// is treated as finished.
    pub fn with_upstream_timeout(mut self, upstream_timeout: Duration) -> Self {
        self.upstream_timeout = upstream_timeout;
        self
    }

    pub fn fallbacks(&self) -> &FallbackTable {
        &self.fallbacks
    }

    /// Pick the assistant; a router call that outlasts the upstream timeout
    /// counts as a failed one and gives `Followup`
    pub async fn classify(&self, request: GenerationRequest) -> Classified {
        let routing = classifier::classify(self.provider.as_ref(), &request.prompt);
        let kind = match timeout(self.upstream_timeout, routing).await {
            Ok(kind) => kind,
            Err(_) => {
                warn!(
                    "Classification took longer than {:?}, defaulting to followup",
                    self.upstream_timeout
                );
                AssistantKind::Followup
            }
        };
        Classified { request, kind }
    }

    /// Non-streaming draft for an already classified request
    pub async fn generate(&self, classified: &Classified) -> GeneratedEmail {
        let draft = self.draft(classified.kind, &classified.request).await;
        GeneratedEmail::new(classified.kind, draft)
    }

    /// Classify and generate in one call
    pub async fn compose(&self, request: GenerationRequest) -> GeneratedEmail {
        let classified = self.classify(request).await;
        self.generate(&classified).await
    }

    /// Start the streaming call. Failing here means no event has been sent yet.
    pub async fn open_stream(&self, classified: &Classified) -> ProviderResult<FragmentStream> {
        let prompt = generator::draft_prompt(classified.kind, &classified.request, true)
            .map_err(|e| ProviderError::Internal(format!("Failed to render prompt: {}", e)))?;
        let options = generator::stream_options(classified.kind);

        timeout(self.upstream_timeout, self.provider.stream(&prompt, &options))
            .await
            .map_err(|_| ProviderError::Timeout(self.upstream_timeout))?
    }

    /// Events for one streaming cycle: the assistant type first, then fields
    /// as they complete, then exactly one terminal event.
    ///
    /// Fields the stream never produced are filled by a non-streaming
    /// generation. An upstream error ends the cycle with `Error` instead.
    pub fn events(
        &self,
        classified: Classified,
        mut fragments: FragmentStream,
    ) -> BoxStream<'static, SseEvent> {
        let composer = self.clone();

        Box::pin(async_stream::stream! {
            let Classified { request, kind } = classified;
            yield SseEvent::AssistantType(kind);

            let mut state = ExtractionState::new();
            let mut failed = false;
            loop {
                match timeout(composer.upstream_timeout, fragments.next()).await {
                    Ok(Some(Ok(fragment))) => {
                        for event in state.push(&fragment) {
                            yield event;
                        }
                    }
                    Ok(Some(Err(e))) => {
                        error!("Generation stream failed: {}", e);
                        failed = true;
                        break;
                    }
                    Ok(None) => break,
                    Err(_) => {
                        warn!(
                            "No fragment for {:?}, finishing with what was received",
                            composer.upstream_timeout
                        );
                        break;
                    }
                }
            }
            drop(fragments);

            if failed {
                yield SseEvent::Error(STREAM_FAILURE_MESSAGE.to_string());
            } else {
                if !state.is_complete() {
                    info!(
                        subject = state.has_subject(),
                        body = state.has_body(),
                        "Stream left fields unset, generating the rest"
                    );
                    debug!("Streamed text: {:?}", state.raw());
                    let draft = match timeout(composer.upstream_timeout, composer.draft(kind, &request)).await {
                        Ok(draft) => draft,
                        Err(_) => {
                            warn!("Fallback generation timed out, using canned draft");
                            composer.fallbacks.draft(kind).clone()
                        }
                    };
                    for event in state.fill_missing(&draft) {
                        yield event;
                    }
                }
                yield SseEvent::Complete;
            }
        })
    }

    async fn draft(&self, kind: AssistantKind, request: &GenerationRequest) -> EmailDraft {
        generator::generate_complete(self.provider.as_ref(), &self.fallbacks, kind, request).await
    }
}
