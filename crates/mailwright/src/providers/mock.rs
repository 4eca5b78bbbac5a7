use async_trait::async_trait;
use futures::future;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::base::{FragmentStream, GenerationOptions, Provider};
use crate::errors::{ProviderError, ProviderResult};

/// One scripted answer from [`MockProvider`]
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Whole response text; streamed as a single fragment
    Text(String),
    /// Streamed fragment by fragment; joined for `complete`
    Fragments(Vec<String>),
    /// The call itself fails
    Fail(String),
    /// Streams the fragments, then fails mid-stream
    Broken(Vec<String>),
    /// Streams the fragments, then never produces anything again.
    /// `complete` never returns.
    Stall(Vec<String>),
}

impl MockReply {
    pub fn text<S: Into<String>>(text: S) -> Self {
        MockReply::Text(text.into())
    }

    pub fn fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockReply::Fragments(fragments.into_iter().map(Into::into).collect())
    }
}

/// A provider that returns pre-configured replies in order, for tests and offline runs.
///
/// Every prompt it receives is recorded and can be inspected with [`MockProvider::prompts`].
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    live_streams: Arc<AtomicUsize>,
}

/// Held by each stream handed out; counts it as live until dropped
#[derive(Debug)]
struct LiveStream(Arc<AtomicUsize>);

impl LiveStream {
    fn new(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(count))
    }
}

impl Drop for LiveStream {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProvider {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            prompts: Arc::default(),
            live_streams: Arc::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Streams handed out by [`Provider::stream`] that have not been dropped yet
    pub fn live_streams(&self) -> usize {
        self.live_streams.load(Ordering::SeqCst)
    }

    fn next_reply(&self, prompt: &str) -> Option<MockReply> {
        lock(&self.prompts).push(prompt.to_string());
        lock(&self.replies).pop_front()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, prompt: &str, _options: &GenerationOptions) -> ProviderResult<String> {
        match self.next_reply(prompt) {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fragments(fragments)) | Some(MockReply::Broken(fragments)) => {
                Ok(fragments.concat())
            }
            Some(MockReply::Stall(_)) => future::pending().await,
            Some(MockReply::Fail(reason)) => Err(ProviderError::Internal(reason)),
            None => Err(ProviderError::EmptyResponse),
        }
    }

    async fn stream(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> ProviderResult<FragmentStream> {
        let fragments = |fragments: Vec<String>| stream::iter(fragments.into_iter().map(Ok));

        let reply = self.next_reply(prompt);
        let live = LiveStream::new(&self.live_streams);
        let tracked = |stream: FragmentStream| {
            stream
                .map(move |item| {
                    let _live = &live;
                    item
                })
                .boxed()
        };

        match reply {
            Some(MockReply::Text(text)) => Ok(tracked(fragments(vec![text]).boxed())),
            Some(MockReply::Fragments(parts)) => Ok(tracked(fragments(parts).boxed())),
            Some(MockReply::Broken(parts)) => Ok(tracked(
                fragments(parts)
                    .chain(stream::once(async {
                        Err(ProviderError::Internal("connection reset".to_string()))
                    }))
                    .boxed(),
            )),
            Some(MockReply::Stall(parts)) => {
                Ok(tracked(fragments(parts).chain(stream::pending()).boxed()))
            }
            Some(MockReply::Fail(reason)) => Err(ProviderError::Internal(reason)),
            None => Err(ProviderError::EmptyResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order() {
        let provider = MockProvider::new(vec![
            MockReply::text("first"),
            MockReply::fragments(["a", "b"]),
            MockReply::Fail("down".into()),
        ]);
        let options = GenerationOptions::default();

        assert_eq!(provider.complete("p1", &options).await.unwrap(), "first");
        let streamed: Vec<_> = provider
            .stream("p2", &options)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(streamed.len(), 2);
        assert!(provider.complete("p3", &options).await.is_err());
        assert!(matches!(
            provider.complete("p4", &options).await,
            Err(ProviderError::EmptyResponse)
        ));
        assert_eq!(provider.prompts(), vec!["p1", "p2", "p3", "p4"]);
    }

    #[tokio::test]
    async fn test_live_streams_counted_until_dropped() {
        let provider = MockProvider::new(vec![MockReply::Stall(vec!["x".into()])]);
        let mut stream = provider
            .stream("p", &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "x");
        assert_eq!(provider.live_streams(), 1);

        drop(stream);
        assert_eq!(provider.live_streams(), 0);
    }

    #[tokio::test]
    async fn test_broken_stream_ends_with_error() {
        let provider = MockProvider::new(vec![MockReply::Broken(vec!["x".into()])]);
        let items: Vec<_> = provider
            .stream("p", &GenerationOptions::default())
            .await
            .unwrap()
            .collect()
            .await;
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }
}
