use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::{StoreError, StoreResult};
use crate::models::email::{EmailUpdate, NewEmail, StoredEmail};

/// Persistence for composed emails
#[async_trait]
pub trait EmailStore: Send + Sync {
    /// All emails in creation order
    async fn list(&self) -> StoreResult<Vec<StoredEmail>>;

    async fn get(&self, id: &str) -> StoreResult<StoredEmail>;

    /// Store a new email; `to`, `subject` and `body` must be non-empty
    async fn create(&self, email: NewEmail) -> StoreResult<StoredEmail>;

    async fn update(&self, id: &str, update: EmailUpdate) -> StoreResult<StoredEmail>;

    async fn delete(&self, id: &str) -> StoreResult<()>;
}

/// Process-local store; contents are lost on restart
#[derive(Debug, Default)]
pub struct InMemoryEmailStore {
    emails: RwLock<Vec<StoredEmail>>,
}

impl InMemoryEmailStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EmailStore for InMemoryEmailStore {
    async fn list(&self) -> StoreResult<Vec<StoredEmail>> {
        Ok(self.emails.read().await.clone())
    }

    async fn get(&self, id: &str) -> StoreResult<StoredEmail> {
        self.emails
            .read()
            .await
            .iter()
            .find(|email| email.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create(&self, email: NewEmail) -> StoreResult<StoredEmail> {
        if !email.is_complete() {
            return Err(StoreError::MissingFields);
        }
        let stored = email.into_stored();
        debug!("Storing email {}", stored.id);
        self.emails.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: &str, update: EmailUpdate) -> StoreResult<StoredEmail> {
        let mut emails = self.emails.write().await;
        let email = emails
            .iter_mut()
            .find(|email| email.id == id)
            .ok_or(StoreError::NotFound)?;
        update.apply(email);
        Ok(email.clone())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut emails = self.emails.write().await;
        let index = emails
            .iter()
            .position(|email| email.id == id)
            .ok_or(StoreError::NotFound)?;
        emails.remove(index);
        Ok(())
    }
}
