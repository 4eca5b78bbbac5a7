use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// An email kept by the email store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEmail {
    pub id: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating an email. Missing or null text fields
/// become empty so that validation, not deserialization, reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmail {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subject: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl NewEmail {
    pub fn is_complete(&self) -> bool {
        !self.to.trim().is_empty() && !self.subject.trim().is_empty() && !self.body.trim().is_empty()
    }

    pub(crate) fn into_stored(self) -> StoredEmail {
        let now = Utc::now();
        StoredEmail {
            id: Uuid::new_v4().to_string(),
            to: self.to,
            cc: self.cc,
            bcc: self.bcc,
            subject: self.subject,
            body: self.body,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl EmailUpdate {
    pub(crate) fn apply(self, email: &mut StoredEmail) {
        if let Some(to) = self.to {
            email.to = to;
        }
        if let Some(cc) = self.cc {
            email.cc = Some(cc);
        }
        if let Some(bcc) = self.bcc {
            email.bcc = Some(bcc);
        }
        if let Some(subject) = self.subject {
            email.subject = subject;
        }
        if let Some(body) = self.body {
            email.body = body;
        }
        email.updated_at = Utc::now();
    }
}
