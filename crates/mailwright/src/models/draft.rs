use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Which assistant writes the email. Decided once per request by the classifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssistantKind {
    Sales,
    Followup,
}

/// Input to one generation cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(
        rename = "recipientInfo",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub recipient_info: Option<String>,
}

impl GenerationRequest {
    pub fn new<S: Into<String>>(prompt: S) -> Self {
        Self {
            prompt: prompt.into(),
            recipient_info: None,
        }
    }

    pub fn with_recipient<S: Into<String>>(mut self, recipient_info: S) -> Self {
        self.recipient_info = Some(recipient_info.into());
        self
    }

    /// Recipient context, treating blank text as absent
    pub fn recipient(&self) -> Option<&str> {
        self.recipient_info
            .as_deref()
            .map(str::trim)
            .filter(|info| !info.is_empty())
    }
}

/// Subject and body of an email being composed. Either may still be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
}

impl EmailDraft {
    pub fn new<S: Into<String>, T: Into<String>>(subject: S, body: T) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Result of the non-streaming generation endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedEmail {
    #[serde(alias = "assistant_type")]
    pub assistant_type: AssistantKind,
    pub subject: String,
    pub body: String,
}

impl GeneratedEmail {
    pub fn new(assistant_type: AssistantKind, draft: EmailDraft) -> Self {
        Self {
            assistant_type,
            subject: draft.subject,
            body: draft.body,
        }
    }

    pub fn draft(&self) -> EmailDraft {
        EmailDraft::new(&self.subject, &self.body)
    }
}
