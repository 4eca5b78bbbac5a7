//! Non-streaming email generation and the canned drafts used when generation fails.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::draft::{AssistantKind, EmailDraft, GenerationRequest};
use crate::prompt_template::load_prompt_file;
use crate::providers::base::{GenerationOptions, Provider};

lazy_static! {
    static ref SUBJECT_LINE: Regex = Regex::new(r"(?i)SUBJECT:\s*(.+)").unwrap();
    static ref BODY_LINE: Regex = Regex::new(r"(?i)BODY:\s*(.+)").unwrap();
}

/// Canned subject and body for each assistant kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackTable {
    pub sales: EmailDraft,
    pub followup: EmailDraft,
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self {
            sales: EmailDraft::new(
                "Sales Opportunity",
                "Thank you for your interest. Let's connect!",
            ),
            followup: EmailDraft::new(
                "Follow-up",
                "I wanted to follow up on our previous conversation.",
            ),
        }
    }
}

impl FallbackTable {
    pub fn draft(&self, kind: AssistantKind) -> &EmailDraft {
        match kind {
            AssistantKind::Sales => &self.sales,
            AssistantKind::Followup => &self.followup,
        }
    }
}

#[derive(Serialize)]
struct DraftPromptContext<'a> {
    prompt: &'a str,
    recipient: Option<&'a str>,
    json: bool,
}

/// Render the kind-specific instruction. `json` selects a `{subject, body}`
/// object answer instead of `SUBJECT:`/`BODY:` lines.
pub fn draft_prompt(
    kind: AssistantKind,
    request: &GenerationRequest,
    json: bool,
) -> Result<String, tera::Error> {
    let template = match kind {
        AssistantKind::Sales => "sales.md",
        AssistantKind::Followup => "followup.md",
    };
    load_prompt_file(
        template,
        &DraftPromptContext {
            prompt: &request.prompt,
            recipient: request.recipient(),
            json,
        },
    )
}

pub fn temperature(kind: AssistantKind) -> f32 {
    match kind {
        AssistantKind::Sales => 0.7,
        AssistantKind::Followup => 0.6,
    }
}

/// Options for the streaming call, which also caps the answer length
pub fn stream_options(kind: AssistantKind) -> GenerationOptions {
    let max_output_tokens = match kind {
        AssistantKind::Sales => 150,
        AssistantKind::Followup => 200,
    };
    GenerationOptions::new(temperature(kind)).with_max_output_tokens(max_output_tokens)
}

/// Generate a whole draft in one call. Never fails: missing fields and
/// provider errors degrade to the canned draft for `kind`.
pub async fn generate_complete(
    provider: &dyn Provider,
    fallbacks: &FallbackTable,
    kind: AssistantKind,
    request: &GenerationRequest,
) -> EmailDraft {
    let fallback = fallbacks.draft(kind);

    let prompt = match draft_prompt(kind, request, false) {
        Ok(prompt) => prompt,
        Err(e) => {
            warn!("Failed to render {} prompt: {}", kind, e);
            return fallback.clone();
        }
    };

    match provider
        .complete(&prompt, &GenerationOptions::new(temperature(kind)))
        .await
    {
        Ok(text) => {
            debug!("{} assistant response: {:?}", kind, text);
            parse_line_format(&text, fallback)
        }
        Err(e) => {
            warn!("{} assistant failed, using canned draft: {}", kind, e);
            fallback.clone()
        }
    }
}

/// Pull `SUBJECT:` and `BODY:` out of a response, one line each.
/// A field that is missing or blank takes the fallback's value.
pub fn parse_line_format(text: &str, fallback: &EmailDraft) -> EmailDraft {
    let field = |pattern: &Regex, default: &str| {
        pattern
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().trim())
            .filter(|value| !value.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    EmailDraft {
        subject: field(&SUBJECT_LINE, &fallback.subject),
        body: field(&BODY_LINE, &fallback.body),
    }
}
