use serde_json::json;
use tracing::{debug, warn};

use crate::models::draft::AssistantKind;
use crate::prompt_template::load_prompt_file;
use crate::providers::base::{GenerationOptions, Provider};

pub const CLASSIFY_TEMPERATURE: f32 = 0.1;

/// Decide which assistant should handle a request.
///
/// Never fails: any provider error or empty answer classifies as `Followup`.
pub async fn classify(provider: &dyn Provider, prompt: &str) -> AssistantKind {
    let router_prompt = match load_prompt_file("classify.md", &json!({ "prompt": prompt })) {
        Ok(router_prompt) => router_prompt,
        Err(e) => {
            warn!("Failed to render classification prompt, defaulting to followup: {}", e);
            return AssistantKind::Followup;
        }
    };

    match provider
        .complete(&router_prompt, &GenerationOptions::new(CLASSIFY_TEMPERATURE))
        .await
    {
        Ok(answer) => {
            let kind = interpret(&answer);
            debug!("Classified {:?} as {}", answer.trim(), kind);
            kind
        }
        Err(e) => {
            warn!("Classification failed, defaulting to followup: {}", e);
            AssistantKind::Followup
        }
    }
}

/// Map the classifier's free-text answer onto an assistant kind
pub fn interpret(answer: &str) -> AssistantKind {
    if answer.to_lowercase().contains("sales") {
        AssistantKind::Sales
    } else {
        AssistantKind::Followup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::{MockProvider, MockReply};

    #[test]
    fn test_interpret() {
        assert_eq!(interpret("sales"), AssistantKind::Sales);
        assert_eq!(interpret("  SALES.\n"), AssistantKind::Sales);
        assert_eq!(interpret("This is a sales email"), AssistantKind::Sales);
        assert_eq!(interpret("followup"), AssistantKind::Followup);
        assert_eq!(interpret(""), AssistantKind::Followup);
        assert_eq!(interpret("no idea"), AssistantKind::Followup);
    }

    #[tokio::test]
    async fn test_sales_pitch_classifies_as_sales() {
        let provider = MockProvider::new(vec![MockReply::text("sales")]);
        let kind = classify(&provider, "Write a sales pitch for our CRM").await;
        assert_eq!(kind, AssistantKind::Sales);

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Request: \"Write a sales pitch for our CRM\""));
    }

    #[tokio::test]
    async fn test_check_in_classifies_as_followup() {
        let provider = MockProvider::new(vec![MockReply::text("followup")]);
        let kind = classify(&provider, "Just checking in on our last conversation").await;
        assert_eq!(kind, AssistantKind::Followup);
    }

    #[tokio::test]
    async fn test_provider_failure_defaults_to_followup() {
        let provider = MockProvider::new(vec![MockReply::Fail("quota exceeded".into())]);
        let kind = classify(&provider, "Write a sales pitch for our CRM").await;
        assert_eq!(kind, AssistantKind::Followup);
    }

    #[tokio::test]
    async fn test_empty_answer_defaults_to_followup() {
        let provider = MockProvider::new(vec![MockReply::text("   ")]);
        assert_eq!(classify(&provider, "anything").await, AssistantKind::Followup);
    }
}
