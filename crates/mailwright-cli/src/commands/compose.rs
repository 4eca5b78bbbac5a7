use anyhow::{bail, Result};
use cliclack::{input, spinner};
use console::style;
use mailwright::client::{ComposeClient, DraftCollector, EventHandler};
use mailwright::models::draft::{AssistantKind, EmailDraft, GenerationRequest};
use mailwright::models::email::NewEmail;

pub struct ComposeOptions {
    pub prompt: Option<String>,
    pub recipient: Option<String>,
    pub simple: bool,
    pub to: Option<String>,
}

/// Prints each update of a streamed draft as it arrives
#[derive(Default)]
struct LiveDraft {
    state: DraftCollector,
    lines: Vec<String>,
}

impl LiveDraft {
    fn emit(&mut self, line: String) {
        println!("{}", line);
        self.lines.push(line);
    }
}

impl EventHandler for LiveDraft {
    fn on_assistant_type(&mut self, kind: AssistantKind) {
        self.state.on_assistant_type(kind);
        self.emit(format!("{} {} assistant", style("●").cyan(), kind));
    }

    fn on_subject(&mut self, subject: &str) {
        self.state.on_subject(subject);
        self.emit(format!("{} {}", style("subject:").bold(), subject));
    }

    fn on_body(&mut self, body: &str) {
        self.state.on_body(body);
        self.emit(format!("{} {}", style("body:").bold(), body));
    }

    fn on_complete(&mut self) {
        self.state.on_complete();
    }

    fn on_error(&mut self, message: &str) {
        self.state.on_error(message);
        self.emit(format!("{} {}", style("error:").red().bold(), message));
    }
}

pub async fn execute(client: &ComposeClient, options: ComposeOptions) -> Result<()> {
    let prompt = match options.prompt {
        Some(prompt) => prompt,
        None => input("What should the email say?")
            .placeholder("Follow up with Dana about the Q3 report")
            .interact()?,
    };
    let mut request = GenerationRequest::new(prompt);
    if let Some(recipient) = options.recipient {
        request = request.with_recipient(recipient);
    }

    let draft = if options.simple {
        let spin = spinner();
        spin.start("drafting email");
        let email = client.generate_simple(&request).await;
        spin.stop("");
        let email = email?;

        println!("{} {} assistant", style("●").cyan(), email.assistant_type);
        println!("{} {}", style("subject:").bold(), email.subject);
        println!("{} {}", style("body:").bold(), email.body);
        email.draft()
    } else {
        let mut live = LiveDraft::default();
        client.stream_email(&request, &mut live).await?;
        if let Some(message) = live.state.error {
            bail!("Generation failed: {}", message);
        }
        live.state.draft
    };

    if let Some(to) = options.to {
        save(client, to, draft).await?;
    }
    Ok(())
}

async fn save(client: &ComposeClient, to: String, draft: EmailDraft) -> Result<()> {
    let email = client
        .create_email(&NewEmail {
            to,
            subject: draft.subject,
            body: draft.body,
            ..NewEmail::default()
        })
        .await?;
    println!("{} {}", style("Saved as").green().bold(), email.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_draft_tracks_latest_values() {
        console::set_colors_enabled(false);
        let mut live = LiveDraft::default();

        live.on_assistant_type(AssistantKind::Sales);
        live.on_subject("Draft");
        live.on_subject("Final subject");
        live.on_body("Let's talk.");
        live.on_complete();

        assert_eq!(live.state.kind, Some(AssistantKind::Sales));
        assert_eq!(live.state.draft, EmailDraft::new("Final subject", "Let's talk."));
        assert!(live.state.is_finished());
        assert_eq!(
            live.lines,
            vec![
                "● sales assistant",
                "subject: Draft",
                "subject: Final subject",
                "body: Let's talk.",
            ]
        );
    }

    #[test]
    fn test_live_draft_error() {
        let mut live = LiveDraft::default();
        live.on_error("Failed to generate email content");
        assert_eq!(
            live.state.error.as_deref(),
            Some("Failed to generate email content")
        );
        assert!(!live.state.completed);
    }
}
