use anyhow::Result;
use console::style;
use mailwright::client::ComposeClient;
use mailwright::models::email::{EmailUpdate, NewEmail, StoredEmail};

pub fn render(email: &StoredEmail) -> String {
    let mut lines = vec![
        format!("{} {}", style("id:").dim(), email.id),
        format!("{} {}", style("to:").bold(), email.to),
    ];
    if let Some(cc) = &email.cc {
        lines.push(format!("{} {}", style("cc:").bold(), cc));
    }
    if let Some(bcc) = &email.bcc {
        lines.push(format!("{} {}", style("bcc:").bold(), bcc));
    }
    lines.push(format!("{} {}", style("subject:").bold(), email.subject));
    lines.push(String::new());
    lines.push(email.body.clone());
    lines.join("\n")
}

pub async fn list(client: &ComposeClient) -> Result<()> {
    let emails = client.list_emails().await?;
    if emails.is_empty() {
        println!("{}", style("No emails yet").dim());
        return Ok(());
    }

    for email in emails {
        println!(
            "{}  {}  {}",
            style(&email.id).dim(),
            style(&email.to).cyan(),
            email.subject
        );
    }
    Ok(())
}

pub async fn show(client: &ComposeClient, id: &str) -> Result<()> {
    let email = client.get_email(id).await?;
    println!("{}", render(&email));
    Ok(())
}

pub async fn create(
    client: &ComposeClient,
    to: String,
    subject: String,
    body: String,
    cc: Option<String>,
    bcc: Option<String>,
) -> Result<()> {
    let email = client
        .create_email(&NewEmail {
            to,
            cc,
            bcc,
            subject,
            body,
        })
        .await?;
    println!("{} {}", style("Created").green().bold(), email.id);
    Ok(())
}

pub async fn edit(client: &ComposeClient, id: &str, update: EmailUpdate) -> Result<()> {
    let email = client.update_email(id, &update).await?;
    println!("{}", render(&email));
    Ok(())
}

pub async fn delete(client: &ComposeClient, id: &str) -> Result<()> {
    client.delete_email(id).await?;
    println!("{} {}", style("Deleted").green().bold(), id);
    Ok(())
}
