mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use mailwright::client::{ComposeClient, DEFAULT_SERVER};

use commands::compose::ComposeOptions;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the mailwright server
    #[arg(long, global = true, env = "MAILWRIGHT_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List stored emails
    List,

    /// Show one stored email
    Show { id: String },

    /// Store a new email
    Create {
        #[arg(long)]
        to: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
        #[arg(long)]
        cc: Option<String>,
        #[arg(long)]
        bcc: Option<String>,
    },

    /// Change fields of a stored email
    Edit {
        id: String,
        #[command(flatten)]
        fields: EditFields,
    },

    /// Delete a stored email
    Delete { id: String },

    /// Draft an email with the AI assistant
    Compose {
        /// What the email should say; asked for when omitted
        prompt: Option<String>,

        /// Who the email is for, used as extra context
        #[arg(long)]
        recipient: Option<String>,

        /// Wait for the whole draft instead of streaming it
        #[arg(long)]
        simple: bool,

        /// Save the draft as an email to this address
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Args)]
struct EditFields {
    #[arg(long)]
    to: Option<String>,
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    body: Option<String>,
    #[arg(long)]
    cc: Option<String>,
    #[arg(long)]
    bcc: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ComposeClient::new(&cli.server)?;

    match cli.command {
        Command::List => commands::emails::list(&client).await,
        Command::Show { id } => commands::emails::show(&client, &id).await,
        Command::Create {
            to,
            subject,
            body,
            cc,
            bcc,
        } => commands::emails::create(&client, to, subject, body, cc, bcc).await,
        Command::Edit { id, fields } => {
            commands::emails::edit(
                &client,
                &id,
                mailwright::models::email::EmailUpdate {
                    to: fields.to,
                    cc: fields.cc,
                    bcc: fields.bcc,
                    subject: fields.subject,
                    body: fields.body,
                },
            )
            .await
        }
        Command::Delete { id } => commands::emails::delete(&client, &id).await,
        Command::Compose {
            prompt,
            recipient,
            simple,
            to,
        } => {
            commands::compose::execute(
                &client,
                ComposeOptions {
                    prompt,
                    recipient,
                    simple,
                    to,
                },
            )
            .await
        }
    }
}
