use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::access::Identity;
use crate::cli::output::output_object;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::{self, PgSessionStore};
use crate::store::SessionStore;

#[derive(Subcommand)]
pub enum SessionCommands {
    #[command(about = "Open a session for a user and print the cookie values")]
    Open {
        #[arg(help = "User id")]
        user_id: Uuid,
        #[arg(long, help = "Email to embed in the access token")]
        email: Option<String>,
    },

    #[command(about = "Revoke every live session of a user")]
    Revoke {
        #[arg(help = "User id")]
        user_id: Uuid,
    },
}

pub async fn handle(cmd: SessionCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let pool = database::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    let store = PgSessionStore::from_config(pool, &config.session)?;

    match cmd {
        SessionCommands::Open { user_id, email } => {
            let identity = match email {
                Some(email) => Identity::new(user_id).with_email(email),
                None => Identity::new(user_id),
            };
            let credential = store.open(&identity).await?;

            output_object(
                &output_format,
                &format!("Session opened for {}", user_id),
                json!({
                    config.session.access_cookie.as_str(): credential.access_token,
                    config.session.refresh_cookie.as_str(): credential.refresh_token,
                }),
            )
        }
        SessionCommands::Revoke { user_id } => {
            store.invalidate(&Identity::new(user_id)).await?;
            output_object(
                &output_format,
                &format!("Sessions revoked for {}", user_id),
                json!({ "user_id": user_id }),
            )
        }
    }
}
