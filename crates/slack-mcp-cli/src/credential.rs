//! `credential` subcommands — provision the per-tenant token table.

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;

use slack_mcp_store::SqliteCredentialStore;
use slack_mcp_store::{CredentialStore, StoreError};
use slack_mcp_types::TenantCredential;

#[derive(Subcommand)]
pub enum CredentialCommand {
    /// Provision or rotate a tenant's bot token
    Set { team_id: String, bot_token: String },
    /// Show a tenant's stored token
    Get { team_id: String },
    /// List provisioned team ids
    List,
    /// Remove a tenant's credential
    Remove { team_id: String },
}

pub async fn run(command: CredentialCommand, db_path: &Path) -> Result<()> {
    let store = SqliteCredentialStore::open(db_path)?;

    match command {
        CredentialCommand::Set { team_id, bot_token } => {
            store
                .put(&TenantCredential {
                    team_id: team_id.clone(),
                    bot_token,
                })
                .await?;
            println!("Credential stored for {team_id}");
        }
        CredentialCommand::Get { team_id } => match store.resolve(&team_id).await {
            Ok(credential) => println!("{}", credential.bot_token),
            Err(StoreError::NotFound(team)) => {
                eprintln!("No credential found for {team}");
                std::process::exit(1);
            }
            Err(e) => return Err(e.into()),
        },
        CredentialCommand::List => {
            for team in store.list_teams().await? {
                println!("{team}");
            }
        }
        CredentialCommand::Remove { team_id } => {
            store.remove(&team_id).await?;
            println!("Credential removed for {team_id}");
        }
    }

    Ok(())
}
