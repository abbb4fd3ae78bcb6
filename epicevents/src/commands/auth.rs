//! Session commands: login, logout, status.

use clap::Subcommand;

use crate::AppState;
use crate::auth::{self, session};
use crate::commands::validation;
use crate::errors::{Error, Result};

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Log in and persist a session credential (valid one hour)
    Login {
        login: String,
        /// Password; prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Delete the stored session
    Logout,
    /// Show the current session
    Status,
}

impl AuthCommand {
    pub fn name(&self) -> &'static str {
        match self {
            AuthCommand::Login { .. } => "auth.login",
            AuthCommand::Logout => "auth.logout",
            AuthCommand::Status => "auth.status",
        }
    }
}

pub async fn run(state: &AppState, command: AuthCommand) -> Result<()> {
    match command {
        AuthCommand::Login { login, password } => login_command(state, &login, password).await,
        AuthCommand::Logout => {
            if state.store.delete() {
                println!("Logged out.");
            } else {
                println!("No stored session.");
            }
            Ok(())
        }
        AuthCommand::Status => {
            status(state);
            Ok(())
        }
    }
}

async fn login_command(state: &AppState, login: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };

    let collaborator = auth::authenticate(&state.db, &state.config.auth.password, login, &password).await?;

    // One generic message for unknown login and wrong password alike
    let Some(collaborator) = collaborator else {
        return Err(validation("Invalid credentials"));
    };

    let secret = state.config.secret_key.as_deref().ok_or_else(|| Error::Internal {
        operation: "login: secret_key is required".to_string(),
    })?;

    let token = session::mint(
        collaborator.id,
        collaborator.departement,
        Some(collaborator.nom.clone()),
        Some(collaborator.prenom.clone()),
        secret,
    )?;
    state.store.save(&token)?;

    println!(
        "Connected as {} ({}). Session valid for one hour.",
        collaborator.display_name(),
        collaborator.departement
    );

    Ok(())
}

fn status(state: &AppState) {
    let Some(raw) = state.store.load() else {
        println!("Not connected.");
        return;
    };

    let Some(secret) = state.config.secret_key.as_deref() else {
        println!("Not connected.");
        return;
    };

    match session::decode_credential(&raw, secret) {
        Ok(claims) => {
            let expires = chrono::DateTime::from_timestamp(claims.exp, 0)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let who = claims
                .display_name()
                .unwrap_or_else(|| format!("collaborator #{}", claims.sub));

            println!("Connected as {who} ({}), session expires at {expires}.", claims.role);
        }
        Err(Error::SessionExpired) => println!("Session expired, please reconnect."),
        Err(_) => println!("Stored session is unreadable, please log in again."),
    }
}

/// Prompt for a password without echoing it back to the terminal.
pub(crate) fn prompt_password() -> Result<String> {
    rpassword::prompt_password("Password: ").map_err(|e| Error::Internal {
        operation: format!("read the password prompt: {e}"),
    })
}
