//! CLI command surface.
//!
//! One clap command tree serves both one-shot invocations and the
//! interactive shell. Entity nouns are wire-visible in French, matching the
//! business vocabulary (`clients`, `contrats`, `evenements`,
//! `collaborateurs`).
//!
//! [`dispatch`] applies the role-command policy before any handler runs: a
//! command outside the caller's policy entry fails fast with the same denial
//! the authorization gate would produce. The gate still runs inside every
//! protected handler; the pre-filter is a usability measure, not the
//! enforcement point.

pub mod auth;
pub mod clients;
pub mod collaborateurs;
pub mod contrats;
pub mod evenements;
pub mod shell;

use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use regex::Regex;
use std::sync::OnceLock;

use crate::AppState;
use crate::auth::session;
use crate::db::handlers::{Collaborators, Repository};
use crate::db::models::collaborators::Role;
use crate::errors::{Error, Result};
use crate::policy;

/// Top-level command tree, shared by one-shot and shell dispatch
#[derive(Parser, Debug)]
#[command(name = "epicevents", about = "EpicEvents CRM", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Session management: login, logout, status
    #[command(subcommand)]
    Auth(auth::AuthCommand),
    /// Client records
    #[command(subcommand)]
    Clients(clients::ClientsCommand),
    /// Contracts
    #[command(subcommand)]
    Contrats(contrats::ContratsCommand),
    /// Events
    #[command(subcommand)]
    Evenements(evenements::EvenementsCommand),
    /// Staff accounts
    #[command(subcommand)]
    Collaborateurs(collaborateurs::CollaborateursCommand),
}

impl Command {
    /// Hierarchical command name used by the role-command policy
    pub fn name(&self) -> &'static str {
        match self {
            Command::Auth(cmd) => cmd.name(),
            Command::Clients(cmd) => cmd.name(),
            Command::Contrats(cmd) => cmd.name(),
            Command::Evenements(cmd) => cmd.name(),
            Command::Collaborateurs(cmd) => cmd.name(),
        }
    }
}

/// Run one command through the policy pre-filter and its handler.
pub async fn dispatch(state: &AppState, command: Command) -> Result<()> {
    pre_filter(state, &command).await?;

    match command {
        Command::Auth(cmd) => auth::run(state, cmd).await,
        Command::Clients(cmd) => clients::run(state, cmd).await,
        Command::Contrats(cmd) => contrats::run(state, cmd).await,
        Command::Evenements(cmd) => evenements::run(state, cmd).await,
        Command::Collaborateurs(cmd) => collaborateurs::run(state, cmd).await,
    }
}

/// Fast-fail for commands the caller's role may not invoke.
///
/// Session management stays reachable so a user can always log in, out, or
/// inspect their session. A missing, expired, or unreadable credential falls
/// through to the gate, which produces the precise denial; the pre-filter
/// only rejects policy mismatches early.
async fn pre_filter(state: &AppState, command: &Command) -> Result<()> {
    if matches!(command, Command::Auth(_)) {
        return Ok(());
    }

    let name = command.name();
    match live_role(state).await {
        Some(role) if !state.policy.is_allowed(role, name) => Err(Error::Forbidden {
            role,
            required: policy::required_roles(name).to_vec(),
        }),
        _ => Ok(()),
    }
}

/// Role behind the stored credential, re-derived from the live departement
/// row like the gate does, so the pre-filter and the gate cannot disagree
/// after a role change. Any resolution failure falls through to the gate for
/// the precise denial.
async fn live_role(state: &AppState) -> Option<Role> {
    let raw = state.store.load()?;
    let secret = state.config.secret_key.as_deref()?;
    let claims = session::decode_credential(&raw, secret).ok()?;

    let mut conn = state.db.acquire().await.ok()?;
    let collaborator = Collaborators::new(&mut conn).get_by_id(claims.sub).await.ok()??;

    Some(collaborator.departement)
}

/// Peek at the stored credential's role snapshot, for shaping the shell's
/// visible surface. Enforcement never relies on this value.
pub(crate) fn current_role(state: &AppState) -> Option<Role> {
    let raw = state.store.load()?;
    let secret = state.config.secret_key.as_deref()?;
    session::decode_credential(&raw, secret).ok().map(|claims| claims.role)
}

pub(crate) fn validation(message: impl Into<String>) -> Error {
    Error::Validation { message: message.into() }
}

pub(crate) fn validate_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<()> {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

    if !re.is_match(email) {
        return Err(validation(format!("'{email}' is not a valid email address")));
    }
    Ok(())
}

pub(crate) fn validate_login(login: &str) -> Result<()> {
    if login.len() < 3 {
        return Err(validation("Login must be at least 3 characters"));
    }
    if login.contains(char::is_whitespace) {
        return Err(validation("Login cannot contain spaces"));
    }
    Ok(())
}

pub(crate) fn validate_password_length(password: &str, config: &crate::config::PasswordConfig) -> Result<()> {
    if password.len() < config.min_length || password.len() > config.max_length {
        return Err(validation(format!(
            "Password must be between {} and {} characters",
            config.min_length, config.max_length
        )));
    }
    Ok(())
}

/// montant_total >= 0 and 0 <= montant_restant <= montant_total
pub(crate) fn validate_montants(total: f64, restant: f64) -> Result<()> {
    if !total.is_finite() || total < 0.0 {
        return Err(validation("montant_total must be a positive amount"));
    }
    if !restant.is_finite() || restant < 0.0 {
        return Err(validation("montant_restant must be a positive amount"));
    }
    if restant > total {
        return Err(validation("montant_restant cannot exceed montant_total"));
    }
    Ok(())
}

pub(crate) fn validate_dates(debut: DateTime<Utc>, fin: DateTime<Utc>) -> Result<()> {
    if fin <= debut {
        return Err(validation("date_fin must be after date_debut"));
    }
    Ok(())
}

pub(crate) fn validate_participants(participants: i64) -> Result<()> {
    if participants < 1 {
        return Err(validation("participants must be at least 1"));
    }
    Ok(())
}

/// Accepts RFC 3339 ("2026-06-12T18:00:00Z") or the shorter
/// "2026-06-12 18:00", read as UTC.
pub(crate) fn parse_datetime(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M") {
        return Ok(naive.and_utc());
    }

    Err(validation(format!(
        "'{raw}' is not a valid date, expected RFC 3339 or 'YYYY-MM-DD HH:MM'"
    )))
}
