//! # EpicEvents: CLI CRM with role-based access control
//!
//! `epicevents` is a command-line CRM for an events-management business.
//! Collaborators (staff) authenticate, then create and manage clients,
//! contracts, and events, with every operation gated by department role:
//! `gestion` (management), `commercial` (sales), and `support`.
//!
//! ## Overview
//!
//! The heart of the crate is the token-lifecycle and authorization layer. A
//! successful login mints a signed, one-hour credential embedding the
//! collaborator's identity; the credential is encrypted and persisted
//! locally, so the session survives process restarts without a server round
//! trip. Every protected command loads it, verifies signature and expiry,
//! re-derives the caller's role from the database, and checks it against the
//! command's required-role set before anything runs.
//!
//! ### Command Flow
//!
//! A one-shot invocation (`epicevents clients list`) and a line typed into
//! the interactive shell travel the same path: the clap command tree parses
//! the tokens, the dispatcher consults the role-command policy for a fast
//! pre-filter, and the command's own [`auth::Guard`] performs the
//! authoritative check before touching the repositories. Denials are
//! precise: not authenticated, session expired, invalid credential, or
//! forbidden for the caller's role.
//!
//! ### Core Components
//!
//! The **authentication layer** ([`auth`]) covers the whole credential
//! lifecycle: Argon2id password verification with transparent rehash
//! upgrades, JWT mint/decode, the AES-GCM encrypted credential store, and
//! the per-operation guard.
//!
//! The **policy layer** ([`policy`]) maps roles to command-name prefixes for
//! the dispatcher's pre-filter; its default table is derived from the same
//! declarative list the guards use, so the two can never disagree.
//!
//! The **database layer** ([`db`]) uses the repository pattern over SQLite.
//! Each entity has a repository handling queries and mutations, returning
//! typed records and a categorized [`db::errors::DbError`].
//!
//! The **command layer** ([`commands`]) is the clap tree, field validation,
//! and the rustyline shell.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use epicevents::config::{Args, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = Args::parse();
//!     let config = Config::load(&args)?;
//!     epicevents::telemetry::init_telemetry()?;
//!     // ... open the pool, run epicevents::migrator(), dispatch
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod commands;
pub mod config;
pub mod db;
pub mod errors;
pub mod policy;
pub mod telemetry;
pub mod types;

use bon::Builder;
use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::auth::CredentialStore;
use crate::config::Config;
use crate::db::handlers::{Collaborators, Repository};
use crate::db::models::collaborators::{CollaboratorCreateDBRequest, Role};
use crate::errors::{Error, Result};
use crate::policy::RoleCommandPolicy;
use crate::types::CollaboratorId;

/// Everything a command handler needs, built once in `main` and passed down.
/// No module-level singletons.
#[derive(Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub policy: RoleCommandPolicy,
    pub store: CredentialStore,
}

/// Get the epicevents database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial management collaborator if it doesn't exist.
///
/// Idempotent: called on every startup, it creates the account on first run
/// and refreshes the password on later runs when one is configured. With no
/// configured password and no existing account, nothing is created; the
/// operator bootstraps accounts some other way.
#[instrument(skip_all)]
pub async fn ensure_admin_collaborator(login: &str, password: Option<&str>, config: &Config, db: &SqlitePool) -> Result<Option<CollaboratorId>> {
    let params = auth::password::Argon2Params::from(&config.auth.password);
    let password_hash = match password {
        Some(password) => {
            let password = password.to_string();
            Some(
                tokio::task::spawn_blocking(move || auth::password::hash_string_with_params(&password, Some(params)))
                    .await
                    .map_err(|e| Error::Internal {
                        operation: format!("join password hashing task: {e}"),
                    })??,
            )
        }
        None => None,
    };

    let mut conn = db.acquire().await.map_err(db::errors::DbError::from)?;
    let mut repo = Collaborators::new(&mut conn);

    if let Some(existing) = repo.find_by_login(login).await? {
        if let Some(password_hash) = password_hash {
            repo.update_password_hash(existing.id, &password_hash).await?;
        }
        return Ok(Some(existing.id));
    }

    let Some(password_hash) = password_hash else {
        return Ok(None);
    };

    let created = repo
        .create(&CollaboratorCreateDBRequest {
            nom: "Admin".to_string(),
            prenom: "Initial".to_string(),
            email: format!("{login}@epicevents.local"),
            login: login.to_string(),
            password_hash,
            departement: Role::Gestion,
        })
        .await?;

    info!("Created initial management collaborator '{login}' (#{})", created.id);

    Ok(Some(created.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PasswordConfig;

    fn fast_config() -> Config {
        Config {
            secret_key: Some("lib-test-secret".to_string()),
            auth: crate::config::AuthConfig {
                password: PasswordConfig {
                    argon2_memory_kib: 8192,
                    argon2_iterations: 1,
                    argon2_parallelism: 1,
                    ..Default::default()
                },
            },
            ..Default::default()
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_bootstrap_is_idempotent(pool: SqlitePool) {
        let config = fast_config();

        let first = ensure_admin_collaborator("direction", Some("hunter2hunter2"), &config, &pool)
            .await
            .unwrap()
            .unwrap();
        let second = ensure_admin_collaborator("direction", Some("hunter2hunter2"), &config, &pool)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first, second);

        let mut conn = pool.acquire().await.unwrap();
        let admin = Collaborators::new(&mut conn).get_by_id(first).await.unwrap().unwrap();
        assert_eq!(admin.departement, Role::Gestion);
        assert_eq!(admin.login, "direction");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_bootstrap_refreshes_password(pool: SqlitePool) {
        let config = fast_config();

        let id = ensure_admin_collaborator("direction", Some("first-password"), &config, &pool)
            .await
            .unwrap()
            .unwrap();
        ensure_admin_collaborator("direction", Some("second-password"), &config, &pool)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let admin = Collaborators::new(&mut conn).get_by_id(id).await.unwrap().unwrap();

        assert!(auth::password::verify_string("second-password", &admin.password_hash).unwrap());
        assert!(!auth::password::verify_string("first-password", &admin.password_hash).unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_bootstrap_without_password_creates_nothing(pool: SqlitePool) {
        let config = fast_config();

        let result = ensure_admin_collaborator("direction", None, &config, &pool).await.unwrap();
        assert_eq!(result, None);

        let mut conn = pool.acquire().await.unwrap();
        assert!(Collaborators::new(&mut conn).find_by_login("direction").await.unwrap().is_none());
    }
}
