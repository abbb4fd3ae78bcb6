//! Authentication and authorization.
//!
//! This module owns the credential lifecycle and the role checks built on it:
//!
//! - [`password`]: Argon2id hashing, verification, and rehash detection
//! - [`session`]: signed credential mint/decode with a fixed one-hour expiry
//! - [`store`]: encrypted at-rest persistence of the credential
//! - [`guard`]: the per-operation authorization gate
//!
//! [`authenticate`] is the login-time entry point: it verifies a
//! login/password pair against the stored hash and transparently upgrades
//! hashes produced with outdated parameters. Minting and persisting the
//! credential on success is the login command's job.

pub mod guard;
pub mod password;
pub mod session;
pub mod store;

pub use guard::{CurrentCollaborator, Guard};
pub use store::CredentialStore;

use sqlx::SqlitePool;
use tracing::{instrument, warn};

use crate::config::PasswordConfig;
use crate::db::handlers::Collaborators;
use crate::db::models::collaborators::Collaborator;
use crate::errors::{Error, Result};

/// Verify a login/password pair against the stored collaborator hash.
///
/// Returns `None` for an unknown login and for a wrong password alike, so the
/// caller cannot tell which one failed. Unknown logins still burn a full
/// verification against a dummy hash, keeping response timing flat.
#[instrument(skip(db, password_config, password))]
pub async fn authenticate(db: &SqlitePool, password_config: &PasswordConfig, login: &str, password: &str) -> Result<Option<Collaborator>> {
    let mut conn = db.acquire().await.map_err(crate::db::errors::DbError::from)?;

    let Some(collaborator) = Collaborators::new(&mut conn).find_by_login(login).await? else {
        let password = password.to_string();
        spawn_verification(move || {
            password::dummy_verify(&password);
            Ok(false)
        })
        .await?;
        return Ok(None);
    };

    let candidate = password.to_string();
    let hash = collaborator.password_hash.clone();
    let verified = spawn_verification(move || password::verify_string(&candidate, &hash)).await?;

    if !verified {
        return Ok(None);
    }

    // Maintenance side effect: bring old hashes up to the configured
    // parameters while we hold the cleartext. Failures are logged, never
    // fatal - the login itself succeeded.
    let params = password::Argon2Params::from(password_config);
    match password::needs_rehash(&collaborator.password_hash, params) {
        Ok(true) => {
            let candidate = password.to_string();
            match spawn_hashing(move || password::hash_string_with_params(&candidate, Some(params))).await {
                Ok(new_hash) => {
                    if let Err(e) = Collaborators::new(&mut conn).update_password_hash(collaborator.id, &new_hash).await {
                        warn!("Could not persist upgraded password hash for collaborator {}: {e}", collaborator.id);
                    }
                }
                Err(e) => warn!("Could not upgrade password hash for collaborator {}: {e}", collaborator.id),
            }
        }
        Ok(false) => {}
        Err(e) => warn!("Could not inspect stored hash parameters for collaborator {}: {e}", collaborator.id),
    }

    Ok(Some(collaborator))
}

/// Argon2 verification is memory-hard on purpose; keep it off the async
/// worker threads.
async fn spawn_verification<F>(f: F) -> Result<bool>
where
    F: FnOnce() -> Result<bool> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| Error::Internal {
        operation: format!("join password verification task: {e}"),
    })?
}

async fn spawn_hashing<F>(f: F) -> Result<String>
where
    F: FnOnce() -> Result<String> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| Error::Internal {
        operation: format!("join password hashing task: {e}"),
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Repository;
    use crate::db::models::collaborators::{CollaboratorCreateDBRequest, Role};

    async fn seed_with_password(pool: &SqlitePool, login: &str, password: &str, params: Option<password::Argon2Params>) -> Collaborator {
        let hash = password::hash_string_with_params(password, params).unwrap();
        let mut conn = pool.acquire().await.unwrap();
        Collaborators::new(&mut conn)
            .create(&CollaboratorCreateDBRequest {
                nom: "Martin".to_string(),
                prenom: "Sophie".to_string(),
                email: format!("{login}@epicevents.example"),
                login: login.to_string(),
                password_hash: hash,
                departement: Role::Commercial,
            })
            .await
            .unwrap()
    }

    fn fast_params() -> password::Argon2Params {
        // Keep the tests quick; production defaults are much heavier
        password::Argon2Params {
            memory_kib: 8192,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn fast_config() -> PasswordConfig {
        PasswordConfig {
            argon2_memory_kib: 8192,
            argon2_iterations: 1,
            argon2_parallelism: 1,
            ..Default::default()
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_authenticate_success(pool: SqlitePool) {
        let created = seed_with_password(&pool, "sophie", "hunter2hunter2", Some(fast_params())).await;

        let found = authenticate(&pool, &fast_config(), "sophie", "hunter2hunter2").await.unwrap();

        assert_eq!(found.map(|c| c.id), Some(created.id));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_bad_password_and_unknown_login_look_identical(pool: SqlitePool) {
        seed_with_password(&pool, "sophie", "hunter2hunter2", Some(fast_params())).await;

        let wrong_password = authenticate(&pool, &fast_config(), "sophie", "nope").await.unwrap();
        let unknown_login = authenticate(&pool, &fast_config(), "nobody", "nope").await.unwrap();

        assert!(wrong_password.is_none());
        assert!(unknown_login.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_outdated_hash_is_upgraded_on_login(pool: SqlitePool) {
        let old_params = password::Argon2Params {
            memory_kib: 16384,
            iterations: 2,
            parallelism: 1,
        };
        let created = seed_with_password(&pool, "sophie", "hunter2hunter2", Some(old_params)).await;

        let found = authenticate(&pool, &fast_config(), "sophie", "hunter2hunter2").await.unwrap();
        assert!(found.is_some());

        // The stored hash now carries the configured parameters and the
        // password still verifies
        let mut conn = pool.acquire().await.unwrap();
        let reloaded = Collaborators::new(&mut conn).get_by_id(created.id).await.unwrap().unwrap();

        assert_ne!(reloaded.password_hash, created.password_hash);
        assert!(!password::needs_rehash(&reloaded.password_hash, fast_params()).unwrap());
        assert!(password::verify_string("hunter2hunter2", &reloaded.password_hash).unwrap());
    }
}
