//! Role-based authorization guard.
//!
//! Every protected command runs behind a [`Guard`] carrying its required-role
//! set. The guard is explicit composition, not a decorator: callers build it,
//! call [`Guard::authorize`] (or wrap the operation with [`Guard::protect`]),
//! and handle the denial like any other error.
//!
//! The check order is fixed: stored credential first, then signature and
//! expiry, then role. Expiry comes before any role logic since an expired
//! credential's role cannot be trusted as current. The role itself is
//! re-derived from the collaborator's live `departement` row rather than the
//! snapshot baked into the credential, so a role change takes effect within
//! the credential's lifetime and a deleted collaborator loses access
//! immediately.

use tracing::{debug, instrument};

use crate::AppState;
use crate::auth::session;
use crate::db::handlers::{Collaborators, Repository};
use crate::db::models::collaborators::{Collaborator, Role};
use crate::errors::{Error, Result};
use crate::types::CollaboratorId;

/// The identity of the collaborator running the current command, resolved
/// from the stored credential and the live database row.
#[derive(Debug, Clone)]
pub struct CurrentCollaborator {
    pub id: CollaboratorId,
    pub nom: String,
    pub prenom: String,
    pub email: String,
    /// Current departement, re-derived at authorization time
    pub role: Role,
}

impl CurrentCollaborator {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.prenom, self.nom)
    }
}

impl From<Collaborator> for CurrentCollaborator {
    fn from(collaborator: Collaborator) -> Self {
        Self {
            id: collaborator.id,
            nom: collaborator.nom,
            prenom: collaborator.prenom,
            email: collaborator.email,
            role: collaborator.departement,
        }
    }
}

/// Guard wrapping a protected operation with a required-role set.
#[derive(Debug, Clone, Copy)]
pub struct Guard {
    required: &'static [Role],
}

impl Guard {
    pub fn require(required: &'static [Role]) -> Self {
        Self { required }
    }

    /// Resolve and check the identity behind the stored credential.
    ///
    /// Denials are precise: no stored credential is [`Error::NotAuthenticated`],
    /// a stale credential is [`Error::SessionExpired`], a corrupted or
    /// tampered one is [`Error::InvalidCredential`], and a valid credential
    /// whose current role is outside the required set is [`Error::Forbidden`].
    #[instrument(skip(self, state), fields(required = ?self.required))]
    pub async fn authorize(&self, state: &AppState) -> Result<CurrentCollaborator> {
        let raw = state.store.load().ok_or(Error::NotAuthenticated)?;

        let secret = state.config.secret_key.as_deref().ok_or_else(|| Error::Internal {
            operation: "authorize: secret_key is required".to_string(),
        })?;

        let claims = session::decode_credential(&raw, secret)?;

        let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;
        let collaborator = Collaborators::new(&mut conn)
            .get_by_id(claims.sub)
            .await?
            // The account behind the credential is gone; the session is void
            .ok_or(Error::NotAuthenticated)?;

        let role = collaborator.departement;
        if !self.required.contains(&role) {
            return Err(Error::Forbidden {
                role,
                required: self.required.to_vec(),
            });
        }

        debug!(collaborator_id = collaborator.id, %role, "Authorized");

        Ok(CurrentCollaborator::from(collaborator))
    }

    /// Authorize, then run the operation exactly once with the resolved
    /// identity. The operation's result and errors pass through untouched.
    pub async fn protect<T, F, Fut>(&self, state: &AppState, op: F) -> Result<T>
    where
        F: FnOnce(CurrentCollaborator) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let current = self.authorize(state).await?;
        op(current).await
    }
}
