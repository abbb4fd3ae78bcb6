//! Signed session credential creation and verification.
//!
//! A credential is an HS256 JWT carrying the collaborator's id, a snapshot of
//! their role, an optional display name, and a fixed one-hour expiry. Both
//! operations are pure functions of their input plus the process-wide secret;
//! persistence lives in [`crate::auth::store`] and messaging in the guard and
//! the CLI layer.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::db::models::collaborators::Role;
use crate::errors::{Error, Result};
use crate::types::CollaboratorId;

/// Fixed credential lifetime. Deliberately not a config field: a session is
/// one hour, full stop.
pub const SESSION_TTL_SECS: i64 = 3600;

/// Session claims embedded in the signed credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Collaborator id (subject)
    pub sub: CollaboratorId,
    /// Role snapshot taken at mint time. Authorization re-derives the role
    /// from the live departement; this value is for display only.
    pub role: Role,
    pub nom: Option<String>,
    pub prenom: Option<String>,
    /// Issued at (UTC seconds)
    pub iat: i64,
    /// Expiry (UTC seconds)
    pub exp: i64,
}

impl Claims {
    pub fn new(sub: CollaboratorId, role: Role, nom: Option<String>, prenom: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            sub,
            role,
            nom,
            prenom,
            iat: now.timestamp(),
            exp: now.timestamp() + SESSION_TTL_SECS,
        }
    }

    /// Display name in "Prenom Nom" order, when the credential carries one
    pub fn display_name(&self) -> Option<String> {
        match (&self.prenom, &self.nom) {
            (Some(prenom), Some(nom)) => Some(format!("{prenom} {nom}")),
            (Some(one), None) | (None, Some(one)) => Some(one.clone()),
            (None, None) => None,
        }
    }
}

/// Create a signed session credential for a collaborator
pub fn mint(sub: CollaboratorId, role: Role, nom: Option<String>, prenom: Option<String>, secret: &str) -> Result<String> {
    let claims = Claims::new(sub, role, nom, prenom);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create session credential: {e}"),
    })
}

/// Verify and decode a session credential.
///
/// Expired and invalid are distinct outcomes: the guard turns the former into
/// "session expired, please reconnect" and the latter into a generic
/// authentication failure.
pub fn decode_credential(raw: &str, secret: &str) -> Result<Claims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    // Mint and decode share one clock (this process), so no leeway: a
    // credential one second past its expiry is expired.
    validation.leeway = 0;

    let token_data = decode::<Claims>(raw, &key, &validation).map_err(|e| match e.kind() {
        // Well-formed, correctly signed, but past its expiry
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::SessionExpired,

        // Client-input errors - malformed tokens, bad signatures, invalid claims
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::InvalidIssuer
        | jsonwebtoken::errors::ErrorKind::InvalidAudience
        | jsonwebtoken::errors::ErrorKind::InvalidSubject
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => Error::InvalidCredential,

        // Library faults - key issues, internal failures
        jsonwebtoken::errors::ErrorKind::InvalidEcdsaKey
        | jsonwebtoken::errors::ErrorKind::InvalidRsaKey(_)
        | jsonwebtoken::errors::ErrorKind::RsaFailedSigning
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithmName
        | jsonwebtoken::errors::ErrorKind::InvalidKeyFormat
        | jsonwebtoken::errors::ErrorKind::MissingAlgorithm
        | jsonwebtoken::errors::ErrorKind::Json(_)
        | jsonwebtoken::errors::ErrorKind::Utf8(_)
        | jsonwebtoken::errors::ErrorKind::Crypto(_) => Error::Internal {
            operation: format!("credential verification: {e}"),
        },

        // Catch-all for any future error variants (default to internal for safety)
        _ => Error::Internal {
            operation: format!("credential verification (unknown error): {e}"),
        },
    })?;

    Ok(token_data.claims)
}
