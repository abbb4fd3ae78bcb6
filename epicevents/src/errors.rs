use crate::db::errors::DbError;
use crate::db::models::collaborators::Role;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// No stored credential, or the credential references a collaborator that
    /// no longer exists
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Stored credential decodes but its expiry has passed
    #[error("Session expired")]
    SessionExpired,

    /// Stored credential fails signature or format verification (corrupted,
    /// tampered, or wrong key)
    #[error("Invalid credential")]
    InvalidCredential,

    /// Credential is valid but the role is not in the operation's required set
    #[error("Forbidden for role {role}")]
    Forbidden { role: Role, required: Vec<Role> },

    /// Invalid input data or business rule violation
    #[error("{message}")]
    Validation { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::NotAuthenticated => "Not authenticated: please log in first (auth login)".to_string(),
            Error::SessionExpired => "Session expired, please reconnect".to_string(),
            Error::InvalidCredential => "Authentication failed: please log in again".to_string(),
            Error::Forbidden { role, required } => {
                let required = required.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ");
                format!("Forbidden for role {role}, requires one of [{required}]")
            }
            Error::Validation { message } => message.clone(),
            Error::Internal { .. } => "Internal error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Not found".to_string(),
                DbError::UniqueViolation { constraint, .. } => {
                    // Provide user-friendly messages for common unique constraint violations
                    match constraint.as_deref() {
                        Some("collaborators.email") => "A collaborator with this email already exists".to_string(),
                        Some("collaborators.login") => "This login is already taken".to_string(),
                        Some("clients.email") => "A client with this email already exists".to_string(),
                        _ => "Resource already exists".to_string(),
                    }
                }
                DbError::ForeignKeyViolation { .. } => "Invalid reference to a related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::ProtectedEntity {
                    operation,
                    entity_type,
                    reason,
                    ..
                } => {
                    format!("Cannot {operation} {entity_type}: {reason}")
                }
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal error".to_string(),
        }
    }

    /// Log full error details for debugging - different log levels based on severity
    pub fn log(&self) {
        match self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::NotAuthenticated | Error::SessionExpired | Error::InvalidCredential | Error::Forbidden { .. } => {
                tracing::warn!("Authorization error: {}", self);
            }
            Error::Validation { .. } => {
                tracing::debug!("Validation error: {}", self);
            }
        }
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
