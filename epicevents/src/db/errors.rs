use thiserror::Error;

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation")]
    UniqueViolation {
        /// `table.column` parsed from the driver message, when present
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Foreign key constraint violation
    #[error("Foreign key constraint violation")]
    ForeignKeyViolation { message: String },

    /// Check constraint violation
    #[error("Check constraint violation")]
    CheckViolation {
        constraint: Option<String>,
        message: String,
    },

    /// Entity cannot be modified or deleted due to protection rules
    /// NOTE: use this only for DB-level protection rules, not user roles etc. - that's handled at
    /// the command layer.
    #[error("Cannot {operation} {entity_type}: {reason}")]
    ProtectedEntity {
        operation: String,         // "delete", "update", "modify"
        reason: String,            // "last management account", etc.
        entity_type: String,       // "collaborator", "client", etc.
        entity_id: Option<String>, // ID for logging/debugging
    },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    let message = db_err.message().to_string();
                    // SQLite does not expose constraint()/table(), so parse them
                    // out of the driver message.
                    let constraint = extract_failed_constraint(&message);
                    let table = constraint
                        .as_deref()
                        .and_then(|c| c.split('.').next())
                        .map(|s| s.to_string());

                    DbError::UniqueViolation {
                        constraint,
                        table,
                        message,
                    }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation {
                        message: db_err.message().to_string(),
                    }
                } else if db_err.is_check_violation() {
                    let message = db_err.message().to_string();
                    DbError::CheckViolation {
                        constraint: extract_failed_constraint(&message),
                        message,
                    }
                } else {
                    // All other database errors are non-recoverable - convert to anyhow
                    DbError::Other(anyhow::Error::from(err))
                }
            }
            // All other sqlx errors are non-recoverable - convert to anyhow with context
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Extract what SQLite appends after "... constraint failed: ", typically
/// `table.column` for UNIQUE violations or the constraint expression for
/// CHECK violations.
fn extract_failed_constraint(message: &str) -> Option<String> {
    message
        .split("constraint failed: ")
        .nth(1)
        .map(|s| s.trim().to_string())
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
