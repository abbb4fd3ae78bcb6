//! Database models for collaborators (staff accounts).

use crate::types::CollaboratorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Department role stored as TEXT in the database.
///
/// The `departement` column is the source of truth for authorization; the
/// role baked into a credential at mint time is only a snapshot. `Lecture`
/// is a read-only role usable in required-role sets and minted credentials,
/// but it is not a valid department value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, clap::ValueEnum)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Gestion,
    Commercial,
    Support,
    Lecture,
}

impl Role {
    /// Departments a collaborator can belong to (excludes the read-only role)
    pub const DEPARTMENTS: [Role; 3] = [Role::Gestion, Role::Commercial, Role::Support];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Gestion => "gestion",
            Role::Commercial => "commercial",
            Role::Support => "support",
            Role::Lecture => "lecture",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Database response for a collaborator (one table row)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Collaborator {
    pub id: CollaboratorId,
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub login: String,
    pub password_hash: String,
    pub departement: Role,
    pub created_at: DateTime<Utc>,
}

impl Collaborator {
    /// Display name in "Prenom Nom" order
    pub fn display_name(&self) -> String {
        format!("{} {}", self.prenom, self.nom)
    }
}

/// Database request for creating a new collaborator
#[derive(Debug, Clone)]
pub struct CollaboratorCreateDBRequest {
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub login: String,
    pub password_hash: String,
    pub departement: Role,
}

/// Database request for updating a collaborator
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct CollaboratorUpdateDBRequest {
    pub nom: Option<String>,
    pub prenom: Option<String>,
    pub email: Option<String>,
    pub login: Option<String>,
    pub departement: Option<Role>,
    pub password_hash: Option<String>,
}
