//! Database models for clients.

use crate::types::{ClientId, CollaboratorId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database response for a client
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Client {
    pub id: ClientId,
    pub nom_complet: String,
    pub email: String,
    pub telephone: Option<String>,
    pub nom_entreprise: Option<String>,
    /// Commercial collaborator responsible for this client. Nullable so the
    /// client survives the collaborator's deletion.
    pub commercial_id: Option<CollaboratorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database request for creating a new client
#[derive(Debug, Clone)]
pub struct ClientCreateDBRequest {
    pub nom_complet: String,
    pub email: String,
    pub telephone: Option<String>,
    pub nom_entreprise: Option<String>,
    pub commercial_id: Option<CollaboratorId>,
}

/// Database request for updating a client
///
/// `None` fields are left unchanged; `updated_at` is bumped on every update.
#[derive(Debug, Clone, Default)]
pub struct ClientUpdateDBRequest {
    pub nom_complet: Option<String>,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub nom_entreprise: Option<String>,
    pub commercial_id: Option<CollaboratorId>,
}
