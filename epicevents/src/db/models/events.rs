//! Database models for events.

use crate::types::{CollaboratorId, ContractId, EventId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database response for an event
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: EventId,
    pub contract_id: ContractId,
    /// Support collaborator running the event; assigned by management after
    /// creation, so nullable.
    pub support_id: Option<CollaboratorId>,
    pub date_debut: DateTime<Utc>,
    pub date_fin: DateTime<Utc>,
    pub lieu: String,
    pub participants: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Database request for creating a new event
///
/// Events are created by the client's commercial without a support
/// assignment; `assign-support` fills it in later.
#[derive(Debug, Clone)]
pub struct EventCreateDBRequest {
    pub contract_id: ContractId,
    pub date_debut: DateTime<Utc>,
    pub date_fin: DateTime<Utc>,
    pub lieu: String,
    pub participants: i64,
    pub notes: Option<String>,
}

/// Database request for updating an event
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct EventUpdateDBRequest {
    pub support_id: Option<CollaboratorId>,
    pub date_debut: Option<DateTime<Utc>>,
    pub date_fin: Option<DateTime<Utc>>,
    pub lieu: Option<String>,
    pub participants: Option<i64>,
    pub notes: Option<String>,
}
