//! Database models for contracts.

use crate::types::{ClientId, ContractId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database response for a contract
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contract {
    pub id: ContractId,
    pub client_id: ClientId,
    pub montant_total: f64,
    pub montant_restant: f64,
    pub signed: bool,
    pub created_at: DateTime<Utc>,
}

impl Contract {
    pub fn is_fully_paid(&self) -> bool {
        self.montant_restant == 0.0
    }
}

/// Database request for creating a new contract
///
/// Contracts always start unsigned with the full amount outstanding tracked
/// separately, so `signed` is not part of the request.
#[derive(Debug, Clone)]
pub struct ContractCreateDBRequest {
    pub client_id: ClientId,
    pub montant_total: f64,
    pub montant_restant: f64,
}

/// Database request for updating a contract
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ContractUpdateDBRequest {
    pub montant_total: Option<f64>,
    pub montant_restant: Option<f64>,
    pub signed: Option<bool>,
}
