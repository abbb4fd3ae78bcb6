//! Contract commands.

use clap::Subcommand;

use crate::AppState;
use crate::auth::{CurrentCollaborator, Guard};
use crate::commands::{validate_montants, validation};
use crate::db::errors::DbError;
use crate::db::handlers::{Clients, Contracts, Repository, contracts::ContractFilter};
use crate::db::models::collaborators::Role;
use crate::db::models::contracts::{Contract, ContractCreateDBRequest, ContractUpdateDBRequest};
use crate::errors::Result;
use crate::policy::required_roles;
use crate::types::{ClientId, ContractId};

#[derive(Subcommand, Debug)]
pub enum ContratsCommand {
    /// Create a contract for an existing client (management)
    Create {
        client_id: ClientId,
        #[arg(long)]
        montant_total: f64,
        /// Outstanding amount; defaults to the total
        #[arg(long)]
        montant_restant: Option<f64>,
    },
    /// List contracts
    List {
        /// Only contracts not signed yet
        #[arg(long)]
        unsigned: bool,
        /// Only contracts with an outstanding amount
        #[arg(long)]
        unpaid: bool,
        /// Only contracts of your own clients (commercials)
        #[arg(long)]
        mine: bool,
    },
    /// Update any contract (management)
    Update {
        id: ContractId,
        #[arg(long)]
        montant_total: Option<f64>,
        #[arg(long)]
        montant_restant: Option<f64>,
        /// Mark the contract as signed
        #[arg(long)]
        signed: bool,
    },
    /// Update a contract of one of your own clients (commercials)
    UpdateMine {
        id: ContractId,
        #[arg(long)]
        montant_total: Option<f64>,
        #[arg(long)]
        montant_restant: Option<f64>,
        /// Mark the contract as signed
        #[arg(long)]
        signed: bool,
    },
}

impl ContratsCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ContratsCommand::Create { .. } => "contrats.create",
            ContratsCommand::List { .. } => "contrats.list",
            ContratsCommand::Update { .. } => "contrats.update",
            ContratsCommand::UpdateMine { .. } => "contrats.update-mine",
        }
    }
}

pub async fn run(state: &AppState, command: ContratsCommand) -> Result<()> {
    match command {
        ContratsCommand::Create {
            client_id,
            montant_total,
            montant_restant,
        } => create(state, client_id, montant_total, montant_restant).await,
        ContratsCommand::List { unsigned, unpaid, mine } => list(state, unsigned, unpaid, mine).await,
        ContratsCommand::Update {
            id,
            montant_total,
            montant_restant,
            signed,
        } => {
            let current = Guard::require(required_roles("contrats.update")).authorize(state).await?;
            // Management may update any contract
            apply_update(state, &current, id, montant_total, montant_restant, signed, false).await
        }
        ContratsCommand::UpdateMine {
            id,
            montant_total,
            montant_restant,
            signed,
        } => {
            let current = Guard::require(required_roles("contrats.update-mine")).authorize(state).await?;
            apply_update(state, &current, id, montant_total, montant_restant, signed, true).await
        }
    }
}

async fn create(state: &AppState, client_id: ClientId, montant_total: f64, montant_restant: Option<f64>) -> Result<()> {
    Guard::require(required_roles("contrats.create")).authorize(state).await?;

    let montant_restant = montant_restant.unwrap_or(montant_total);
    validate_montants(montant_total, montant_restant)?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let client = Clients::new(&mut conn).get_by_id(client_id).await?.ok_or(DbError::NotFound)?;
    if client.commercial_id.is_none() {
        return Err(validation("Client has no assigned commercial"));
    }

    let contract = Contracts::new(&mut conn)
        .create(&ContractCreateDBRequest {
            client_id,
            montant_total,
            montant_restant,
        })
        .await?;

    println!("Created contract #{} for client #{client_id} ({:.2} total)", contract.id, contract.montant_total);
    Ok(())
}

async fn list(state: &AppState, unsigned: bool, unpaid: bool, mine: bool) -> Result<()> {
    let current = Guard::require(required_roles("contrats.list")).authorize(state).await?;

    let commercial_id = if mine {
        if current.role != Role::Commercial {
            return Err(validation("--mine is only available to commercial accounts"));
        }
        Some(current.id)
    } else {
        None
    };

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let contracts = Contracts::new(&mut conn)
        .list(&ContractFilter {
            client_id: None,
            commercial_id,
            unsigned,
            unpaid,
        })
        .await?;

    if contracts.is_empty() {
        println!("No contracts.");
        return Ok(());
    }

    for contract in &contracts {
        print_row(contract);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn apply_update(
    state: &AppState,
    current: &CurrentCollaborator,
    id: ContractId,
    montant_total: Option<f64>,
    montant_restant: Option<f64>,
    signed: bool,
    ownership_required: bool,
) -> Result<()> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let contract = Contracts::new(&mut conn).get_by_id(id).await?.ok_or(DbError::NotFound)?;

    if ownership_required {
        let client = Clients::new(&mut conn)
            .get_by_id(contract.client_id)
            .await?
            .ok_or(DbError::NotFound)?;
        if client.commercial_id != Some(current.id) {
            return Err(validation("You may only update contracts of your own clients"));
        }
    }

    // Bounds apply to the merged values, not just the supplied ones
    let new_total = montant_total.unwrap_or(contract.montant_total);
    let new_restant = montant_restant.unwrap_or(contract.montant_restant);
    validate_montants(new_total, new_restant)?;

    let updated = Contracts::new(&mut conn)
        .update(
            id,
            &ContractUpdateDBRequest {
                montant_total,
                montant_restant,
                signed: signed.then_some(true),
            },
        )
        .await?;

    println!(
        "Updated contract #{}: {:.2} total, {:.2} outstanding, {}",
        updated.id,
        updated.montant_total,
        updated.montant_restant,
        if updated.signed { "signed" } else { "unsigned" }
    );
    Ok(())
}

fn print_row(contract: &Contract) {
    println!(
        "#{:<4} client #{:<4} {:>12.2} total {:>12.2} outstanding  {}",
        contract.id,
        contract.client_id,
        contract.montant_total,
        contract.montant_restant,
        if contract.signed { "signed" } else { "unsigned" },
    );
}
