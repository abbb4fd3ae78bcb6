//! Event commands.

use clap::Subcommand;

use crate::AppState;
use crate::auth::Guard;
use crate::commands::{parse_datetime, validate_dates, validate_non_empty, validate_participants, validation};
use crate::db::errors::DbError;
use crate::db::handlers::{Clients, Collaborators, Contracts, Events, Repository, events::EventFilter};
use crate::db::models::collaborators::Role;
use crate::db::models::events::{Event, EventCreateDBRequest, EventUpdateDBRequest};
use crate::errors::Result;
use crate::policy::required_roles;
use crate::types::{CollaboratorId, ContractId, EventId};

#[derive(Subcommand, Debug)]
pub enum EvenementsCommand {
    /// Create an event on a signed contract of one of your clients
    Create {
        contract_id: ContractId,
        /// Start, RFC 3339 or 'YYYY-MM-DD HH:MM' (UTC)
        #[arg(long)]
        date_debut: String,
        /// End, RFC 3339 or 'YYYY-MM-DD HH:MM' (UTC)
        #[arg(long)]
        date_fin: String,
        #[arg(long)]
        lieu: String,
        #[arg(long)]
        participants: i64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List events
    List {
        /// Only events assigned to you (support)
        #[arg(long)]
        mine: bool,
        /// Only events with no support assigned
        #[arg(long)]
        unassigned: bool,
    },
    /// Update an event assigned to you (support)
    Update {
        id: EventId,
        #[arg(long)]
        date_debut: Option<String>,
        #[arg(long)]
        date_fin: Option<String>,
        #[arg(long)]
        lieu: Option<String>,
        #[arg(long)]
        participants: Option<i64>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Assign a support collaborator to an event (management)
    AssignSupport {
        event_id: EventId,
        support_id: CollaboratorId,
    },
}

impl EvenementsCommand {
    pub fn name(&self) -> &'static str {
        match self {
            EvenementsCommand::Create { .. } => "evenements.create",
            EvenementsCommand::List { .. } => "evenements.list",
            EvenementsCommand::Update { .. } => "evenements.update",
            EvenementsCommand::AssignSupport { .. } => "evenements.assign-support",
        }
    }
}

pub async fn run(state: &AppState, command: EvenementsCommand) -> Result<()> {
    match command {
        EvenementsCommand::Create {
            contract_id,
            date_debut,
            date_fin,
            lieu,
            participants,
            notes,
        } => create(state, contract_id, date_debut, date_fin, lieu, participants, notes).await,
        EvenementsCommand::List { mine, unassigned } => list(state, mine, unassigned).await,
        EvenementsCommand::Update {
            id,
            date_debut,
            date_fin,
            lieu,
            participants,
            notes,
        } => update(state, id, date_debut, date_fin, lieu, participants, notes).await,
        EvenementsCommand::AssignSupport { event_id, support_id } => assign_support(state, event_id, support_id).await,
    }
}

async fn create(
    state: &AppState,
    contract_id: ContractId,
    date_debut: String,
    date_fin: String,
    lieu: String,
    participants: i64,
    notes: Option<String>,
) -> Result<()> {
    let current = Guard::require(required_roles("evenements.create")).authorize(state).await?;

    let date_debut = parse_datetime(&date_debut)?;
    let date_fin = parse_datetime(&date_fin)?;
    validate_dates(date_debut, date_fin)?;
    validate_non_empty("lieu", &lieu)?;
    validate_participants(participants)?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let contract = Contracts::new(&mut conn)
        .get_by_id(contract_id)
        .await?
        .ok_or(DbError::NotFound)?;

    if !contract.signed {
        return Err(validation("Events can only be created on signed contracts"));
    }

    let client = Clients::new(&mut conn)
        .get_by_id(contract.client_id)
        .await?
        .ok_or(DbError::NotFound)?;
    if client.commercial_id != Some(current.id) {
        return Err(validation("You may only create events for your own clients"));
    }

    let event = Events::new(&mut conn)
        .create(&EventCreateDBRequest {
            contract_id,
            date_debut,
            date_fin,
            lieu,
            participants,
            notes,
        })
        .await?;

    println!("Created event #{} on contract #{contract_id} ({})", event.id, event.lieu);
    Ok(())
}

async fn list(state: &AppState, mine: bool, unassigned: bool) -> Result<()> {
    let current = Guard::require(required_roles("evenements.list")).authorize(state).await?;

    let support_id = if mine {
        if current.role != Role::Support {
            return Err(validation("--mine is only available to support accounts"));
        }
        Some(current.id)
    } else {
        None
    };

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let events = Events::new(&mut conn)
        .list(&EventFilter {
            contract_id: None,
            support_id,
            unassigned,
        })
        .await?;

    if events.is_empty() {
        println!("No events.");
        return Ok(());
    }

    for event in &events {
        print_row(event);
    }

    Ok(())
}

async fn update(
    state: &AppState,
    id: EventId,
    date_debut: Option<String>,
    date_fin: Option<String>,
    lieu: Option<String>,
    participants: Option<i64>,
    notes: Option<String>,
) -> Result<()> {
    let current = Guard::require(required_roles("evenements.update")).authorize(state).await?;

    let date_debut = date_debut.as_deref().map(parse_datetime).transpose()?;
    let date_fin = date_fin.as_deref().map(parse_datetime).transpose()?;
    if let Some(lieu) = &lieu {
        validate_non_empty("lieu", lieu)?;
    }
    if let Some(participants) = participants {
        validate_participants(participants)?;
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut repo = Events::new(&mut conn);

    let event = repo.get_by_id(id).await?.ok_or(DbError::NotFound)?;
    if event.support_id != Some(current.id) {
        return Err(validation("You may only update events assigned to you"));
    }

    // Date ordering holds on the merged values
    validate_dates(date_debut.unwrap_or(event.date_debut), date_fin.unwrap_or(event.date_fin))?;

    let updated = repo
        .update(
            id,
            &EventUpdateDBRequest {
                support_id: None,
                date_debut,
                date_fin,
                lieu,
                participants,
                notes,
            },
        )
        .await?;

    println!("Updated event #{} ({})", updated.id, updated.lieu);
    Ok(())
}

async fn assign_support(state: &AppState, event_id: EventId, support_id: CollaboratorId) -> Result<()> {
    Guard::require(required_roles("evenements.assign-support")).authorize(state).await?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let event = Events::new(&mut conn).get_by_id(event_id).await?.ok_or(DbError::NotFound)?;
    if let Some(assigned) = event.support_id {
        return Err(validation(format!(
            "Event #{event_id} already has support collaborator #{assigned} assigned"
        )));
    }

    let target = Collaborators::new(&mut conn)
        .get_by_id(support_id)
        .await?
        .ok_or(DbError::NotFound)?;
    if target.departement != Role::Support {
        return Err(validation(format!(
            "Collaborator #{support_id} is in the {} department, not support",
            target.departement
        )));
    }

    Events::new(&mut conn)
        .update(
            event_id,
            &EventUpdateDBRequest {
                support_id: Some(support_id),
                ..Default::default()
            },
        )
        .await?;

    println!("Assigned {} to event #{event_id}", target.display_name());
    Ok(())
}

fn print_row(event: &Event) {
    let support = event
        .support_id
        .map(|id| format!("support #{id}"))
        .unwrap_or_else(|| "unassigned".to_string());

    println!(
        "#{:<4} contract #{:<4} {} -> {}  {:<20} {:>4} guests  {}",
        event.id,
        event.contract_id,
        event.date_debut.format("%Y-%m-%d %H:%M"),
        event.date_fin.format("%Y-%m-%d %H:%M"),
        event.lieu,
        event.participants,
        support,
    );
}
