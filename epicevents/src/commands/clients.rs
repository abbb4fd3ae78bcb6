//! Client commands.

use clap::Subcommand;

use crate::AppState;
use crate::auth::Guard;
use crate::commands::{validate_email, validate_non_empty, validation};
use crate::db::errors::DbError;
use crate::db::handlers::{Clients, Repository, clients::ClientFilter};
use crate::db::models::clients::{Client, ClientCreateDBRequest, ClientUpdateDBRequest};
use crate::db::models::collaborators::Role;
use crate::errors::Result;
use crate::policy::required_roles;
use crate::types::ClientId;

#[derive(Subcommand, Debug)]
pub enum ClientsCommand {
    /// List clients (commercials see their own unless --all)
    List {
        /// Include clients of every commercial
        #[arg(long)]
        all: bool,
    },
    /// Show one client
    Show { id: ClientId },
    /// Create a client, assigned to the calling commercial
    Create {
        #[arg(long)]
        nom_complet: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        telephone: Option<String>,
        #[arg(long)]
        nom_entreprise: Option<String>,
    },
    /// Update one of your own clients
    Update {
        id: ClientId,
        #[arg(long)]
        nom_complet: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        telephone: Option<String>,
        #[arg(long)]
        nom_entreprise: Option<String>,
    },
}

impl ClientsCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ClientsCommand::List { .. } => "clients.list",
            ClientsCommand::Show { .. } => "clients.show",
            ClientsCommand::Create { .. } => "clients.create",
            ClientsCommand::Update { .. } => "clients.update",
        }
    }
}

pub async fn run(state: &AppState, command: ClientsCommand) -> Result<()> {
    match command {
        ClientsCommand::List { all } => list(state, all).await,
        ClientsCommand::Show { id } => show(state, id).await,
        ClientsCommand::Create {
            nom_complet,
            email,
            telephone,
            nom_entreprise,
        } => create(state, nom_complet, email, telephone, nom_entreprise).await,
        ClientsCommand::Update {
            id,
            nom_complet,
            email,
            telephone,
            nom_entreprise,
        } => update(state, id, nom_complet, email, telephone, nom_entreprise).await,
    }
}

async fn list(state: &AppState, all: bool) -> Result<()> {
    let current = Guard::require(required_roles("clients.list")).authorize(state).await?;

    // Commercials get their own book of clients by default
    let filter = if current.role == Role::Commercial && !all {
        ClientFilter {
            commercial_id: Some(current.id),
        }
    } else {
        ClientFilter::default()
    };

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let clients = Clients::new(&mut conn).list(&filter).await?;

    if clients.is_empty() {
        println!("No clients.");
        return Ok(());
    }

    for client in &clients {
        print_row(client);
    }

    Ok(())
}

async fn show(state: &AppState, id: ClientId) -> Result<()> {
    Guard::require(required_roles("clients.show")).authorize(state).await?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let client = Clients::new(&mut conn).get_by_id(id).await?.ok_or(DbError::NotFound)?;

    print_row(&client);
    println!(
        "  created {}, updated {}",
        client.created_at.format("%Y-%m-%d"),
        client.updated_at.format("%Y-%m-%d")
    );

    Ok(())
}

async fn create(
    state: &AppState,
    nom_complet: String,
    email: String,
    telephone: Option<String>,
    nom_entreprise: Option<String>,
) -> Result<()> {
    let current = Guard::require(required_roles("clients.create")).authorize(state).await?;

    validate_non_empty("nom_complet", &nom_complet)?;
    validate_email(&email)?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let client = Clients::new(&mut conn)
        .create(&ClientCreateDBRequest {
            nom_complet,
            email,
            telephone,
            nom_entreprise,
            commercial_id: Some(current.id),
        })
        .await?;

    println!("Created client #{}: {}", client.id, client.nom_complet);
    Ok(())
}

async fn update(
    state: &AppState,
    id: ClientId,
    nom_complet: Option<String>,
    email: Option<String>,
    telephone: Option<String>,
    nom_entreprise: Option<String>,
) -> Result<()> {
    let current = Guard::require(required_roles("clients.update")).authorize(state).await?;

    if let Some(nom_complet) = &nom_complet {
        validate_non_empty("nom_complet", nom_complet)?;
    }
    if let Some(email) = &email {
        validate_email(email)?;
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut repo = Clients::new(&mut conn);

    let client = repo.get_by_id(id).await?.ok_or(DbError::NotFound)?;
    if client.commercial_id != Some(current.id) {
        return Err(validation("You may only update your own clients"));
    }

    let updated = repo
        .update(
            id,
            &ClientUpdateDBRequest {
                nom_complet,
                email,
                telephone,
                nom_entreprise,
                commercial_id: None,
            },
        )
        .await?;

    println!("Updated client #{}: {}", updated.id, updated.nom_complet);
    Ok(())
}

fn print_row(client: &Client) {
    println!(
        "#{:<4} {:<24} {:<28} {:<16} {}",
        client.id,
        client.nom_complet,
        client.email,
        client.telephone.as_deref().unwrap_or("-"),
        client.nom_entreprise.as_deref().unwrap_or("-"),
    );
}
