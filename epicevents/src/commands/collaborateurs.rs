//! Staff account commands, all restricted to management.

use clap::Subcommand;

use crate::AppState;
use crate::auth::{Guard, password};
use crate::commands::{validate_email, validate_login, validate_non_empty, validate_password_length, validation};
use crate::db::errors::DbError;
use crate::db::handlers::{Collaborators, Repository, collaborators::CollaboratorFilter};
use crate::db::models::collaborators::{Collaborator, CollaboratorCreateDBRequest, CollaboratorUpdateDBRequest, Role};
use crate::errors::{Error, Result};
use crate::policy::required_roles;
use crate::types::CollaboratorId;

#[derive(Subcommand, Debug)]
pub enum CollaborateursCommand {
    /// Create a staff account
    Create {
        #[arg(long)]
        nom: String,
        #[arg(long)]
        prenom: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        login: String,
        /// Password; prompted for (hidden) when omitted
        #[arg(long)]
        password: Option<String>,
        /// Department: gestion, commercial, or support
        #[arg(long, value_enum)]
        departement: Role,
    },
    /// List staff accounts
    List {
        #[arg(long, value_enum)]
        departement: Option<Role>,
    },
    /// Show one staff account
    Show { id: CollaboratorId },
    /// Update a staff account
    Update {
        id: CollaboratorId,
        #[arg(long)]
        nom: Option<String>,
        #[arg(long)]
        prenom: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        login: Option<String>,
        /// New password; omitted leaves the current one unchanged
        #[arg(long)]
        password: Option<String>,
        #[arg(long, value_enum)]
        departement: Option<Role>,
    },
    /// Delete a staff account
    Delete { id: CollaboratorId },
}

impl CollaborateursCommand {
    pub fn name(&self) -> &'static str {
        match self {
            CollaborateursCommand::Create { .. } => "collaborateurs.create",
            CollaborateursCommand::List { .. } => "collaborateurs.list",
            CollaborateursCommand::Show { .. } => "collaborateurs.show",
            CollaborateursCommand::Update { .. } => "collaborateurs.update",
            CollaborateursCommand::Delete { .. } => "collaborateurs.delete",
        }
    }
}

pub async fn run(state: &AppState, command: CollaborateursCommand) -> Result<()> {
    match command {
        CollaborateursCommand::Create {
            nom,
            prenom,
            email,
            login,
            password,
            departement,
        } => create(state, nom, prenom, email, login, password, departement).await,
        CollaborateursCommand::List { departement } => list(state, departement).await,
        CollaborateursCommand::Show { id } => show(state, id).await,
        CollaborateursCommand::Update {
            id,
            nom,
            prenom,
            email,
            login,
            password,
            departement,
        } => update(state, id, nom, prenom, email, login, password, departement).await,
        CollaborateursCommand::Delete { id } => delete(state, id).await,
    }
}

/// "lecture" exists for required-role sets and read-only credentials, but no
/// collaborator belongs to it
fn validate_departement(departement: Role) -> Result<()> {
    if !Role::DEPARTMENTS.contains(&departement) {
        return Err(validation(format!("'{departement}' is not a department")));
    }
    Ok(())
}

async fn hash_password(state: &AppState, password: String) -> Result<String> {
    validate_password_length(&password, &state.config.auth.password)?;

    let params = password::Argon2Params::from(&state.config.auth.password);
    tokio::task::spawn_blocking(move || password::hash_string_with_params(&password, Some(params)))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("join password hashing task: {e}"),
        })?
}

async fn create(
    state: &AppState,
    nom: String,
    prenom: String,
    email: String,
    login: String,
    password: Option<String>,
    departement: Role,
) -> Result<()> {
    Guard::require(required_roles("collaborateurs.create")).authorize(state).await?;

    validate_non_empty("nom", &nom)?;
    validate_non_empty("prenom", &prenom)?;
    validate_email(&email)?;
    validate_login(&login)?;
    validate_departement(departement)?;

    // Keep the password off the command line (and out of shell history)
    // unless the caller insists on passing it as a flag
    let password = match password {
        Some(password) => password,
        None => crate::commands::auth::prompt_password()?,
    };
    let password_hash = hash_password(state, password).await?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let collaborator = Collaborators::new(&mut conn)
        .create(&CollaboratorCreateDBRequest {
            nom,
            prenom,
            email,
            login,
            password_hash,
            departement,
        })
        .await?;

    println!(
        "Created collaborator #{}: {} ({})",
        collaborator.id,
        collaborator.display_name(),
        collaborator.departement
    );
    Ok(())
}

async fn list(state: &AppState, departement: Option<Role>) -> Result<()> {
    Guard::require(required_roles("collaborateurs.list")).authorize(state).await?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let collaborators = Collaborators::new(&mut conn).list(&CollaboratorFilter { departement }).await?;

    if collaborators.is_empty() {
        println!("No collaborators.");
        return Ok(());
    }

    for collaborator in &collaborators {
        print_row(collaborator);
    }

    Ok(())
}

async fn show(state: &AppState, id: CollaboratorId) -> Result<()> {
    Guard::require(required_roles("collaborateurs.show")).authorize(state).await?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let collaborator = Collaborators::new(&mut conn).get_by_id(id).await?.ok_or(DbError::NotFound)?;

    print_row(&collaborator);
    println!("  joined {}", collaborator.created_at.format("%Y-%m-%d"));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn update(
    state: &AppState,
    id: CollaboratorId,
    nom: Option<String>,
    prenom: Option<String>,
    email: Option<String>,
    login: Option<String>,
    password: Option<String>,
    departement: Option<Role>,
) -> Result<()> {
    Guard::require(required_roles("collaborateurs.update")).authorize(state).await?;

    if let Some(nom) = &nom {
        validate_non_empty("nom", nom)?;
    }
    if let Some(prenom) = &prenom {
        validate_non_empty("prenom", prenom)?;
    }
    if let Some(email) = &email {
        validate_email(email)?;
    }
    if let Some(login) = &login {
        validate_login(login)?;
    }
    if let Some(departement) = departement {
        validate_departement(departement)?;
    }

    let password_hash = match password {
        Some(password) => Some(hash_password(state, password).await?),
        None => None,
    };

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let updated = Collaborators::new(&mut conn)
        .update(
            id,
            &CollaboratorUpdateDBRequest {
                nom,
                prenom,
                email,
                login,
                departement,
                password_hash,
            },
        )
        .await?;

    println!("Updated collaborator #{}: {} ({})", updated.id, updated.display_name(), updated.departement);
    Ok(())
}

async fn delete(state: &AppState, id: CollaboratorId) -> Result<()> {
    Guard::require(required_roles("collaborateurs.delete")).authorize(state).await?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    if Collaborators::new(&mut conn).delete(id).await? {
        println!("Deleted collaborator #{id}");
        Ok(())
    } else {
        Err(DbError::NotFound.into())
    }
}

fn print_row(collaborator: &Collaborator) {
    println!(
        "#{:<4} {:<24} {:<28} {:<12} {}",
        collaborator.id,
        collaborator.display_name(),
        collaborator.email,
        collaborator.departement,
        collaborator.login,
    );
}
