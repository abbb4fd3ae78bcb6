//! Database repository for clients.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::clients::{Client, ClientCreateDBRequest, ClientUpdateDBRequest},
};
use crate::types::{ClientId, CollaboratorId};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::instrument;

/// Filter for listing clients
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    /// Restrict to clients handled by this commercial
    pub commercial_id: Option<CollaboratorId>,
}

pub struct Clients<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Clients<'c> {
    type CreateRequest = ClientCreateDBRequest;
    type UpdateRequest = ClientUpdateDBRequest;
    type Response = Client;
    type Id = ClientId;
    type Filter = ClientFilter;

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (nom_complet, email, telephone, nom_entreprise, commercial_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&request.nom_complet)
        .bind(&request.email)
        .bind(&request.telephone)
        .bind(&request.nom_entreprise)
        .bind(request.commercial_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(client)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(client)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = sqlx::QueryBuilder::new("SELECT * FROM clients WHERE 1=1");

        if let Some(commercial_id) = filter.commercial_id {
            query.push(" AND commercial_id = ");
            query.push_bind(commercial_id);
        }

        query.push(" ORDER BY id");

        let clients = query.build_query_as::<Client>().fetch_all(&mut *self.db).await?;

        Ok(clients)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM clients WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients SET
                nom_complet = COALESCE(?, nom_complet),
                email = COALESCE(?, email),
                telephone = COALESCE(?, telephone),
                nom_entreprise = COALESCE(?, nom_entreprise),
                commercial_id = COALESCE(?, commercial_id),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&request.nom_complet)
        .bind(&request.email)
        .bind(&request.telephone)
        .bind(&request.nom_entreprise)
        .bind(request.commercial_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(client)
    }
}

impl<'c> Clients<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }
}
