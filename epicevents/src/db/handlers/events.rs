//! Database repository for events.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::events::{Event, EventCreateDBRequest, EventUpdateDBRequest},
};
use crate::types::{CollaboratorId, ContractId, EventId};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::instrument;

/// Filter for listing events
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub contract_id: Option<ContractId>,
    /// Restrict to events assigned to this support collaborator
    pub support_id: Option<CollaboratorId>,
    /// Only events with no support assigned yet
    pub unassigned: bool,
}

pub struct Events<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Events<'c> {
    type CreateRequest = EventCreateDBRequest;
    type UpdateRequest = EventUpdateDBRequest;
    type Response = Event;
    type Id = EventId;
    type Filter = EventFilter;

    #[instrument(skip(self, request), fields(contract_id = request.contract_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (contract_id, support_id, date_debut, date_fin, lieu, participants, notes, created_at)
            VALUES (?, NULL, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(request.contract_id)
        .bind(request.date_debut)
        .bind(request.date_fin)
        .bind(&request.lieu)
        .bind(request.participants)
        .bind(&request.notes)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(event)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(event)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = sqlx::QueryBuilder::new("SELECT * FROM events WHERE 1=1");

        if let Some(contract_id) = filter.contract_id {
            query.push(" AND contract_id = ");
            query.push_bind(contract_id);
        }

        if let Some(support_id) = filter.support_id {
            query.push(" AND support_id = ");
            query.push_bind(support_id);
        }

        if filter.unassigned {
            query.push(" AND support_id IS NULL");
        }

        query.push(" ORDER BY id");

        let events = query.build_query_as::<Event>().fetch_all(&mut *self.db).await?;

        Ok(events)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events SET
                support_id = COALESCE(?, support_id),
                date_debut = COALESCE(?, date_debut),
                date_fin = COALESCE(?, date_fin),
                lieu = COALESCE(?, lieu),
                participants = COALESCE(?, participants),
                notes = COALESCE(?, notes)
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(request.support_id)
        .bind(request.date_debut)
        .bind(request.date_fin)
        .bind(&request.lieu)
        .bind(request.participants)
        .bind(&request.notes)
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(event)
    }
}

impl<'c> Events<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use crate::db::handlers::clients::Clients;
    use crate::db::handlers::collaborators::Collaborators;
    use crate::db::handlers::contracts::Contracts;
    use crate::db::models::clients::ClientCreateDBRequest;
    use crate::db::models::collaborators::{CollaboratorCreateDBRequest, Role};
    use crate::db::models::contracts::ContractCreateDBRequest;
    use chrono::{Duration, Utc};
    use sqlx::SqlitePool;

    async fn seed_contract(pool: &SqlitePool) -> ContractId {
        let mut conn = pool.acquire().await.unwrap();

        let commercial = Collaborators::new(&mut conn)
            .create(&CollaboratorCreateDBRequest {
                nom: "Durand".to_string(),
                prenom: "Luc".to_string(),
                email: "luc@epicevents.example".to_string(),
                login: "luc".to_string(),
                password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
                departement: Role::Commercial,
            })
            .await
            .unwrap();

        let client = Clients::new(&mut conn)
            .create(&ClientCreateDBRequest {
                nom_complet: "Kevin Casey".to_string(),
                email: "kevin@startup.io".to_string(),
                telephone: None,
                nom_entreprise: None,
                commercial_id: Some(commercial.id),
            })
            .await
            .unwrap();

        Contracts::new(&mut conn)
            .create(&ContractCreateDBRequest {
                client_id: client.id,
                montant_total: 4000.0,
                montant_restant: 4000.0,
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_support(pool: &SqlitePool, login: &str) -> CollaboratorId {
        let mut conn = pool.acquire().await.unwrap();
        Collaborators::new(&mut conn)
            .create(&CollaboratorCreateDBRequest {
                nom: "Moreau".to_string(),
                prenom: "Alice".to_string(),
                email: format!("{login}@epicevents.example"),
                login: login.to_string(),
                password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
                departement: Role::Support,
            })
            .await
            .unwrap()
            .id
    }

    fn create_request(contract_id: ContractId) -> EventCreateDBRequest {
        let start = Utc::now() + Duration::days(30);
        EventCreateDBRequest {
            contract_id,
            date_debut: start,
            date_fin: start + Duration::hours(8),
            lieu: "53 Rue du Chateau, Candé-sur-Beuvron".to_string(),
            participants: 75,
            notes: Some("Wedding reception".to_string()),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_event_without_support(pool: SqlitePool) {
        let contract_id = seed_contract(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Events::new(&mut conn);

        let created = repo.create(&create_request(contract_id)).await.unwrap();

        assert_eq!(created.contract_id, contract_id);
        assert!(created.support_id.is_none());
        assert_eq!(created.participants, 75);
        assert!(created.date_fin > created.date_debut);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_assigning_support_via_update(pool: SqlitePool) {
        let contract_id = seed_contract(&pool).await;
        let support_id = seed_support(&pool, "alice").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Events::new(&mut conn);

        let created = repo.create(&create_request(contract_id)).await.unwrap();

        let updated = repo
            .update(
                created.id,
                &EventUpdateDBRequest {
                    support_id: Some(support_id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.support_id, Some(support_id));
        // Logistics untouched
        assert_eq!(updated.lieu, created.lieu);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_unassigned_and_mine(pool: SqlitePool) {
        let contract_id = seed_contract(&pool).await;
        let support_id = seed_support(&pool, "alice").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Events::new(&mut conn);

        let assigned = repo.create(&create_request(contract_id)).await.unwrap();
        repo.update(
            assigned.id,
            &EventUpdateDBRequest {
                support_id: Some(support_id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let orphan = repo.create(&create_request(contract_id)).await.unwrap();

        let unassigned = repo
            .list(&EventFilter {
                unassigned: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].id, orphan.id);

        let mine = repo
            .list(&EventFilter {
                support_id: Some(support_id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, assigned.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_zero_participants_is_a_check_violation(pool: SqlitePool) {
        let contract_id = seed_contract(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Events::new(&mut conn);

        let mut request = create_request(contract_id);
        request.participants = 0;
        let result = repo.create(&request).await;

        assert!(matches!(result, Err(DbError::CheckViolation { .. })));
    }
}
