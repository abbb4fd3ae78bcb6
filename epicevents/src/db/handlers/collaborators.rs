//! Database repository for collaborators.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::collaborators::{Collaborator, CollaboratorCreateDBRequest, CollaboratorUpdateDBRequest, Role},
};
use crate::types::CollaboratorId;
use chrono::Utc;
use sqlx::{Connection, SqliteConnection};
use tracing::instrument;

/// Filter for listing collaborators
#[derive(Debug, Clone, Default)]
pub struct CollaboratorFilter {
    pub departement: Option<Role>,
}

pub struct Collaborators<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Collaborators<'c> {
    type CreateRequest = CollaboratorCreateDBRequest;
    type UpdateRequest = CollaboratorUpdateDBRequest;
    type Response = Collaborator;
    type Id = CollaboratorId;
    type Filter = CollaboratorFilter;

    #[instrument(skip(self, request), fields(login = %request.login), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let collaborator = sqlx::query_as::<_, Collaborator>(
            r#"
            INSERT INTO collaborators (nom, prenom, email, login, password_hash, departement, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&request.nom)
        .bind(&request.prenom)
        .bind(&request.email)
        .bind(&request.login)
        .bind(&request.password_hash)
        .bind(request.departement)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(collaborator)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let collaborator = sqlx::query_as::<_, Collaborator>("SELECT * FROM collaborators WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(collaborator)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = sqlx::QueryBuilder::new("SELECT * FROM collaborators WHERE 1=1");

        if let Some(departement) = filter.departement {
            query.push(" AND departement = ");
            query.push_bind(departement);
        }

        query.push(" ORDER BY id");

        let collaborators = query.build_query_as::<Collaborator>().fetch_all(&mut *self.db).await?;

        Ok(collaborators)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        let target = sqlx::query_as::<_, Collaborator>("SELECT * FROM collaborators WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(target) = target else {
            return Ok(false);
        };

        // The system must always keep one management account able to manage
        // the others.
        if target.departement == Role::Gestion {
            let gestion_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM collaborators WHERE departement = ?")
                .bind(Role::Gestion)
                .fetch_one(&mut *tx)
                .await?;

            if gestion_count <= 1 {
                return Err(DbError::ProtectedEntity {
                    operation: "delete".to_string(),
                    reason: "it is the last management account".to_string(),
                    entity_type: "collaborator".to_string(),
                    entity_id: Some(id.to_string()),
                });
            }
        }

        let result = sqlx::query("DELETE FROM collaborators WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let collaborator = sqlx::query_as::<_, Collaborator>(
            r#"
            UPDATE collaborators SET
                nom = COALESCE(?, nom),
                prenom = COALESCE(?, prenom),
                email = COALESCE(?, email),
                login = COALESCE(?, login),
                departement = COALESCE(?, departement),
                password_hash = COALESCE(?, password_hash)
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&request.nom)
        .bind(&request.prenom)
        .bind(&request.email)
        .bind(&request.login)
        .bind(request.departement)
        .bind(&request.password_hash)
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(collaborator)
    }
}

impl<'c> Collaborators<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Look up a collaborator by login, for authentication
    #[instrument(skip(self, login), err)]
    pub async fn find_by_login(&mut self, login: &str) -> Result<Option<Collaborator>> {
        let collaborator = sqlx::query_as::<_, Collaborator>("SELECT * FROM collaborators WHERE login = ?")
            .bind(login)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(collaborator)
    }

    /// Replace the stored password hash, used for transparent rehash upgrades
    #[instrument(skip(self, password_hash), err)]
    pub async fn update_password_hash(&mut self, id: CollaboratorId, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE collaborators SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use sqlx::SqlitePool;

    fn create_request(login: &str, departement: Role) -> CollaboratorCreateDBRequest {
        CollaboratorCreateDBRequest {
            nom: "Martin".to_string(),
            prenom: "Sophie".to_string(),
            email: format!("{login}@epicevents.example"),
            login: login.to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g".to_string(),
            departement,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_collaborator(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Collaborators::new(&mut conn);

        let created = repo.create(&create_request("smartin", Role::Commercial)).await.unwrap();

        assert_eq!(created.login, "smartin");
        assert_eq!(created.departement, Role::Commercial);
        assert_eq!(created.display_name(), "Sophie Martin");

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.email, "smartin@epicevents.example");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_find_by_login(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Collaborators::new(&mut conn);

        let created = repo.create(&create_request("jdoe", Role::Support)).await.unwrap();

        let found = repo.find_by_login("jdoe").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        assert!(repo.find_by_login("nobody").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_login_is_a_unique_violation(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Collaborators::new(&mut conn);

        repo.create(&create_request("dup", Role::Commercial)).await.unwrap();

        let mut second = create_request("dup", Role::Support);
        second.email = "other@epicevents.example".to_string();
        let result = repo.create(&second).await;

        match result {
            Err(DbError::UniqueViolation { constraint, .. }) => {
                assert_eq!(constraint.as_deref(), Some("collaborators.login"));
            }
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_changes_departement(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Collaborators::new(&mut conn);

        let created = repo.create(&create_request("mover", Role::Commercial)).await.unwrap();

        let updated = repo
            .update(
                created.id,
                &CollaboratorUpdateDBRequest {
                    departement: Some(Role::Support),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.departement, Role::Support);
        // Untouched fields survive
        assert_eq!(updated.login, "mover");
        assert_eq!(updated.email, created.email);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_missing_collaborator_is_not_found(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Collaborators::new(&mut conn);

        let result = repo
            .update(
                9999,
                &CollaboratorUpdateDBRequest {
                    nom: Some("Ghost".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(DbError::NotFound)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_by_departement(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Collaborators::new(&mut conn);

        repo.create(&create_request("g1", Role::Gestion)).await.unwrap();
        repo.create(&create_request("c1", Role::Commercial)).await.unwrap();
        repo.create(&create_request("c2", Role::Commercial)).await.unwrap();

        let all = repo.list(&CollaboratorFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let commercials = repo
            .list(&CollaboratorFilter {
                departement: Some(Role::Commercial),
            })
            .await
            .unwrap();
        assert_eq!(commercials.len(), 2);
        assert!(commercials.iter().all(|c| c.departement == Role::Commercial));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_collaborator(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Collaborators::new(&mut conn);

        let created = repo.create(&create_request("victim", Role::Support)).await.unwrap();

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        // Second delete reports nothing to do
        assert!(!repo.delete(created.id).await.unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_last_gestion_is_refused(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Collaborators::new(&mut conn);

        let only_gestion = repo.create(&create_request("boss", Role::Gestion)).await.unwrap();
        repo.create(&create_request("other", Role::Commercial)).await.unwrap();

        let result = repo.delete(only_gestion.id).await;
        assert!(matches!(result, Err(DbError::ProtectedEntity { .. })));

        // Still there
        assert!(repo.get_by_id(only_gestion.id).await.unwrap().is_some());

        // With a second management account the delete goes through
        let second_gestion = repo.create(&create_request("boss2", Role::Gestion)).await.unwrap();
        assert!(repo.delete(only_gestion.id).await.unwrap());
        assert!(repo.get_by_id(second_gestion.id).await.unwrap().is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_password_hash(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Collaborators::new(&mut conn);

        let created = repo.create(&create_request("rehash", Role::Commercial)).await.unwrap();

        repo.update_password_hash(created.id, "$argon2id$v=19$m=65536,t=3,p=4$bmV3$bmV3").await.unwrap();

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert!(fetched.password_hash.starts_with("$argon2id$v=19$m=65536"));

        let missing = repo.update_password_hash(9999, "$argon2id$x").await;
        assert!(matches!(missing, Err(DbError::NotFound)));
    }
}
