//! Database repository for contracts.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::contracts::{Contract, ContractCreateDBRequest, ContractUpdateDBRequest},
};
use crate::types::{ClientId, CollaboratorId, ContractId};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::instrument;

/// Filter for listing contracts
#[derive(Debug, Clone, Default)]
pub struct ContractFilter {
    pub client_id: Option<ClientId>,
    /// Restrict to contracts of clients handled by this commercial
    pub commercial_id: Option<CollaboratorId>,
    /// Only contracts that are not signed yet
    pub unsigned: bool,
    /// Only contracts with an outstanding amount
    pub unpaid: bool,
}

pub struct Contracts<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Contracts<'c> {
    type CreateRequest = ContractCreateDBRequest;
    type UpdateRequest = ContractUpdateDBRequest;
    type Response = Contract;
    type Id = ContractId;
    type Filter = ContractFilter;

    #[instrument(skip(self, request), fields(client_id = request.client_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let contract = sqlx::query_as::<_, Contract>(
            r#"
            INSERT INTO contracts (client_id, montant_total, montant_restant, signed, created_at)
            VALUES (?, ?, ?, FALSE, ?)
            RETURNING *
            "#,
        )
        .bind(request.client_id)
        .bind(request.montant_total)
        .bind(request.montant_restant)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(contract)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let contract = sqlx::query_as::<_, Contract>("SELECT * FROM contracts WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(contract)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = sqlx::QueryBuilder::new(
            "SELECT contracts.* FROM contracts JOIN clients ON clients.id = contracts.client_id WHERE 1=1",
        );

        if let Some(client_id) = filter.client_id {
            query.push(" AND contracts.client_id = ");
            query.push_bind(client_id);
        }

        if let Some(commercial_id) = filter.commercial_id {
            query.push(" AND clients.commercial_id = ");
            query.push_bind(commercial_id);
        }

        if filter.unsigned {
            query.push(" AND contracts.signed = FALSE");
        }

        if filter.unpaid {
            query.push(" AND contracts.montant_restant > 0");
        }

        query.push(" ORDER BY contracts.id");

        let contracts = query.build_query_as::<Contract>().fetch_all(&mut *self.db).await?;

        Ok(contracts)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contracts WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let contract = sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts SET
                montant_total = COALESCE(?, montant_total),
                montant_restant = COALESCE(?, montant_restant),
                signed = COALESCE(?, signed)
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(request.montant_total)
        .bind(request.montant_restant)
        .bind(request.signed)
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(contract)
    }
}

impl<'c> Contracts<'c> {
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
    use crate::db::models::clients::ClientCreateDBRequest;
    use crate::db::models::collaborators::{CollaboratorCreateDBRequest, Role};
    use sqlx::SqlitePool;

    async fn seed_client(pool: &SqlitePool, email: &str, commercial_login: &str) -> (CollaboratorId, ClientId) {
        let mut conn = pool.acquire().await.unwrap();

        let commercial = Collaborators::new(&mut conn)
            .create(&CollaboratorCreateDBRequest {
                nom: "Durand".to_string(),
                prenom: "Luc".to_string(),
                email: format!("{commercial_login}@epicevents.example"),
                login: commercial_login.to_string(),
                password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
                departement: Role::Commercial,
            })
            .await
            .unwrap();

        let client = Clients::new(&mut conn)
            .create(&ClientCreateDBRequest {
                nom_complet: "Kevin Casey".to_string(),
                email: email.to_string(),
                telephone: None,
                nom_entreprise: None,
                commercial_id: Some(commercial.id),
            })
            .await
            .unwrap();

        (commercial.id, client.id)
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_contract_starts_unsigned(pool: SqlitePool) {
        let (_, client_id) = seed_client(&pool, "kevin@startup.io", "luc").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Contracts::new(&mut conn);

        let created = repo
            .create(&ContractCreateDBRequest {
                client_id,
                montant_total: 12000.0,
                montant_restant: 12000.0,
            })
            .await
            .unwrap();

        assert!(!created.signed);
        assert_eq!(created.montant_total, 12000.0);
        assert!(!created.is_fully_paid());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_montant_restant_above_total_is_a_check_violation(pool: SqlitePool) {
        let (_, client_id) = seed_client(&pool, "kevin@startup.io", "luc").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Contracts::new(&mut conn);

        let result = repo
            .create(&ContractCreateDBRequest {
                client_id,
                montant_total: 1000.0,
                montant_restant: 2000.0,
            })
            .await;

        assert!(matches!(result, Err(DbError::CheckViolation { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters(pool: SqlitePool) {
        let (luc, client_a) = seed_client(&pool, "a@startup.io", "luc").await;
        let (_lea, client_b) = seed_client(&pool, "b@startup.io", "lea").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Contracts::new(&mut conn);

        let signed_paid = repo
            .create(&ContractCreateDBRequest {
                client_id: client_a,
                montant_total: 1000.0,
                montant_restant: 1000.0,
            })
            .await
            .unwrap();
        repo.update(
            signed_paid.id,
            &ContractUpdateDBRequest {
                signed: Some(true),
                montant_restant: Some(0.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        repo.create(&ContractCreateDBRequest {
            client_id: client_b,
            montant_total: 5000.0,
            montant_restant: 2500.0,
        })
        .await
        .unwrap();

        let unsigned = repo
            .list(&ContractFilter {
                unsigned: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(unsigned.len(), 1);
        assert_eq!(unsigned[0].client_id, client_b);

        let unpaid = repo
            .list(&ContractFilter {
                unpaid: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(unpaid.len(), 1);
        assert_eq!(unpaid[0].montant_restant, 2500.0);

        let lucs = repo
            .list(&ContractFilter {
                commercial_id: Some(luc),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(lucs.len(), 1);
        assert_eq!(lucs[0].id, signed_paid.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_missing_contract_is_not_found(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Contracts::new(&mut conn);

        let result = repo
            .update(
                9999,
                &ContractUpdateDBRequest {
                    signed: Some(true),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(DbError::NotFound)));
    }
}
