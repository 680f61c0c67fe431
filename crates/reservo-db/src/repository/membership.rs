//! SurrealDB implementation of [`MembershipRepository`].
//!
//! Membership is a `member_of` edge from `user` to `business`.

use reservo_core::error::ReservoResult;
use reservo_core::models::business::Business;
use reservo_core::repository::MembershipRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::business::BusinessRow;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Membership repository.
#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn add_member(&self, user_id: Uuid, business_id: Uuid) -> ReservoResult<()> {
        if self.is_member(user_id, business_id).await? {
            return Ok(());
        }

        let query = format!(
            "RELATE user:`{user_id}` -> member_of -> business:`{business_id}`;"
        );
        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        Ok(())
    }

    async fn remove_member(&self, user_id: Uuid, business_id: Uuid) -> ReservoResult<()> {
        self.db
            .query(
                "DELETE member_of WHERE \
                 in = type::record('user', $user_id) AND \
                 out = type::record('business', $business_id)",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("business_id", business_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        Ok(())
    }

    async fn get_user_businesses(&self, user_id: Uuid) -> ReservoResult<Vec<Business>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM business \
                 WHERE id IN (SELECT VALUE out FROM member_of \
                 WHERE in = type::record('user', $user_id)) \
                 ORDER BY created_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BusinessRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(BusinessRow::try_into_business)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn is_member(&self, user_id: Uuid, business_id: Uuid) -> ReservoResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM member_of WHERE \
                 in = type::record('user', $user_id) AND \
                 out = type::record('business', $business_id) GROUP ALL",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("business_id", business_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().is_some_and(|r| r.total > 0))
    }
}
