//! SurrealDB implementation of [`EntitlementRepository`].
//!
//! Two edge tables hold the entitlement graph:
//! - `permits`: `business_type -> resource`, the maximal set a type may
//!   enable
//! - `configures`: `business -> resource` with an `is_active` flag, what
//!   one business has actually turned on
//!
//! The repository stores whatever it is given. Rejecting configuration
//! outside the permitted set is the caller's job.

use std::collections::HashMap;

use reservo_core::error::ReservoResult;
use reservo_core::models::entitlement::ConfiguredResource;
use reservo_core::models::resource::Resource;
use reservo_core::repository::EntitlementRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use super::resource::ResourceRow;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ConfiguredRow {
    resource_id: String,
    is_active: bool,
}

fn collect(rows: Vec<ResourceRow>) -> Result<Vec<Resource>, DbError> {
    rows.into_iter()
        .map(ResourceRow::try_into_resource)
        .collect()
}

/// SurrealDB implementation of the Entitlement repository.
#[derive(Clone)]
pub struct SurrealEntitlementRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealEntitlementRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> EntitlementRepository for SurrealEntitlementRepository<C> {
    async fn permit_resource(&self, business_type_id: Uuid, resource_id: Uuid) -> ReservoResult<()> {
        let query = format!(
            "DELETE permits WHERE \
             in = business_type:`{business_type_id}` AND out = resource:`{resource_id}`; \
             RELATE business_type:`{business_type_id}` -> permits -> resource:`{resource_id}`;"
        );

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        Ok(())
    }

    async fn forbid_resource(&self, business_type_id: Uuid, resource_id: Uuid) -> ReservoResult<()> {
        self.db
            .query(
                "DELETE permits WHERE \
                 in = type::record('business_type', $business_type_id) AND \
                 out = type::record('resource', $resource_id)",
            )
            .bind(("business_type_id", business_type_id.to_string()))
            .bind(("resource_id", resource_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        Ok(())
    }

    async fn get_permitted_resources(&self, business_type_id: Uuid) -> ReservoResult<Vec<Resource>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM resource \
                 WHERE id IN (SELECT VALUE out FROM permits \
                 WHERE in = type::record('business_type', $business_type_id)) \
                 ORDER BY code ASC",
            )
            .bind(("business_type_id", business_type_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        Ok(collect(rows)?)
    }

    async fn configure_resource(
        &self,
        business_id: Uuid,
        resource_id: Uuid,
        is_active: bool,
    ) -> ReservoResult<()> {
        let query = format!(
            "DELETE configures WHERE \
             in = business:`{business_id}` AND out = resource:`{resource_id}`; \
             RELATE business:`{business_id}` -> configures -> resource:`{resource_id}` \
             SET is_active = $is_active, updated_at = time::now();"
        );

        self.db
            .query(query)
            .bind(("is_active", is_active))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        Ok(())
    }

    async fn remove_configured_resource(
        &self,
        business_id: Uuid,
        resource_id: Uuid,
    ) -> ReservoResult<()> {
        self.db
            .query(
                "DELETE configures WHERE \
                 in = type::record('business', $business_id) AND \
                 out = type::record('resource', $resource_id)",
            )
            .bind(("business_id", business_id.to_string()))
            .bind(("resource_id", resource_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        Ok(())
    }

    async fn get_configured_resources(
        &self,
        business_id: Uuid,
    ) -> ReservoResult<Vec<ConfiguredResource>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(out) AS resource_id, is_active FROM configures \
                 WHERE in = type::record('business', $business_id); \
                 SELECT meta::id(id) AS record_id, * FROM resource \
                 WHERE id IN (SELECT VALUE out FROM configures \
                 WHERE in = type::record('business', $business_id)) \
                 ORDER BY code ASC;",
            )
            .bind(("business_id", business_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let links: Vec<ConfiguredRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<ResourceRow> = result.take(1).map_err(DbError::from)?;

        let flags = links
            .iter()
            .map(|l| Ok((parse_uuid("resource_id", &l.resource_id)?, l.is_active)))
            .collect::<Result<HashMap<_, _>, DbError>>()?;

        // Edges pointing at deleted resources have no row and drop out.
        let configured = collect(rows)?
            .into_iter()
            .filter_map(|resource| {
                flags.get(&resource.id).map(|&is_active| ConfiguredResource {
                    business_id,
                    resource,
                    is_active,
                })
            })
            .collect();

        Ok(configured)
    }
}
