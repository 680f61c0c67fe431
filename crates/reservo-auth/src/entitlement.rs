//! Business entitlement resolution and administration.
//!
//! A business may use a resource only when its type permits it and the
//! business has it configured and active. Writes go through
//! [`EntitlementService`], which validates against the permitted set
//! and invalidates the resolver cache for every affected business.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use reservo_core::error::{ReservoError, ReservoResult};
use reservo_core::models::business::{Business, UpdateBusiness};
use reservo_core::models::entitlement::ConfiguredResource;
use reservo_core::models::resource::Resource;
use reservo_core::repository::{BusinessRepository, EntitlementRepository, EntitlementStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{EntitledResources, EntitlementCache};
use crate::config::AuthConfig;
use crate::deadline::within;

/// Active configured resources that the type also permits.
///
/// Configured rows outside the permitted set are dropped and reported;
/// they indicate drift between the two tables, not a caller error.
pub fn intersect(
    business_id: Uuid,
    permitted: &[Resource],
    configured: &[ConfiguredResource],
) -> BTreeSet<String> {
    let permitted: HashSet<&str> = permitted.iter().map(|r| r.code.as_str()).collect();

    configured
        .iter()
        .filter(|c| c.is_active)
        .filter_map(|c| {
            let code = c.resource.code.as_str();
            if permitted.contains(code) {
                Some(code.to_string())
            } else {
                warn!(
                    %business_id,
                    resource = code,
                    "configured resource is not permitted for the business type; ignoring"
                );
                None
            }
        })
        .collect()
}

/// Resolves and caches the entitled resource codes of a business.
pub struct EntitlementResolver<S> {
    store: Arc<S>,
    cache: EntitlementCache,
    timeout: Duration,
}

impl<S: EntitlementStore> EntitlementResolver<S> {
    pub fn new(store: Arc<S>, config: &AuthConfig) -> Self {
        Self {
            store,
            cache: EntitlementCache::new(config.entitlement_cache_ttl()),
            timeout: config.resolution_timeout(),
        }
    }

    /// Resource codes `business_id` may use.
    ///
    /// `NotFound` if the business does not exist, `Inactive` if it is
    /// disabled.
    pub async fn resolve_entitled_resources(
        &self,
        business_id: Uuid,
    ) -> ReservoResult<EntitledResources> {
        within(
            "entitlement resolution",
            self.timeout,
            None,
            self.resolve_cached(business_id),
        )
        .await
    }

    /// Like [`Self::resolve_entitled_resources`], abandoning the work
    /// when `cancel` fires.
    pub async fn resolve_entitled_resources_until(
        &self,
        business_id: Uuid,
        cancel: &CancellationToken,
    ) -> ReservoResult<EntitledResources> {
        within(
            "entitlement resolution",
            self.timeout,
            Some(cancel),
            self.resolve_cached(business_id),
        )
        .await
    }

    /// Cached resolution without a deadline of its own; callers wrap it.
    pub(crate) async fn resolve_cached(&self, business_id: Uuid) -> ReservoResult<EntitledResources> {
        self.cache
            .get_or_load(business_id, || self.load(business_id))
            .await
    }

    pub fn invalidate(&self, business_id: Uuid) {
        debug!(%business_id, "entitlement cache invalidated");
        self.cache.invalidate(business_id);
    }

    pub fn invalidate_many(&self, business_ids: Vec<Uuid>) {
        debug!(count = business_ids.len(), "entitlement cache invalidated");
        self.cache.invalidate_many(business_ids);
    }

    async fn load(&self, business_id: Uuid) -> ReservoResult<BTreeSet<String>> {
        let business = self.store.businesses().get_by_id(business_id).await?;
        if !business.is_active {
            return Err(ReservoError::inactive("business", business_id));
        }

        let entitlements = self.store.entitlements();
        let permitted = entitlements
            .get_permitted_resources(business.business_type_id)
            .await?;
        let configured = entitlements.get_configured_resources(business_id).await?;

        Ok(intersect(business_id, &permitted, &configured))
    }
}

/// Write side of the entitlement graph.
pub struct EntitlementService<S> {
    store: Arc<S>,
    resolver: Arc<EntitlementResolver<S>>,
}

impl<S: EntitlementStore> EntitlementService<S> {
    pub fn new(store: Arc<S>, resolver: Arc<EntitlementResolver<S>>) -> Self {
        Self { store, resolver }
    }

    /// Allow every business of `business_type_id` to enable a resource.
    pub async fn permit_resource(&self, business_type_id: Uuid, resource_id: Uuid) -> ReservoResult<()> {
        self.store
            .entitlements()
            .permit_resource(business_type_id, resource_id)
            .await?;
        info!(%business_type_id, %resource_id, "resource permitted for business type");
        self.invalidate_type(business_type_id).await
    }

    /// Withdraw a resource from a business type.
    ///
    /// Existing configuration rows stay in place and are filtered out at
    /// read time.
    pub async fn forbid_resource(&self, business_type_id: Uuid, resource_id: Uuid) -> ReservoResult<()> {
        self.store
            .entitlements()
            .forbid_resource(business_type_id, resource_id)
            .await?;
        info!(%business_type_id, %resource_id, "resource forbidden for business type");
        self.invalidate_type(business_type_id).await
    }

    /// Turn a resource on or off for one business.
    ///
    /// Rejects resources the business's type does not permit.
    pub async fn configure_resource(
        &self,
        business_id: Uuid,
        resource_id: Uuid,
        is_active: bool,
    ) -> ReservoResult<()> {
        let business = self.store.businesses().get_by_id(business_id).await?;
        let permitted = self
            .store
            .entitlements()
            .get_permitted_resources(business.business_type_id)
            .await?;
        if !permitted.iter().any(|r| r.id == resource_id) {
            return Err(ReservoError::validation(format!(
                "resource {resource_id} is not permitted for business type {}",
                business.business_type_id
            )));
        }

        self.store
            .entitlements()
            .configure_resource(business_id, resource_id, is_active)
            .await?;
        info!(%business_id, %resource_id, is_active, "business resource configured");
        self.resolver.invalidate(business_id);
        Ok(())
    }

    pub async fn remove_configured_resource(&self, business_id: Uuid, resource_id: Uuid) -> ReservoResult<()> {
        self.store
            .entitlements()
            .remove_configured_resource(business_id, resource_id)
            .await?;
        info!(%business_id, %resource_id, "business resource removed");
        self.resolver.invalidate(business_id);
        Ok(())
    }

    /// Enable or disable a business; disabled businesses resolve to
    /// `Inactive`.
    pub async fn set_business_active(&self, business_id: Uuid, is_active: bool) -> ReservoResult<Business> {
        let business = self
            .store
            .businesses()
            .update(
                business_id,
                UpdateBusiness {
                    is_active: Some(is_active),
                    ..Default::default()
                },
            )
            .await?;
        info!(%business_id, is_active, "business activation changed");
        self.resolver.invalidate(business_id);
        Ok(business)
    }

    async fn invalidate_type(&self, business_type_id: Uuid) -> ReservoResult<()> {
        let ids = self
            .store
            .businesses()
            .list_ids_by_type(business_type_id)
            .await?;
        self.resolver.invalidate_many(ids);
        Ok(())
    }
}
