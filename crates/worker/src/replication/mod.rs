//! Dual-store replication of a bundle.
//!
//! A bundle is listed twice: as an `ACTIVE` product on the internal store
//! and as a `DRAFT` product on the vendor store that owns it. [`Replicator`]
//! drives one bundle through the stages recorded on
//! [`ReplicationProgress`](bundle_relay_core::ReplicationProgress):
//!
//! ```text
//! pending -> created_internal -> created_vendor -> variants_set -> inventory_set -> done
//! ```
//!
//! Every stage is persisted as soon as it completes, so a failed attempt
//! resumes where it stopped on the next tick instead of creating duplicate
//! products. `done` is only written by the final commit, together with
//! `is_created_on_shopify`.
//!
//! Packaging stock is read once per attempt and never decremented here; two
//! bundles sharing a packaging pool can both list the full remaining count.

pub mod listing;
pub mod variants;

use std::fmt;
use std::sync::Arc;

use bundle_relay_core::{
    Bundle, BundleId, ProductStatus, RemoteListing, RemoteVariantRef, ReplicationProgress,
    ReplicationStage, Store, VariantCrossMap,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{Catalog, ReplicationCommit};
use crate::claims::{ClaimError, ClaimKey, ClaimRegistry, release_quietly};
use crate::db::RepositoryError;
use crate::shopify::types::{InventoryAdjustInput, ProductVariant};
use crate::shopify::{QueryExecutor, ShopifyError, StoreApi};

use self::listing::{media_inputs, product_input};
use self::variants::{VariantPlan, inventory_changes, pick_location, variant_writes};

/// Metadata key holding the vendor product id.
pub const VENDOR_PRODUCT_KEY: &str = "vendorShopifyId";
/// Metadata key holding the internal-to-vendor variant map.
pub const VARIANT_MAPPING_KEY: &str = "variantMapping";

/// Step of a replication attempt, reported with failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationStep {
    LoadBundle,
    LoadPackaging,
    CreateInternal,
    CreateVendor,
    Variants,
    Locations,
    Inventory,
    RecordProgress,
    Commit,
}

impl ReplicationStep {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoadBundle => "load_bundle",
            Self::LoadPackaging => "load_packaging",
            Self::CreateInternal => "create_internal",
            Self::CreateVendor => "create_vendor",
            Self::Variants => "variants",
            Self::Locations => "locations",
            Self::Inventory => "inventory",
            Self::RecordProgress => "record_progress",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for ReplicationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a replication attempt.
#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("{step} failed on {store}: {source}")]
    Remote {
        step: ReplicationStep,
        store: String,
        #[source]
        source: ShopifyError,
    },

    #[error("{step} failed: {source}")]
    Catalog {
        step: ReplicationStep,
        #[source]
        source: RepositoryError,
    },

    #[error("could not encode {step} payload: {source}")]
    Payload {
        step: ReplicationStep,
        #[source]
        source: serde_json::Error,
    },

    #[error("{store} has no fulfillment location")]
    NoLocation { store: String },

    #[error("claim failed: {0}")]
    Claim(#[from] ClaimError),
}

impl ReplicationError {
    /// The step that failed, if the error is tied to one.
    #[must_use]
    pub const fn step(&self) -> Option<ReplicationStep> {
        match self {
            Self::Remote { step, .. } | Self::Catalog { step, .. } | Self::Payload { step, .. } => {
                Some(*step)
            }
            Self::NoLocation { .. } => Some(ReplicationStep::Locations),
            Self::Claim(_) => None,
        }
    }
}

/// What a replication attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationOutcome {
    /// Both listings exist and the bundle is marked replicated.
    Replicated {
        internal_product_id: String,
        vendor_product_id: String,
        mapped_variants: usize,
    },
    /// Another attempt holds the bundle's claim.
    AlreadyClaimed,
    /// The bundle was replicated or deactivated before the claim was taken.
    NotEligible,
    /// The bundle has no components; it stays eligible.
    NoComponents,
}

/// Settings of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationSettings {
    /// Fulfillment location stock is adjusted at when a store has it.
    pub default_location_name: String,
}

impl Default for ReplicationSettings {
    fn default() -> Self {
        Self {
            default_location_name: "Shop location".to_string(),
        }
    }
}

/// Which of the two listings a stage concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Internal,
    Vendor,
}

impl Side {
    const fn status(self) -> ProductStatus {
        match self {
            Self::Internal => ProductStatus::Active,
            Self::Vendor => ProductStatus::Draft,
        }
    }

    const fn stage(self) -> ReplicationStage {
        match self {
            Self::Internal => ReplicationStage::CreatedInternal,
            Self::Vendor => ReplicationStage::CreatedVendor,
        }
    }

    const fn step(self) -> ReplicationStep {
        match self {
            Self::Internal => ReplicationStep::CreateInternal,
            Self::Vendor => ReplicationStep::CreateVendor,
        }
    }

    const fn listing(self, progress: &ReplicationProgress) -> Option<&RemoteListing> {
        match self {
            Self::Internal => progress.internal.as_ref(),
            Self::Vendor => progress.vendor.as_ref(),
        }
    }

    const fn listing_mut(
        self,
        progress: &mut ReplicationProgress,
    ) -> Option<&mut RemoteListing> {
        match self {
            Self::Internal => progress.internal.as_mut(),
            Self::Vendor => progress.vendor.as_mut(),
        }
    }

    fn set(self, progress: &mut ReplicationProgress, listing: RemoteListing) {
        match self {
            Self::Internal => progress.internal = Some(listing),
            Self::Vendor => progress.vendor = Some(listing),
        }
        progress.stage = progress.stage.max(self.stage());
    }
}

fn remote(step: ReplicationStep, store: &Store) -> impl FnOnce(ShopifyError) -> ReplicationError {
    let store = store.label().to_string();
    move |source| ReplicationError::Remote {
        step,
        store,
        source,
    }
}

fn catalog(step: ReplicationStep) -> impl FnOnce(RepositoryError) -> ReplicationError {
    move |source| ReplicationError::Catalog { step, source }
}

fn payload(step: ReplicationStep) -> impl FnOnce(serde_json::Error) -> ReplicationError {
    move |source| ReplicationError::Payload { step, source }
}

/// Replicates bundles onto an internal and a vendor storefront.
pub struct Replicator<C, E, K> {
    catalog: Arc<C>,
    executor: Arc<E>,
    claims: Arc<K>,
    settings: Arc<ReplicationSettings>,
}

impl<C, E, K> Clone for Replicator<C, E, K> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            executor: Arc::clone(&self.executor),
            claims: Arc::clone(&self.claims),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<C, E, K> Replicator<C, E, K>
where
    C: Catalog,
    E: QueryExecutor,
    K: ClaimRegistry,
{
    #[must_use]
    pub fn new(
        catalog: Arc<C>,
        executor: Arc<E>,
        claims: Arc<K>,
        settings: ReplicationSettings,
    ) -> Self {
        Self {
            catalog,
            executor,
            claims,
            settings: Arc::new(settings),
        }
    }

    /// Replicate `bundle` onto `internal` and `vendor`.
    ///
    /// Holds the bundle's claim for the whole attempt and releases it on
    /// every path. The bundle is re-read under the claim, so a bundle
    /// committed by a concurrent attempt is not replicated twice.
    ///
    /// # Errors
    ///
    /// Returns `ReplicationError` naming the failed step. Stages completed
    /// before the failure stay recorded.
    #[instrument(
        skip_all,
        fields(bundle_id = %bundle.id, internal = %internal.label(), vendor = %vendor.label())
    )]
    pub async fn replicate(
        &self,
        bundle: &Bundle,
        internal: &Store,
        vendor: &Store,
    ) -> Result<ReplicationOutcome, ReplicationError> {
        let Some(claim) = self.claims.try_acquire(ClaimKey::Bundle(bundle.id)).await? else {
            debug!("Bundle is claimed by another attempt");
            return Ok(ReplicationOutcome::AlreadyClaimed);
        };

        let result = self.run(bundle.id, internal, vendor).await;
        release_quietly(self.claims.as_ref(), claim).await;
        result
    }

    async fn run(
        &self,
        bundle_id: BundleId,
        internal: &Store,
        vendor: &Store,
    ) -> Result<ReplicationOutcome, ReplicationError> {
        let bundle = self
            .catalog
            .bundle(bundle_id)
            .await
            .map_err(catalog(ReplicationStep::LoadBundle))?
            .ok_or(RepositoryError::NotFound)
            .map_err(catalog(ReplicationStep::LoadBundle))?;

        if !bundle.is_eligible() {
            debug!(status = %bundle.status, "Bundle no longer eligible");
            return Ok(ReplicationOutcome::NotEligible);
        }
        if bundle.components.is_empty() {
            warn!("Bundle has no components, skipping");
            return Ok(ReplicationOutcome::NoComponents);
        }

        let packaging_remaining = self.packaging_remaining(&bundle).await?;
        let plan = VariantPlan::for_bundle(&bundle, packaging_remaining);
        let mut progress = bundle.replication.clone();

        if progress.stage > ReplicationStage::Pending {
            info!(stage = %progress.stage, "Resuming replication");
        }

        let internal_listing = self
            .ensure_listing(&bundle, &plan, internal, Side::Internal, &mut progress)
            .await?;
        let vendor_listing = self
            .ensure_listing(&bundle, &plan, vendor, Side::Vendor, &mut progress)
            .await?;

        let internal_api = StoreApi::new(self.executor.as_ref(), internal);
        let vendor_api = StoreApi::new(self.executor.as_ref(), vendor);

        if !progress.reached(ReplicationStage::VariantsSet) {
            self.write_variants(internal_api, &internal_listing, &plan, bundle.track_inventory)
                .await?;
            self.write_variants(vendor_api, &vendor_listing, &plan, bundle.track_inventory)
                .await?;
            progress.stage = ReplicationStage::VariantsSet;
            self.record(bundle.id, &progress).await?;
        }

        let internal_variants = read_variants(internal_api, &internal_listing).await?;
        let vendor_variants = read_variants(vendor_api, &vendor_listing).await?;

        if !progress.reached(ReplicationStage::InventorySet) {
            let sides = [
                (Side::Internal, internal_api, &internal_variants),
                (Side::Vendor, vendor_api, &vendor_variants),
            ];
            for (side, api, variants) in sides {
                self.ensure_stocked(bundle.id, side, api, variants, &plan, &mut progress)
                    .await?;
            }
            progress.stage = ReplicationStage::InventorySet;
            self.record(bundle.id, &progress).await?;
        }

        let cross_map =
            VariantCrossMap::build(&refs(&internal_variants), &refs(&vendor_variants));
        if cross_map.len() < internal_variants.len() {
            warn!(
                internal = internal_variants.len(),
                mapped = cross_map.len(),
                "Some internal variants have no vendor counterpart"
            );
        }

        let mut metadata = bundle.metadata.clone();
        metadata.insert(
            VENDOR_PRODUCT_KEY.to_string(),
            Value::String(vendor_listing.product_id.clone()),
        );
        metadata.insert(
            VARIANT_MAPPING_KEY.to_string(),
            serde_json::to_value(&cross_map).map_err(payload(ReplicationStep::Commit))?,
        );
        progress.stage = ReplicationStage::Done;

        let commit = ReplicationCommit {
            shopify_product_id: internal_listing.product_id.clone(),
            handle: internal_listing.handle.clone(),
            metadata,
            progress,
        };
        self.catalog
            .complete_replication(bundle.id, &commit)
            .await
            .map_err(catalog(ReplicationStep::Commit))?;

        info!(
            internal_product_id = %internal_listing.product_id,
            vendor_product_id = %vendor_listing.product_id,
            mapped_variants = cross_map.len(),
            "Bundle replicated"
        );

        Ok(ReplicationOutcome::Replicated {
            internal_product_id: internal_listing.product_id,
            vendor_product_id: vendor_listing.product_id,
            mapped_variants: cross_map.len(),
        })
    }

    /// Packaging stock of the bundle's owner store, if the bundle has packaging.
    async fn packaging_remaining(&self, bundle: &Bundle) -> Result<Option<i64>, ReplicationError> {
        let Some(packaging) = &bundle.packaging else {
            return Ok(None);
        };

        let stock = self
            .catalog
            .packaging_stock(bundle.owner.id, packaging.id)
            .await
            .map_err(catalog(ReplicationStep::LoadPackaging))?;

        if stock.is_none() {
            warn!(packaging_id = %packaging.id, "No packaging stock record, listing without packaging");
        }
        Ok(stock.map(|s| s.remaining))
    }

    /// The listing for `side`, created unless a previous attempt recorded it.
    async fn ensure_listing(
        &self,
        bundle: &Bundle,
        plan: &VariantPlan,
        store: &Store,
        side: Side,
        progress: &mut ReplicationProgress,
    ) -> Result<RemoteListing, ReplicationError> {
        if let Some(listing) = side.listing(progress) {
            debug!(product_id = %listing.product_id, step = %side.step(), "Listing already created");
            return Ok(listing.clone());
        }

        let input =
            product_input(bundle, &plan.groups, side.status()).map_err(payload(side.step()))?;
        let media = media_inputs(bundle);

        let created = StoreApi::new(self.executor.as_ref(), store)
            .create_product(&input, &media)
            .await
            .map_err(remote(side.step(), store))?;

        info!(product_id = %created.id, store = %store.label(), step = %side.step(), "Listing created");

        let listing = RemoteListing {
            product_id: created.id,
            handle: created.handle,
            stocked: false,
        };
        side.set(progress, listing.clone());
        self.record(bundle.id, progress).await?;

        Ok(listing)
    }

    /// Create the missing variants and bring existing ones to their pricing.
    async fn write_variants(
        &self,
        api: StoreApi<'_, E>,
        listing: &RemoteListing,
        plan: &VariantPlan,
        track_inventory: bool,
    ) -> Result<(), ReplicationError> {
        let store = api.store();
        let existing = read_variants(api, listing).await?;
        let writes = variant_writes(&plan.variants, &existing, track_inventory);

        if !writes.update.is_empty() {
            api.bulk_update_variants(&listing.product_id, &writes.update)
                .await
                .map_err(remote(ReplicationStep::Variants, store))?;
        }
        if !writes.create.is_empty() {
            api.bulk_create_variants(&listing.product_id, &writes.create)
                .await
                .map_err(remote(ReplicationStep::Variants, store))?;
        }

        debug!(
            store = %store.label(),
            updated = writes.update.len(),
            created = writes.create.len(),
            "Variants written"
        );
        Ok(())
    }

    /// Stock the `side` listing unless a previous attempt already did.
    ///
    /// Adjustments are deltas, so the flag is persisted as soon as the
    /// correction lands and a retry never applies it twice.
    async fn ensure_stocked(
        &self,
        bundle_id: BundleId,
        side: Side,
        api: StoreApi<'_, E>,
        variants: &[ProductVariant],
        plan: &VariantPlan,
        progress: &mut ReplicationProgress,
    ) -> Result<(), ReplicationError> {
        if side.listing(progress).is_some_and(|listing| listing.stocked) {
            debug!(store = %api.store().label(), "Inventory already adjusted");
            return Ok(());
        }

        self.stock(api, variants, plan).await?;

        if let Some(listing) = side.listing_mut(progress) {
            listing.stocked = true;
        }
        self.record(bundle_id, progress).await
    }

    /// Adjust stock of every planned variant at the store's location.
    async fn stock(
        &self,
        api: StoreApi<'_, E>,
        variants: &[ProductVariant],
        plan: &VariantPlan,
    ) -> Result<(), ReplicationError> {
        let store = api.store();
        let locations = api
            .locations()
            .await
            .map_err(remote(ReplicationStep::Locations, store))?;

        let location = pick_location(&locations, &self.settings.default_location_name).ok_or_else(
            || ReplicationError::NoLocation {
                store: store.label().to_string(),
            },
        )?;

        let changes = inventory_changes(&plan.variants, variants, &location.id);
        if changes.is_empty() {
            debug!(store = %store.label(), "No inventory to adjust");
            return Ok(());
        }

        api.adjust_inventory(&InventoryAdjustInput::correction(changes))
            .await
            .map_err(remote(ReplicationStep::Inventory, store))
    }

    async fn record(
        &self,
        bundle_id: BundleId,
        progress: &ReplicationProgress,
    ) -> Result<(), ReplicationError> {
        self.catalog
            .record_replication_progress(bundle_id, progress)
            .await
            .map_err(catalog(ReplicationStep::RecordProgress))?;
        debug!(stage = %progress.stage, "Replication stage recorded");
        Ok(())
    }
}

async fn read_variants<E: QueryExecutor>(
    api: StoreApi<'_, E>,
    listing: &RemoteListing,
) -> Result<Vec<ProductVariant>, ReplicationError> {
    api.product_variants(&listing.product_id)
        .await
        .map_err(remote(ReplicationStep::Variants, api.store()))
}

fn refs(variants: &[ProductVariant]) -> Vec<RemoteVariantRef> {
    variants.iter().map(ProductVariant::to_ref).collect()
}
