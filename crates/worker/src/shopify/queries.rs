//! GraphQL documents sent to the Shopify Admin API.
//!
//! Documents live under `graphql/admin/` and are embedded at compile time.
//! Responses are mapped by hand in [`super::types`], so no schema file is
//! needed at build time.

/// A named GraphQL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    /// `operationName` sent with the request; matches the name in `document`.
    pub name: &'static str,
    pub document: &'static str,
}

// =============================================================================
// Queries
// =============================================================================

/// Variants (with selected options and inventory items) of one product.
pub const GET_PRODUCT_VARIANTS: Operation = Operation {
    name: "GetProductVariants",
    document: include_str!("../../graphql/admin/queries/product_variants.graphql"),
};

/// Fulfillment locations of the shop.
pub const GET_LOCATIONS: Operation = Operation {
    name: "GetLocations",
    document: include_str!("../../graphql/admin/queries/locations.graphql"),
};

/// One cursor page of the shop's products.
pub const SEARCH_PRODUCTS: Operation = Operation {
    name: "SearchProducts",
    document: include_str!("../../graphql/admin/queries/products.graphql"),
};

// =============================================================================
// Mutations
// =============================================================================

/// Create a product with options, metafields and media.
pub const CREATE_PRODUCT: Operation = Operation {
    name: "CreateProduct",
    document: include_str!("../../graphql/admin/mutations/product_create.graphql"),
};

pub const VARIANTS_BULK_CREATE: Operation = Operation {
    name: "ProductVariantsBulkCreate",
    document: include_str!("../../graphql/admin/mutations/variants_bulk_create.graphql"),
};

pub const VARIANTS_BULK_UPDATE: Operation = Operation {
    name: "ProductVariantsBulkUpdate",
    document: include_str!("../../graphql/admin/mutations/variants_bulk_update.graphql"),
};

/// Apply stock deltas at a location.
pub const INVENTORY_ADJUST: Operation = Operation {
    name: "InventoryAdjustQuantities",
    document: include_str!("../../graphql/admin/mutations/inventory_adjust.graphql"),
};
