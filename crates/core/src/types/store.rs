//! Storefront records.

use secrecy::SecretString;
use serde_json::{Map, Value};

use super::StoreId;

/// A storefront on the commerce platform.
///
/// Exactly one store per deployment is marked `is_internal_store`; every
/// other store is a vendor (marketplace) storefront that owns bundles.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct Store {
    pub id: StoreId,
    /// Display name of the shop.
    pub shop_name: String,
    /// Admin domain (e.g., `vendor.myshopify.com`).
    pub store_url: String,
    /// Admin API access token (HIGH PRIVILEGE - redacted in debug output).
    pub access_token: SecretString,
    pub is_internal_store: bool,
    pub is_active: bool,
    /// Whether the store's remote catalog has been pulled into `products`.
    pub is_products_synced: bool,
    /// Logo URL embedded in replicated product metadata.
    pub logo: Option<String>,
    pub metadata: Map<String, Value>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("shop_name", &self.shop_name)
            .field("store_url", &self.store_url)
            .field("access_token", &"[REDACTED]")
            .field("is_internal_store", &self.is_internal_store)
            .field("is_active", &self.is_active)
            .field("is_products_synced", &self.is_products_synced)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Short label for log fields.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.shop_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_debug_redacts_token() {
        let store = Store {
            id: StoreId::generate(),
            shop_name: "Acme".to_string(),
            store_url: "acme.myshopify.com".to_string(),
            access_token: SecretString::from("shpat_super_secret_token"),
            is_internal_store: false,
            is_active: true,
            is_products_synced: false,
            logo: None,
            metadata: Map::new(),
        };

        let debug_output = format!("{store:?}");

        assert!(debug_output.contains("acme.myshopify.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("shpat_super_secret_token"));
    }
}
