//! Correspondence between variants of the same bundle on two storefronts.
//!
//! Variants are paired by exact title equality. An internal variant without
//! a same-titled vendor variant is left out of the map; when several vendor
//! variants share a title, the first one wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Remote id and title of a variant on one storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVariantRef {
    pub id: String,
    pub title: String,
}

/// Internal-store variant id → vendor-store variant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantCrossMap(BTreeMap<String, RemoteVariantRef>);

impl VariantCrossMap {
    /// Pair internal variants with vendor variants by title.
    #[must_use]
    pub fn build(internal: &[RemoteVariantRef], vendor: &[RemoteVariantRef]) -> Self {
        let pairs = internal.iter().filter_map(|variant| {
            vendor
                .iter()
                .find(|candidate| candidate.title == variant.title)
                .map(|matched| (variant.id.clone(), matched.clone()))
        });
        Self(pairs.collect())
    }

    /// The vendor counterpart of an internal variant.
    #[must_use]
    pub fn get(&self, internal_variant_id: &str) -> Option<&RemoteVariantRef> {
        self.0.get(internal_variant_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
