//! Bundle Relay Core - Shared types and pure replication logic.
//!
//! This crate provides the domain model used by every Bundle Relay component:
//! - `worker` - Background process replicating bundles to Shopify storefronts
//! - `cli` - Command-line tools for migrations and one-off ticks
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything here is deterministic and can be tested
//! without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, statuses, bundles and stores
//! - [`options`] - Cartesian expansion of option groups into variant descriptors
//! - [`pricing`] - Per-variant price, SKU and inventory resolution
//! - [`cross_map`] - Title-based variant correspondence between two storefronts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cross_map;
pub mod options;
pub mod pricing;
pub mod types;

pub use cross_map::{RemoteVariantRef, VariantCrossMap};
pub use options::{OptionChoice, OptionGroup, VariantDescriptor, combine};
pub use pricing::{VariantPricing, resolve_variant};
pub use types::*;
