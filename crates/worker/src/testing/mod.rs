//! In-memory stand-ins for the catalog and the Admin API.
//!
//! Enabled under `cfg(test)` and by the `testing` feature so the
//! integration-test crate can drive the jobs without Postgres or Shopify.

mod catalog;
pub mod fixtures;
mod shopify;

pub use catalog::MemoryCatalog;
pub use shopify::{FakeProduct, FakeShopify};
