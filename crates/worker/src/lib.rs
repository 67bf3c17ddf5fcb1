//! Bundle Relay Worker library.
//!
//! Replicates curated bundles onto Shopify storefronts and pulls vendor
//! catalogs into the local database. The binary in `main.rs` schedules the
//! jobs; the CLI reuses them for one-off ticks.
//!
//! # Jobs
//!
//! - [`scheduler::ReplicationJob`] - lists every eligible bundle on the
//!   internal store (`ACTIVE`) and its vendor's store (`DRAFT`)
//! - [`sync::ProductSyncJob`] - walks the `products` connection of each new
//!   vendor store and saves it in one transaction
//!
//! Both jobs take a claim per unit of work (see [`claims`]) so overlapping
//! ticks and multiple worker instances never process the same bundle or
//! store twice at the same time.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod claims;
pub mod config;
pub mod db;
pub mod health;
pub mod replication;
pub mod scheduler;
pub mod shopify;
pub mod sync;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
