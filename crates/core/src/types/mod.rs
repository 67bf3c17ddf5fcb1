//! Core types for Bundle Relay.
//!
//! This module provides type-safe wrappers for the catalog concepts the
//! replication worker reads and writes.

pub mod bundle;
pub mod id;
pub mod money;
pub mod status;
pub mod store;

pub use bundle::{
    Bundle, BundleOption, Category, Component, ComponentProduct, Packaging, PackagingStock,
    RemoteListing, ReplicationProgress,
};
pub use id::*;
pub use money::{Money, MoneyError};
pub use status::*;
pub use store::Store;
