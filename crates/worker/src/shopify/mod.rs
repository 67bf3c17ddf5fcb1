//! Shopify Admin GraphQL access for every storefront the worker talks to.
//!
//! # Architecture
//!
//! - [`QueryExecutor`] is the single remote primitive: run one named GraphQL
//!   document against one storefront and hand back the `data` object
//! - [`AdminClient`] implements it over HTTP with `reqwest`
//! - [`StoreApi`] binds an executor to one [`Store`](bundle_relay_core::Store)
//!   and maps results onto the typed structs in [`types`]
//!
//! Tests swap `AdminClient` for the simulated shop in `crate::testing`.

pub mod api;
pub mod client;
pub mod queries;
pub mod types;

pub use api::StoreApi;
pub use client::{AdminClient, QueryExecutor};
pub use queries::Operation;

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status other than 401/429.
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Access token rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Mutation rejected the input (`userErrors`).
    #[error("User error: {0}")]
    UserError(String),

    /// Store URL cannot be turned into an Admin API endpoint.
    #[error("Invalid store URL: {0}")]
    InvalidStoreUrl(String),
}

impl ShopifyError {
    /// Whether retrying the same call later can succeed.
    ///
    /// Network failures, rate limits, 5xx responses and GraphQL throttling
    /// are transient; everything else needs a different request.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status(code) => *code >= 500,
            Self::RateLimited(_) => true,
            Self::GraphQL(errors) => errors
                .iter()
                .any(|e| e.message.to_ascii_lowercase().contains("throttled")),
            Self::Parse(_)
            | Self::NotFound(_)
            | Self::Unauthorized(_)
            | Self::UserError(_)
            | Self::InvalidStoreUrl(_) => false,
        }
    }
}

/// A GraphQL error returned by the Shopify API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

impl GraphQLError {
    /// An error with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }
    }
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}
