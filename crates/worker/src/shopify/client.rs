//! Shopify Admin GraphQL transport.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bundle_relay_core::Store;
use graphql_client::QueryBody;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::queries::Operation;
use super::{GraphQLError, GraphQLErrorLocation, ShopifyError};

/// Runs one GraphQL operation against one storefront.
///
/// Returns the response's `data` object; transport failures, non-success
/// statuses and top-level GraphQL `errors` all surface as [`ShopifyError`].
pub trait QueryExecutor: Send + Sync {
    fn execute(
        &self,
        store: &Store,
        operation: Operation,
        variables: Value,
    ) -> impl Future<Output = Result<Value, ShopifyError>> + Send;
}

impl<T: QueryExecutor> QueryExecutor for Arc<T> {
    fn execute(
        &self,
        store: &Store,
        operation: Operation,
        variables: Value,
    ) -> impl Future<Output = Result<Value, ShopifyError>> + Send {
        (**self).execute(store, operation, variables)
    }
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    locations: Vec<GraphQLErrorLocationResponse>,
    #[serde(default)]
    path: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorLocationResponse {
    line: i64,
    column: i64,
}

/// HTTP client for the Admin API of any storefront.
///
/// Credentials travel with each call (from the [`Store`] record), so one
/// client serves the internal store and every vendor store.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    api_version: String,
}

impl AdminClient {
    /// Create a client for the given Admin API version.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Http` if the HTTP client cannot be built.
    pub fn new(api_version: impl Into<String>) -> Result<Self, ShopifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(AdminClientInner {
                client,
                api_version: api_version.into(),
            }),
        })
    }

    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.inner.api_version
    }

    async fn post(
        &self,
        store: &Store,
        operation: Operation,
        variables: Value,
    ) -> Result<Value, ShopifyError> {
        let endpoint = graphql_endpoint(&store.store_url, &self.inner.api_version)?;
        let body = QueryBody {
            variables,
            query: operation.document,
            operation_name: operation.name,
        };

        let response = self
            .inner
            .client
            .post(endpoint)
            .header("X-Shopify-Access-Token", store.access_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(2);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ShopifyError::Unauthorized(format!(
                "access token rejected by {}",
                store.store_url
            )));
        }

        if !status.is_success() {
            return Err(ShopifyError::Status(status.as_u16()));
        }

        let graphql_response: GraphQLResponse = response.json().await?;
        into_data(graphql_response)
    }
}

impl QueryExecutor for AdminClient {
    #[instrument(skip_all, fields(store = %store.shop_name, operation = operation.name))]
    async fn execute(
        &self,
        store: &Store,
        operation: Operation,
        variables: Value,
    ) -> Result<Value, ShopifyError> {
        self.post(store, operation, variables).await
    }
}

/// Unwrap `data`, converting any top-level GraphQL errors.
fn into_data(response: GraphQLResponse) -> Result<Value, ShopifyError> {
    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        let converted_errors: Vec<GraphQLError> = errors
            .into_iter()
            .map(|e| GraphQLError {
                message: e.message,
                locations: e
                    .locations
                    .into_iter()
                    .map(|l| GraphQLErrorLocation {
                        line: l.line,
                        column: l.column,
                    })
                    .collect(),
                path: e.path,
            })
            .collect();
        return Err(ShopifyError::GraphQL(converted_errors));
    }

    response
        .data
        .ok_or_else(|| ShopifyError::GraphQL(vec![GraphQLError::message("No data in response")]))
}

/// Admin GraphQL endpoint of a store.
///
/// Accepts a bare domain (`shop.myshopify.com`) or a full URL.
fn graphql_endpoint(store_url: &str, api_version: &str) -> Result<Url, ShopifyError> {
    let trimmed = store_url.trim().trim_end_matches('/');
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let base = Url::parse(&with_scheme)
        .map_err(|e| ShopifyError::InvalidStoreUrl(format!("{store_url}: {e}")))?;
    let host = base
        .host_str()
        .ok_or_else(|| ShopifyError::InvalidStoreUrl(store_url.to_string()))?;

    Url::parse(&format!(
        "https://{host}/admin/api/{api_version}/graphql.json"
    ))
    .map_err(|e| ShopifyError::InvalidStoreUrl(format!("{store_url}: {e}")))
}
