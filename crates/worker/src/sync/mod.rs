//! Cursor-paginated ingestion of remote collections.
//!
//! [`PaginationWalker`] drives a [`PageSource`] from the first page (no
//! cursor) until the source reports no next page, yielding each page as it
//! arrives. [`PaginationWalker::fetch_all`] wraps a full walk in a claim on
//! the source, renewed after every page, so one source is never walked
//! twice at the same time, and either returns every item or fails without a
//! partial result.

pub mod products;

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use futures::{Stream, TryStreamExt};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::claims::{Claim, ClaimError, ClaimKey, ClaimRegistry, release_quietly};
use crate::config::SyncConfig;
use crate::shopify::ShopifyError;

pub use products::{ProductSyncJob, StoreProductSource, StoreSyncOutcome, SyncError, SyncSummary};

/// Errors that abort a walk.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A page kept failing (or failed permanently).
    #[error("page {page} failed after {attempts} attempt(s): {source}")]
    Page {
        page: usize,
        attempts: u32,
        #[source]
        source: ShopifyError,
    },

    /// The source claimed more pages but gave no cursor to reach them.
    #[error("page {page} reported a next page without an end cursor")]
    MissingCursor { page: usize },

    /// The claim lapsed and another walker took it over.
    #[error("claim {key} was lost after page {page}")]
    ClaimLost { key: ClaimKey, page: usize },

    #[error(transparent)]
    Claim(#[from] ClaimError),
}

/// One page of items plus the cursor to the next page.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// A remote collection readable page by page.
pub trait PageSource: Send + Sync {
    type Item: Send;

    /// Claim guarding walks of this source.
    fn claim_key(&self) -> ClaimKey;

    /// Fetch the page after `cursor` (`None` for the first page).
    fn fetch_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> impl Future<Output = Result<Page<Self::Item>, ShopifyError>> + Send;

    /// Whether an item belongs in the result. Items failing this are
    /// dropped before they reach the caller.
    fn keep(&self, _item: &Self::Item) -> bool {
        true
    }
}

/// Result of [`PaginationWalker::fetch_all`].
#[derive(Debug)]
pub enum WalkOutcome<T> {
    /// Every kept item, in source order.
    Completed(Vec<T>),
    /// Another walk of the same source holds the claim.
    AlreadyInProgress,
}

/// How failed page fetches are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per page, including the first.
    pub attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

/// Drives page sources to exhaustion.
pub struct PaginationWalker<K> {
    claims: Arc<K>,
    page_size: u32,
    retry: RetryPolicy,
}

impl<K> Clone for PaginationWalker<K> {
    fn clone(&self) -> Self {
        Self {
            claims: Arc::clone(&self.claims),
            page_size: self.page_size,
            retry: self.retry,
        }
    }
}

impl<K: ClaimRegistry> PaginationWalker<K> {
    #[must_use]
    pub const fn new(claims: Arc<K>, page_size: u32, retry: RetryPolicy) -> Self {
        Self {
            claims,
            page_size,
            retry,
        }
    }

    /// Walker configured from the sync settings.
    #[must_use]
    pub const fn from_config(claims: Arc<K>, config: &SyncConfig) -> Self {
        Self::new(
            claims,
            config.page_size,
            RetryPolicy {
                attempts: config.page_attempts,
                delay: config.retry_delay,
            },
        )
    }

    /// Walk `source` under its claim and collect every kept item.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if any page fails or the claim cannot be
    /// renewed between pages; nothing fetched so far is returned in that
    /// case.
    #[instrument(skip_all, fields(source = %source.claim_key()))]
    pub async fn fetch_all<S: PageSource>(
        &self,
        source: &S,
    ) -> Result<WalkOutcome<S::Item>, FetchError> {
        let Some(claim) = self.claims.try_acquire(source.claim_key()).await? else {
            debug!("Walk already in progress, skipping");
            return Ok(WalkOutcome::AlreadyInProgress);
        };

        let result = self.collect_renewing(source, &claim).await;
        release_quietly(self.claims.as_ref(), claim).await;

        result.map(WalkOutcome::Completed)
    }

    /// Concatenate every page, extending `claim` after each one.
    async fn collect_renewing<S: PageSource>(
        &self,
        source: &S,
        claim: &Claim,
    ) -> Result<Vec<S::Item>, FetchError> {
        let mut pages = pin!(self.pages(source));
        let mut items = Vec::new();
        let mut page = 0_usize;

        while let Some(kept) = pages.try_next().await? {
            page += 1;
            items.extend(kept);
            if !self.claims.renew(claim).await? {
                return Err(FetchError::ClaimLost {
                    key: claim.key(),
                    page,
                });
            }
        }

        Ok(items)
    }

    /// Lazily walk `source` without taking its claim, one page per item.
    ///
    /// The stream ends after the last page or at the first error.
    pub fn pages<'a, S: PageSource>(
        &'a self,
        source: &'a S,
    ) -> impl Stream<Item = Result<Vec<S::Item>, FetchError>> + Send + 'a {
        try_stream! {
            let mut cursor: Option<String> = None;
            let mut page_number = 0_usize;

            loop {
                page_number += 1;
                let page = self
                    .fetch_with_retry(source, cursor.as_deref(), page_number)
                    .await?;
                debug!(
                    page = page_number,
                    items = page.items.len(),
                    has_next_page = page.has_next_page,
                    "Fetched page"
                );

                let has_next_page = page.has_next_page;
                let end_cursor = page.end_cursor;
                let kept: Vec<S::Item> = page
                    .items
                    .into_iter()
                    .filter(|item| source.keep(item))
                    .collect();
                yield kept;

                if !has_next_page {
                    break;
                }
                cursor = Some(end_cursor.ok_or(FetchError::MissingCursor { page: page_number })?);
            }
        }
    }

    async fn fetch_with_retry<S: PageSource>(
        &self,
        source: &S,
        cursor: Option<&str>,
        page: usize,
    ) -> Result<Page<S::Item>, FetchError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;

        loop {
            match source.fetch_page(cursor, self.page_size).await {
                Ok(fetched) => return Ok(fetched),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(
                        page,
                        cursor = cursor.unwrap_or("<start>"),
                        attempt,
                        error = %e,
                        "Transient page failure, retrying"
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    return Err(FetchError::Page {
                        page,
                        attempts: attempt,
                        source: error,
                    });
                }
            }
        }
    }
}
