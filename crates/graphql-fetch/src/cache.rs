//! Boundary to the external query cache/scheduler.
//!
//! This crate never stores results itself. A [`QueryCache`] implementation
//! owns deduplication, staleness, retries and delivery of state to observers;
//! the adapters only hand it a [`QueryKey`] and a thunk that performs the
//! exchange.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::error::GraphqlResult;
use crate::key::QueryKey;

/// Thunk run by the cache on a miss or refetch. May be invoked many times.
pub type QueryFn<T> = Arc<dyn Fn() -> BoxFuture<'static, GraphqlResult<T>> + Send + Sync>;

/// Per-page thunk. Receives the cache's page param, `None` for the first page.
pub type PageFn<T> =
    Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, GraphqlResult<T>> + Send + Sync>;

/// One-shot thunk for mutations.
pub type MutationFn<T> = Box<dyn FnOnce() -> BoxFuture<'static, GraphqlResult<T>> + Send>;

/// Generic fetch-and-cache-by-key collaborator.
///
/// Option and observer types are left to the implementation; the adapters
/// pass them through untouched.
pub trait QueryCache: Send + Sync {
    /// Options for subscribed queries (staleness, refetch policy, ...).
    type QueryOptions<T>: Send;
    /// Options for on-demand fetches.
    type FetchOptions<T>: Send;
    /// Options for paginated queries, including the next-page policy.
    type InfiniteOptions<T>: Send;
    /// Options for mutations.
    type MutationOptions<T>: Send;
    /// Observable state returned for subscribed queries.
    type Watch<T>;
    /// Observable state returned for paginated queries.
    type Pages<T>;

    /// Subscribe to the entry for `key`, running `fetch` when the cache decides
    /// the entry is missing or stale.
    fn watch<T>(
        &self,
        key: QueryKey,
        fetch: QueryFn<T>,
        options: Self::QueryOptions<T>,
    ) -> Self::Watch<T>
    where
        T: Clone + Send + Sync + 'static;

    /// Resolve the entry for `key` once without subscribing to later updates.
    fn fetch<T>(
        &self,
        key: QueryKey,
        fetch: QueryFn<T>,
        options: Self::FetchOptions<T>,
    ) -> impl Future<Output = GraphqlResult<T>> + Send
    where
        T: Clone + Send + Sync + 'static;

    /// Subscribe to a paginated entry. All pages share `key`; the cache picks
    /// each page param and decides when pagination ends.
    fn watch_pages<T>(
        &self,
        key: QueryKey,
        fetch_page: PageFn<T>,
        options: Self::InfiniteOptions<T>,
    ) -> Self::Pages<T>
    where
        T: Clone + Send + Sync + 'static;

    /// Run an uncached, non-deduplicated operation.
    fn run_once<T>(
        &self,
        run: MutationFn<T>,
        options: Self::MutationOptions<T>,
    ) -> impl Future<Output = GraphqlResult<T>> + Send
    where
        T: Send + 'static;
}
