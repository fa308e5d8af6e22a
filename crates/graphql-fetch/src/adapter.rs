//! Typed entry points bridging GraphQL operations into a [`QueryCache`].
//!
//! Each adapter derives a [`QueryKey`] (except mutations) and a thunk that runs
//! the [`Transport`]; the cache decides when the thunk runs.

use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::cache::{MutationFn, PageFn, QueryCache, QueryFn};
use crate::document::TypedDocument;
use crate::error::{GraphqlError, GraphqlResult};
use crate::key::{INFINITE_DISCRIMINATOR, QueryKey, build_key, normalize_variables};
use crate::transport::Transport;

/// GraphQL client wired to a query cache.
///
/// Stateless apart from the transport's endpoint handle; all loading, data
/// and error state lives in the cache.
#[derive(Debug, Clone)]
pub struct GraphqlClient<C> {
    transport: Transport,
    cache: C,
}

impl<C: QueryCache> GraphqlClient<C> {
    /// Create a client from a transport and a cache handle.
    #[must_use]
    pub const fn new(transport: Transport, cache: C) -> Self {
        Self { transport, cache }
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &Transport {
        &self.transport
    }

    /// The cache handle.
    #[must_use]
    pub const fn cache(&self) -> &C {
        &self.cache
    }

    /// Execute an operation directly, bypassing the cache.
    pub async fn execute<D, V>(
        &self,
        document: &TypedDocument<D, V>,
        variables: Option<&V>,
    ) -> GraphqlResult<D>
    where
        D: DeserializeOwned,
        V: Serialize,
    {
        self.transport.execute(document, variables).await
    }

    /// Subscribe to a query through the cache.
    ///
    /// The key is `(operation name, variables)`; the returned value is
    /// whatever observable state the cache provides.
    pub fn query<D, V>(
        &self,
        document: &TypedDocument<D, V>,
        variables: Option<&V>,
        options: C::QueryOptions<D>,
    ) -> GraphqlResult<C::Watch<D>>
    where
        D: DeserializeOwned + Clone + Send + Sync + 'static,
        V: Serialize,
    {
        let (key, variables) = prepare(document, variables, None)?;
        debug!(%key, "watching GraphQL query");
        let fetch = query_fn(&self.transport, document, variables);
        Ok(self.cache.watch(key, fetch, options))
    }

    /// Subscribe to a paginated query.
    ///
    /// Every page is fetched with the page param merged over `variables`, but
    /// the key is built from `variables` alone plus the `"infinite"`
    /// discriminator, so all pages share one cache entry.
    pub fn infinite_query<D, V>(
        &self,
        document: &TypedDocument<D, V>,
        variables: Option<&V>,
        options: C::InfiniteOptions<D>,
    ) -> GraphqlResult<C::Pages<D>>
    where
        D: DeserializeOwned + Clone + Send + Sync + 'static,
        V: Serialize,
    {
        let (key, variables) = prepare(document, variables, Some(INFINITE_DISCRIMINATOR))?;
        debug!(%key, "watching paginated GraphQL query");
        let fetch_page = page_fn(&self.transport, document, variables);
        Ok(self.cache.watch_pages(key, fetch_page, options))
    }
}

impl<C: QueryCache + Clone> GraphqlClient<C> {
    /// Reusable on-demand fetch function for `document`.
    #[must_use]
    pub fn fetcher<D, V>(&self, document: &TypedDocument<D, V>) -> Fetcher<C, D, V> {
        Fetcher {
            transport: self.transport.clone(),
            cache: self.cache.clone(),
            document: document.clone(),
        }
    }

    /// Mutation handle for `document`. `options` are passed to the cache on
    /// every [`Mutation::mutate`].
    #[must_use]
    pub fn mutation<D, V>(
        &self,
        document: &TypedDocument<D, V>,
        options: C::MutationOptions<D>,
    ) -> Mutation<C, D, V> {
        Mutation {
            transport: self.transport.clone(),
            cache: self.cache.clone(),
            document: document.clone(),
            options,
        }
    }
}

/// On-demand fetch bound to one document.
///
/// Each call re-derives the key and asks the cache to resolve it; unlike
/// [`GraphqlClient::query`] nothing stays subscribed.
pub struct Fetcher<C, D, V> {
    transport: Transport,
    cache: C,
    document: TypedDocument<D, V>,
}

impl<C, D, V> Fetcher<C, D, V>
where
    C: QueryCache,
    D: DeserializeOwned + Clone + Send + Sync + 'static,
    V: Serialize,
{
    /// Fetch through the cache.
    pub async fn fetch(
        &self,
        variables: Option<&V>,
        options: C::FetchOptions<D>,
    ) -> GraphqlResult<D> {
        let (key, variables) = prepare(&self.document, variables, None)?;
        debug!(%key, "fetching GraphQL query");
        let fetch = query_fn(&self.transport, &self.document, variables);
        self.cache.fetch(key, fetch, options).await
    }
}

impl<C: Clone, D, V> Clone for Fetcher<C, D, V> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            cache: self.cache.clone(),
            document: self.document.clone(),
        }
    }
}

impl<C, D, V> fmt::Debug for Fetcher<C, D, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

/// Mutation bound to one document.
pub struct Mutation<C: QueryCache, D, V> {
    transport: Transport,
    cache: C,
    document: TypedDocument<D, V>,
    options: C::MutationOptions<D>,
}

impl<C, D, V> Mutation<C, D, V>
where
    C: QueryCache,
    C::MutationOptions<D>: Clone,
    D: DeserializeOwned + Send + 'static,
    V: Serialize,
{
    /// Trigger the mutation and wait for its result.
    ///
    /// Mutations carry no key; the cache runs them exactly once.
    pub async fn mutate(&self, variables: Option<&V>) -> GraphqlResult<D> {
        let variables = normalize_variables(variables)
            .map_err(|err| with_context(err, &self.document))?;
        debug!(
            operation_name = self.document.operation_name().unwrap_or_default(),
            "running GraphQL mutation"
        );
        let transport = self.transport.clone();
        let document = self.document.shared();
        let run: MutationFn<D> = Box::new(move || {
            async move {
                transport
                    .execute_document(&document, Some(&variables))
                    .await
            }
            .boxed()
        });
        self.cache.run_once(run, self.options.clone()).await
    }
}

impl<C, D, V> Clone for Mutation<C, D, V>
where
    C: QueryCache + Clone,
    C::MutationOptions<D>: Clone,
{
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            cache: self.cache.clone(),
            document: self.document.clone(),
            options: self.options.clone(),
        }
    }
}

impl<C: QueryCache, D, V> fmt::Debug for Mutation<C, D, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

fn with_context<D, V>(err: GraphqlError, document: &TypedDocument<D, V>) -> GraphqlError {
    err.with_operation(
        document.operation_name().unwrap_or_default(),
        document.query(),
    )
}

/// Normalize variables once and derive the key from them.
fn prepare<D, V: Serialize>(
    document: &TypedDocument<D, V>,
    variables: Option<&V>,
    discriminator: Option<&str>,
) -> GraphqlResult<(QueryKey, Value)> {
    let variables =
        normalize_variables(variables).map_err(|err| with_context(err, document))?;
    let key = build_key(
        document.operation_name().unwrap_or_default(),
        Some(&variables),
        discriminator,
    )
    .map_err(|err| with_context(err, document))?;
    Ok((key, variables))
}

fn query_fn<D, V>(
    transport: &Transport,
    document: &TypedDocument<D, V>,
    variables: Value,
) -> QueryFn<D>
where
    D: DeserializeOwned + Send + 'static,
{
    let transport = transport.clone();
    let document = document.shared();
    let variables = Arc::new(variables);
    Arc::new(move || {
        let transport = transport.clone();
        let document = Arc::clone(&document);
        let variables = Arc::clone(&variables);
        async move {
            transport
                .execute_document(&document, Some(&*variables))
                .await
        }
        .boxed()
    })
}

fn page_fn<D, V>(transport: &Transport, document: &TypedDocument<D, V>, base: Value) -> PageFn<D>
where
    D: DeserializeOwned + Send + 'static,
{
    let transport = transport.clone();
    let document = document.shared();
    Arc::new(move |page_param| {
        let transport = transport.clone();
        let document = Arc::clone(&document);
        let variables = merge_page_param(&base, page_param);
        async move {
            transport
                .execute_document(&document, Some(&variables))
                .await
        }
        .boxed()
    })
}

/// Overlay an object page param onto object variables.
///
/// Anything else leaves the base variables unchanged.
fn merge_page_param(base: &Value, page_param: Option<Value>) -> Value {
    match (base, page_param) {
        (Value::Object(base), Some(Value::Object(page))) => {
            let mut merged = base.clone();
            merged.extend(page);
            Value::Object(merged)
        }
        _ => base.clone(),
    }
}
