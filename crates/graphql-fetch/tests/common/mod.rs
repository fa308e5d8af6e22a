//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Instant;

use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use graphql_fetch::{GraphqlResult, MutationFn, PageFn, QueryCache, QueryFn, QueryKey};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call from every test.
pub fn init_test_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,graphql_fetch=debug"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer().compact())
            .init();
    });
}

/// Structured per-test log entry.
pub struct TestContext {
    test_name: String,
    module: String,
    start_time: Instant,
    assertions_passed: u32,
}

impl TestContext {
    pub fn new(test_name: &str, module: &str) -> Self {
        init_test_tracing();
        Self {
            test_name: test_name.to_string(),
            module: format!("graphql-fetch::{module}"),
            start_time: Instant::now(),
            assertions_passed: 0,
        }
    }

    pub fn assert_true(&mut self, condition: bool, msg: &str) {
        assert!(condition, "{msg}");
        self.assertions_passed += 1;
    }

    pub fn assert_eq<T>(&mut self, actual: T, expected: T, msg: &str)
    where
        T: std::fmt::Debug + PartialEq,
    {
        assert_eq!(actual, expected, "{msg}");
        self.assertions_passed += 1;
    }

    pub fn finalize(&self, details: Value) {
        let duration_ms = u64::try_from(self.start_time.elapsed().as_millis()).unwrap_or(u64::MAX);
        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": "info",
            "test_name": self.test_name,
            "module": self.module,
            "phase": "verify",
            "result": "pass",
            "duration_ms": duration_ms,
            "assertions": { "passed": self.assertions_passed },
            "details": details,
        });
        eprintln!("{entry}");
    }
}

/// Observable state published by [`MemoryCache::watch`].
#[derive(Debug, Clone)]
pub enum QueryState<T> {
    Loading,
    Success(T),
    Error(graphql_fetch::GraphqlError),
}

impl<T> QueryState<T> {
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Next-page policy for [`MemoryCache::watch_pages`].
pub struct PageOptions<T> {
    /// Page param following the given page, `None` to stop.
    pub next_page: fn(&T) -> Option<Value>,
    /// Upper bound on pages fetched.
    pub max_pages: usize,
}

type Entry = Arc<dyn Any + Send + Sync>;
type InFlight = Shared<BoxFuture<'static, GraphqlResult<Entry>>>;

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    in_flight: Mutex<HashMap<QueryKey, InFlight>>,
    keys: Mutex<Vec<QueryKey>>,
    runs: AtomicUsize,
    mutations: AtomicUsize,
}

/// In-memory query cache: entries by key, in-flight dedup, no staleness.
#[derive(Clone, Default)]
pub struct MemoryCache {
    inner: Arc<Inner>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every key handed to the cache, in order.
    pub fn keys(&self) -> Vec<QueryKey> {
        self.inner.keys.lock().expect("keys lock").clone()
    }

    /// Number of query thunk invocations.
    pub fn runs(&self) -> usize {
        self.inner.runs.load(Ordering::SeqCst)
    }

    /// Number of mutations run.
    pub fn mutations(&self) -> usize {
        self.inner.mutations.load(Ordering::SeqCst)
    }

    /// Drop the entry for `key` so the next read refetches.
    pub fn invalidate(&self, key: &QueryKey) {
        self.inner.entries.lock().expect("entries lock").remove(key);
    }

    fn record(&self, key: &QueryKey) {
        self.inner.keys.lock().expect("keys lock").push(key.clone());
    }

    fn cached<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        self.inner
            .entries
            .lock()
            .expect("entries lock")
            .get(key)
            .and_then(|entry| entry.downcast_ref::<T>().cloned())
    }

    fn in_flight<T>(&self, key: &QueryKey, fetch: &QueryFn<T>) -> InFlight
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut in_flight = self.inner.in_flight.lock().expect("in-flight lock");
        if let Some(shared) = in_flight.get(key) {
            return shared.clone();
        }
        let inner = Arc::clone(&self.inner);
        let fetch = Arc::clone(fetch);
        let shared = async move {
            inner.runs.fetch_add(1, Ordering::SeqCst);
            fetch().await.map(|data| Arc::new(data) as Entry)
        }
        .boxed()
        .shared();
        in_flight.insert(key.clone(), shared.clone());
        shared
    }

    async fn resolve<T>(&self, key: QueryKey, fetch: QueryFn<T>) -> GraphqlResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.record(&key);
        if let Some(data) = self.cached::<T>(&key) {
            return Ok(data);
        }
        let shared = self.in_flight(&key, &fetch);
        let result = shared.await;
        if let Ok(entry) = &result {
            self.inner
                .entries
                .lock()
                .expect("entries lock")
                .insert(key.clone(), Arc::clone(entry));
        }
        self.inner
            .in_flight
            .lock()
            .expect("in-flight lock")
            .remove(&key);
        let entry = result?;
        Ok(entry
            .downcast_ref::<T>()
            .cloned()
            .expect("entry type matches its key"))
    }

    async fn load_pages<T>(
        self,
        key: QueryKey,
        fetch_page: PageFn<T>,
        options: PageOptions<T>,
    ) -> GraphqlResult<Vec<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        if let Some(pages) = self.cached::<Vec<T>>(&key) {
            return Ok(pages);
        }
        let mut pages = Vec::new();
        let mut page_param = None;
        while pages.len() < options.max_pages {
            self.inner.runs.fetch_add(1, Ordering::SeqCst);
            let page = fetch_page(page_param.take()).await?;
            page_param = (options.next_page)(&page);
            pages.push(page);
            if page_param.is_none() {
                break;
            }
        }
        self.inner
            .entries
            .lock()
            .expect("entries lock")
            .insert(key, Arc::new(pages.clone()));
        Ok(pages)
    }
}

impl QueryCache for MemoryCache {
    type QueryOptions<T> = ();
    type FetchOptions<T> = ();
    type InfiniteOptions<T> = PageOptions<T>;
    type MutationOptions<T> = ();
    type Watch<T> = watch::Receiver<QueryState<T>>;
    type Pages<T> = JoinHandle<GraphqlResult<Vec<T>>>;

    fn watch<T>(&self, key: QueryKey, fetch: QueryFn<T>, (): ()) -> Self::Watch<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let initial = self
            .cached::<T>(&key)
            .map_or(QueryState::Loading, QueryState::Success);
        let (tx, rx) = watch::channel(initial);
        let cache = self.clone();
        tokio::spawn(async move {
            let state = match cache.resolve(key, fetch).await {
                Ok(data) => QueryState::Success(data),
                Err(err) => QueryState::Error(err),
            };
            let _ = tx.send(state);
        });
        rx
    }

    async fn fetch<T>(&self, key: QueryKey, fetch: QueryFn<T>, (): ()) -> GraphqlResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.resolve(key, fetch).await
    }

    fn watch_pages<T>(
        &self,
        key: QueryKey,
        fetch_page: PageFn<T>,
        options: PageOptions<T>,
    ) -> Self::Pages<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.record(&key);
        tokio::spawn(self.clone().load_pages(key, fetch_page, options))
    }

    async fn run_once<T>(&self, run: MutationFn<T>, (): ()) -> GraphqlResult<T>
    where
        T: Send + 'static,
    {
        self.inner.mutations.fetch_add(1, Ordering::SeqCst);
        run().await
    }
}
