//! Observable state containers over `ApiClient` calls.
//!
//! A `Resource` owns the lifecycle of one backend query: it starts idle,
//! fetches whenever its parameters change and publishes
//! `{data, loading, error}` snapshots through a `tokio::sync::watch` channel.
//! Every fetch is tagged with a generation number; a result is applied only
//! if no newer fetch has started since, so a slow response for old
//! parameters never overwrites a newer one.
//!
//! Resources never retry. Retries belong to the client.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use goszakup_client::{ApiClient, ApiError, Transport};
use goszakup_model::{
    CategoryDetail, CategoryListItem, CategoryPricingDetail, CategoryPricingQuery,
    CategoryPricingResponse, CustomerDetail, CustomerListItem, DashboardStats, DirectoryQuery,
    FullAnalysis, GetLotsRequest, GetLotsResponse, HealthResponse, NetworkGraph,
    NetworkGraphQuery, Page, TimelineQuery, TimelineResponse,
};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::debug;

mod text;

pub use text::TextAnalysis;

/// Snapshot published by a resource.
#[derive(Debug)]
pub struct ResourceState<T> {
    pub data: Option<Arc<T>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> ResourceState<T> {
    /// No data, not loading, no error.
    pub fn idle() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.data.is_none() && !self.loading && self.error.is_none()
    }

    fn resolved(outcome: Result<T, ApiError>) -> Self {
        match outcome {
            Ok(data) => Self {
                data: Some(Arc::new(data)),
                loading: false,
                error: None,
            },
            Err(error) => Self {
                data: None,
                loading: false,
                error: Some(error.to_string()),
            },
        }
    }
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> Clone for ResourceState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

/// A boxed in-flight fetch.
pub type FetchFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

/// Turns parameters into a fetch. `None` means a required key is absent and
/// the resource goes back to idle instead of fetching.
type Fetcher<P, T> = Arc<dyn Fn(&P) -> Option<FetchFuture<T>> + Send + Sync>;

struct Tracker<P> {
    generation: u64,
    params: Option<P>,
    task: Option<AbortHandle>,
}

/// One parameterised backend query and its published state.
///
/// Fetches are spawned on the ambient Tokio runtime, so `set_params` and
/// `refetch` must be called from within one. Dropping the resource aborts
/// the fetch in flight.
pub struct Resource<P, T> {
    name: &'static str,
    fetcher: Fetcher<P, T>,
    tracker: Arc<Mutex<Tracker<P>>>,
    state: Arc<watch::Sender<ResourceState<T>>>,
}

impl<P, T> Resource<P, T>
where
    P: Clone + PartialEq + fmt::Debug + Send + 'static,
    T: Send + Sync + 'static,
{
    /// An idle resource. Nothing is fetched until `set_params`.
    pub fn new(
        name: &'static str,
        fetcher: impl Fn(&P) -> Option<FetchFuture<T>> + Send + Sync + 'static,
    ) -> Self {
        let (state, _) = watch::channel(ResourceState::idle());
        Self {
            name,
            fetcher: Arc::new(fetcher),
            tracker: Arc::new(Mutex::new(Tracker {
                generation: 0,
                params: None,
                task: None,
            })),
            state: Arc::new(state),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fetch for `params` unless they equal the last requested ones.
    pub fn set_params(&self, params: P) {
        let mut tracker = lock(&self.tracker);
        if tracker.params.as_ref() == Some(&params) {
            return;
        }
        tracker.params = Some(params.clone());
        self.start(&mut tracker, &params);
    }

    /// Fetch again for the last requested parameters.
    pub fn refetch(&self) {
        let mut tracker = lock(&self.tracker);
        if let Some(params) = tracker.params.clone() {
            self.start(&mut tracker, &params);
        }
    }

    pub fn state(&self) -> ResourceState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResourceState<T>> {
        self.state.subscribe()
    }

    /// Wait until the resource is not loading and return that state.
    pub async fn settled(&self) -> ResourceState<T> {
        let mut rx = self.state.subscribe();
        let settled = rx.wait_for(|state| !state.loading).await.map(|state| state.clone());
        settled.unwrap_or_else(|_| self.state())
    }

    /// Current generation; bumped by every parameter change and refetch.
    pub fn generation(&self) -> u64 {
        lock(&self.tracker).generation
    }

    fn start(&self, tracker: &mut Tracker<P>, params: &P) {
        tracker.generation += 1;
        let generation = tracker.generation;
        if let Some(task) = tracker.task.take() {
            task.abort();
        }

        let Some(fetch) = (self.fetcher)(params) else {
            debug!(resource = self.name, generation, "Required key absent, resetting");
            self.state.send_replace(ResourceState::idle());
            return;
        };

        debug!(resource = self.name, generation, ?params, "Fetching");
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let name = self.name;
        let tracker_ref = Arc::clone(&self.tracker);
        let state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            let outcome = fetch.await;
            complete(name, &tracker_ref, &state, generation, outcome);
        });
        tracker.task = Some(task.abort_handle());
    }
}

impl<P, T> Drop for Resource<P, T> {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.tracker).task.take() {
            task.abort();
        }
    }
}

impl<P, T> fmt::Debug for Resource<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("loading", &state.loading)
            .field("has_data", &state.data.is_some())
            .field("error", &state.error)
            .finish()
    }
}

/// Apply a finished fetch if it is still the latest one. Returns whether the
/// state changed.
fn complete<P, T>(
    name: &'static str,
    tracker: &Mutex<Tracker<P>>,
    state: &watch::Sender<ResourceState<T>>,
    generation: u64,
    outcome: Result<T, ApiError>,
) -> bool {
    let mut tracker = lock(tracker);
    if tracker.generation != generation {
        debug!(
            resource = name,
            generation,
            current = tracker.generation,
            "Discarding stale result"
        );
        return false;
    }

    tracker.task = None;
    if let Err(error) = &outcome {
        debug!(resource = name, generation, error = %error, "Fetch failed");
    }
    state.send_replace(ResourceState::resolved(outcome));
    true
}

fn lock<P>(tracker: &Mutex<Tracker<P>>) -> MutexGuard<'_, Tracker<P>> {
    tracker.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fetcher for a parameterless query.
fn unit<C, T, F, Fut>(
    client: &Arc<ApiClient<C>>,
    call: F,
) -> impl Fn(&()) -> Option<FetchFuture<T>> + Send + Sync + 'static
where
    C: Transport + 'static,
    F: Fn(Arc<ApiClient<C>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    let client = Arc::clone(client);
    move |_: &()| Some(Box::pin(call(Arc::clone(&client))) as FetchFuture<T>)
}

/// Fetcher for a query with cloned parameters.
fn with_params<C, P, T, F, Fut>(
    client: &Arc<ApiClient<C>>,
    call: F,
) -> impl Fn(&P) -> Option<FetchFuture<T>> + Send + Sync + 'static
where
    C: Transport + 'static,
    P: Clone,
    F: Fn(Arc<ApiClient<C>>, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    let client = Arc::clone(client);
    move |params: &P| Some(Box::pin(call(Arc::clone(&client), params.clone())) as FetchFuture<T>)
}

/// Fetcher keyed by an optional identifier: `None` (or a blank key) means idle.
fn keyed<C, T, F, Fut>(
    client: &Arc<ApiClient<C>>,
    call: F,
) -> impl Fn(&Option<String>) -> Option<FetchFuture<T>> + Send + Sync + 'static
where
    C: Transport + 'static,
    F: Fn(Arc<ApiClient<C>>, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    let client = Arc::clone(client);
    move |key: &Option<String>| {
        let key = key.as_deref().filter(|k| !k.trim().is_empty())?;
        Some(Box::pin(call(Arc::clone(&client), key.to_string())) as FetchFuture<T>)
    }
}

pub type HealthResource = Resource<(), HealthResponse>;
pub type DashboardStatsResource = Resource<(), DashboardStats>;
pub type LotsResource = Resource<GetLotsRequest, GetLotsResponse>;
pub type LotAnalysisResource = Resource<Option<String>, FullAnalysis>;

pub fn health<C: Transport + 'static>(client: &Arc<ApiClient<C>>) -> HealthResource {
    Resource::new(
        "health",
        unit(client, |client| async move { client.health().await }),
    )
}

pub fn dashboard_stats<C: Transport + 'static>(
    client: &Arc<ApiClient<C>>,
) -> DashboardStatsResource {
    Resource::new(
        "dashboard_stats",
        unit(client, |client| async move { client.dashboard_stats().await }),
    )
}

pub fn lots<C: Transport + 'static>(client: &Arc<ApiClient<C>>) -> LotsResource {
    Resource::new(
        "lots",
        with_params(client, |client, params: GetLotsRequest| async move {
            client.lots(&params).await
        }),
    )
}

pub fn lot_analysis<C: Transport + 'static>(client: &Arc<ApiClient<C>>) -> LotAnalysisResource {
    Resource::new(
        "lot_analysis",
        keyed(client, |client, lot_id| async move {
            client.lot_analysis(&lot_id).await
        }),
    )
}

pub fn category_pricing<C: Transport + 'static>(
    client: &Arc<ApiClient<C>>,
) -> Resource<CategoryPricingQuery, CategoryPricingResponse> {
    Resource::new(
        "category_pricing",
        with_params(client, |client, params: CategoryPricingQuery| async move {
            client.category_pricing(&params).await
        }),
    )
}

pub fn category_pricing_detail<C: Transport + 'static>(
    client: &Arc<ApiClient<C>>,
) -> Resource<Option<String>, CategoryPricingDetail> {
    Resource::new(
        "category_pricing_detail",
        keyed(client, |client, code| async move {
            client.category_pricing_detail(&code).await
        }),
    )
}

pub fn categories<C: Transport + 'static>(
    client: &Arc<ApiClient<C>>,
) -> Resource<DirectoryQuery, Page<CategoryListItem>> {
    Resource::new(
        "categories",
        with_params(client, |client, params: DirectoryQuery| async move {
            client.categories(&params).await
        }),
    )
}

pub fn category<C: Transport + 'static>(
    client: &Arc<ApiClient<C>>,
) -> Resource<Option<String>, CategoryDetail> {
    Resource::new(
        "category",
        keyed(client, |client, code| async move { client.category(&code).await }),
    )
}

pub fn customers<C: Transport + 'static>(
    client: &Arc<ApiClient<C>>,
) -> Resource<DirectoryQuery, Page<CustomerListItem>> {
    Resource::new(
        "customers",
        with_params(client, |client, params: DirectoryQuery| async move {
            client.customers(&params).await
        }),
    )
}

pub fn customer<C: Transport + 'static>(
    client: &Arc<ApiClient<C>>,
) -> Resource<Option<String>, CustomerDetail> {
    Resource::new(
        "customer",
        keyed(client, |client, bin| async move { client.customer(&bin).await }),
    )
}

pub fn network_graph<C: Transport + 'static>(
    client: &Arc<ApiClient<C>>,
) -> Resource<NetworkGraphQuery, NetworkGraph> {
    Resource::new(
        "network_graph",
        with_params(client, |client, params: NetworkGraphQuery| async move {
            client.network_graph(&params).await
        }),
    )
}

pub fn timeline<C: Transport + 'static>(
    client: &Arc<ApiClient<C>>,
) -> Resource<TimelineQuery, TimelineResponse> {
    Resource::new(
        "timeline",
        with_params(client, |client, params: TimelineQuery| async move {
            client.timeline(&params).await
        }),
    )
}
