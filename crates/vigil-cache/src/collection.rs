//! Collection cache with in-flight request coalescing and stale fallback
//!
//! One `CollectionCache` exists per backing collection and is shared by every
//! consumer (clones share state). A lookup resolves in this order:
//!
//! 1. a fetch is already in flight: wait for it alongside every other caller
//! 2. the cached entry is younger than the TTL and no refresh was forced: serve it
//! 3. otherwise start a fetch (raced against the fetch timeout)
//!
//! A failed fetch falls back to the last good entry, however old, and only
//! surfaces the error when nothing was ever fetched.
//!
//! Fetches run on their own task, so a caller that stops waiting does not
//! cancel the network call and its result still lands in the cache.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use vigil_common::{BackgroundTask, Clock, Identified};

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::source::CollectionSource;

type FetchOutcome<T> = Result<Arc<Vec<T>>>;
type SharedFetch<T> = Shared<BoxFuture<'static, FetchOutcome<T>>>;

/// The most recently fetched collection and the instant it was fetched.
///
/// Entries are replaced wholesale on every successful fetch, never mutated.
#[derive(Debug)]
pub struct CacheEntry<T> {
    items: Arc<Vec<T>>,
    fetched_at: DateTime<Utc>,
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            fetched_at: self.fetched_at,
        }
    }
}

impl<T> CacheEntry<T> {
    pub fn items(&self) -> &Arc<Vec<T>> {
        &self.items
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Whether the entry may still be served without a network call
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

struct InFlight<T> {
    generation: u64,
    fetch: SharedFetch<T>,
}

struct CacheState<T> {
    entry: Option<CacheEntry<T>>,
    in_flight: Option<InFlight<T>>,
    next_generation: u64,
}

impl<T> CacheState<T> {
    /// Clear the in-flight marker if it still belongs to `generation`
    fn settle(&mut self, generation: u64) {
        if self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
        {
            self.in_flight = None;
        }
    }
}

struct CacheInner<T> {
    name: String,
    source: Arc<dyn CollectionSource<T>>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    state: Mutex<CacheState<T>>,
}

impl<T: Send + Sync + 'static> CacheInner<T> {
    async fn fetch_and_store(&self, generation: u64) -> FetchOutcome<T> {
        let timeout = self.config.fetch_timeout;
        let fetched = tokio::time::timeout(
            timeout,
            AssertUnwindSafe(self.source.fetch_collection()).catch_unwind(),
        )
        .await;

        let outcome = match fetched {
            Ok(Ok(Ok(items))) => Ok(Arc::new(items)),
            Ok(Ok(Err(e))) => Err(CacheError::fetch(e)),
            Ok(Err(_)) => Err(CacheError::Aborted(
                "collection fetch panicked".to_string(),
            )),
            Err(_) => Err(CacheError::Timeout(timeout)),
        };

        {
            let mut state = self.state.lock();
            state.settle(generation);
            match &outcome {
                Ok(items) => {
                    state.entry = Some(CacheEntry {
                        items: Arc::clone(items),
                        fetched_at: self.clock.now(),
                    });
                    debug!("Refreshed '{}' cache with {} items", self.name, items.len());
                }
                Err(e) => warn!("Failed to refresh '{}' cache: {}", self.name, e),
            }
        }

        outcome
    }
}

enum Lookup<T> {
    Hit(Arc<Vec<T>>),
    Wait(SharedFetch<T>),
}

/// Read-through cache over one backing collection
pub struct CollectionCache<T> {
    inner: Arc<CacheInner<T>>,
}

impl<T> Clone for CollectionCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> CollectionCache<T>
where
    T: Identified + Clone + Send + Sync + 'static,
{
    /// Create an empty cache named `name` (used in logs only)
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn CollectionSource<T>>,
        clock: Arc<dyn Clock>,
        config: CacheConfig,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                name: name.into(),
                source,
                clock,
                config,
                state: Mutex::new(CacheState {
                    entry: None,
                    in_flight: None,
                    next_generation: 0,
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Return the freshest available collection.
    ///
    /// With `force_refresh` the TTL is ignored, but an in-flight fetch is
    /// still joined rather than duplicated.
    pub async fn get_all(&self, force_refresh: bool) -> Result<Arc<Vec<T>>> {
        let lookup = {
            let mut state = self.inner.state.lock();
            let now = self.inner.clock.now();
            let ttl = self.inner.config.ttl_delta();

            if let Some(in_flight) = &state.in_flight {
                debug!("Joining in-flight fetch for '{}'", self.inner.name);
                Lookup::Wait(in_flight.fetch.clone())
            } else if let Some(entry) = state
                .entry
                .as_ref()
                .filter(|e| !force_refresh && e.is_fresh(now, ttl))
            {
                Lookup::Hit(Arc::clone(&entry.items))
            } else {
                Lookup::Wait(self.start_fetch(&mut state))
            }
        };

        let fetch = match lookup {
            Lookup::Hit(items) => {
                debug!("Cache hit for '{}' ({} items)", self.inner.name, items.len());
                return Ok(items);
            }
            Lookup::Wait(fetch) => fetch,
        };

        match fetch.await {
            Ok(items) => Ok(items),
            Err(err) => {
                let stale = self.inner.state.lock().entry.clone();
                match stale {
                    Some(entry) => {
                        warn!(
                            "Serving stale '{}' collection fetched at {}: {}",
                            self.inner.name, entry.fetched_at, err
                        );
                        Ok(entry.items)
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Look a record up in the last fetched collection, falling back to a point fetch.
    ///
    /// The point fetch never touches the collection entry.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<T>> {
        let cached = self
            .inner
            .state
            .lock()
            .entry
            .as_ref()
            .map(|e| Arc::clone(&e.items));

        if let Some(items) = cached
            && let Some(item) = items.iter().find(|item| item.id() == id)
        {
            debug!("Cache hit for '{}' record {}", self.inner.name, id);
            return Ok(Some(item.clone()));
        }

        debug!(
            "Cache miss for '{}' record {}, fetching directly",
            self.inner.name, id
        );
        let timeout = self.inner.config.fetch_timeout;
        match tokio::time::timeout(timeout, self.inner.source.fetch_one(id)).await {
            Ok(Ok(item)) => Ok(item),
            Ok(Err(e)) => Err(CacheError::fetch(e)),
            Err(_) => Err(CacheError::Timeout(timeout)),
        }
    }

    /// Drop the cached entry. An in-flight fetch is unaffected and will repopulate it.
    pub fn invalidate(&self) {
        self.inner.state.lock().entry = None;
        debug!("Invalidated '{}' cache", self.inner.name);
    }

    /// The current entry, fresh or stale, without any I/O
    pub fn snapshot(&self) -> Option<CacheEntry<T>> {
        self.inner.state.lock().entry.clone()
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.state.lock().in_flight.is_some()
    }

    /// Keep the cache warm in the background, re-fetching whenever the entry expires.
    pub fn spawn_refresher(&self, interval: Duration) -> BackgroundTask {
        let cache = self.clone();
        let name = format!("{}-cache-refresher", self.inner.name);
        info!(
            "Starting '{}' cache refresher with interval {:?}",
            self.inner.name, interval
        );

        BackgroundTask::spawn(name, move |signal| async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = signal.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                if let Err(e) = cache.get_all(false).await {
                    warn!("Background refresh of '{}' failed: {}", cache.name(), e);
                }
            }
        })
    }

    fn start_fetch(&self, state: &mut CacheState<T>) -> SharedFetch<T> {
        let generation = state.next_generation;
        state.next_generation = state.next_generation.wrapping_add(1);

        let task_inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { task_inner.fetch_and_store(generation).await });

        let inner = Arc::clone(&self.inner);
        let fetch = async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    inner.state.lock().settle(generation);
                    Err(CacheError::Aborted(e.to_string()))
                }
            }
        }
        .boxed()
        .shared();

        state.in_flight = Some(InFlight {
            generation,
            fetch: fetch.clone(),
        });
        debug!("Started fetch #{} for '{}'", generation, self.inner.name);
        fetch
    }
}
