//! Backing store seam for collection caches

use async_trait::async_trait;

/// Generic list/get access to a backing collection.
///
/// Transport, query parameters and authentication are the implementor's concern.
#[async_trait]
pub trait CollectionSource<T>: Send + Sync {
    /// Fetch the whole collection, newest first
    async fn fetch_collection(&self) -> anyhow::Result<Vec<T>>;

    /// Fetch a single record; `Ok(None)` when it does not exist
    async fn fetch_one(&self, id: &str) -> anyhow::Result<Option<T>>;
}
