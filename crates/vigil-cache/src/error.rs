//! Cache error types

use std::sync::Arc;
use std::time::Duration;

/// Errors surfaced by the collection cache.
///
/// Cloneable so one coalesced fetch result can be handed to every waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("fetch failed: {0}")]
    Fetch(Arc<anyhow::Error>),

    #[error("fetch aborted: {0}")]
    Aborted(String),
}

impl CacheError {
    pub fn fetch(err: anyhow::Error) -> Self {
        CacheError::Fetch(Arc::new(err))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CacheError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
