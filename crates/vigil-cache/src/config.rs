//! Configuration for collection caches

use std::time::Duration;

/// Default validity window of a cached collection (30 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Default upper bound on a single network fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a [`CollectionCache`](crate::CollectionCache)
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// How long a fetched collection is served without a new network call
    pub ttl: Duration,
    /// Timeout raced against every fetch
    pub fetch_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl CacheConfig {
    /// Set the validity window
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the fetch timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// TTL as a signed chrono duration, saturating on overflow
    pub(crate) fn ttl_delta(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(1800));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::default()
            .with_ttl(Duration::from_secs(60))
            .with_fetch_timeout(Duration::from_millis(500));
        assert_eq!(config.ttl, Duration::from_secs(60));
        assert_eq!(config.fetch_timeout, Duration::from_millis(500));
        assert_eq!(config.ttl_delta(), chrono::Duration::seconds(60));
    }
}
