//! Vigil Cache - read-through cache for frequently polled collections
//!
//! This crate provides:
//! - `CollectionCache`: a time-boxed cache that coalesces concurrent fetches
//!   into one network call and serves stale data when a refresh fails
//! - `CollectionSource`: the seam to the backing record store
//! - A background refresher that keeps the cache warm

pub mod collection;
pub mod config;
pub mod error;
pub mod source;

pub use collection::{CacheEntry, CollectionCache};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use source::CollectionSource;
