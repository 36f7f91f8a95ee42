//! precache - an offline cache layer for static sites.
//!
//! This library provides the core of an offline-first resource cache: a
//! named store of response snapshots, an eager precache step over a
//! configured URL list, and request resolution under a single fetch
//! policy with an offline fallback.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use precache::{CacheConfig, CacheManager, NoProgress, PrecacheProgress, UrlList};
//!
//! # async fn example() -> precache::Result<()> {
//! let config = CacheConfig::new()
//!     .with_cache_name("blog-cache-v1")
//!     .with_origin("https://blog.example.com");
//! let urls = UrlList::from_entries(["/", "/assets/app.js", "/blog/first-post"])?;
//!
//! let manager = CacheManager::new(config, urls)?;
//!
//! // Populate the store, all-or-nothing.
//! let progress: Arc<dyn PrecacheProgress> = Arc::new(NoProgress);
//! let stats = manager.install(&progress).await?;
//! println!("precached {} resources", stats.resources_cached);
//!
//! // Resolve a request: cache, then network, then the offline page.
//! let served = manager.resolve("/assets/app.js").await?;
//! println!("served {} bytes from {:?}", served.response.body_len(), served.source);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod manager;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod urls;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export main types for convenience
pub use config::{AppConfig, CacheConfig, FetchPolicy, PathConfig};
pub use error::{Error, Result};
pub use fetch::{HttpFetcher, NetworkFetcher, build_http_client};
pub use format::{format_bytes, format_duration};
pub use manager::{CacheManager, NoProgress, PrecacheProgress, ServeSource, Served};
pub use snapshot::CachedResponse;
pub use stats::{FetchCounters, FetchStats, InstallStats};
pub use store::{CacheStore, DiskStore, MemoryStore};
pub use urls::{UrlList, cache_key};
