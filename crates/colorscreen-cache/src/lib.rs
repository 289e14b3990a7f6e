//! Generic refcounted LRU cache for derived render parameters (lens-warp
//! tables, MTF tables, screen tiles) keyed by whatever the caller's
//! inputs hash to.

mod lru;

pub use lru::LruCache;
