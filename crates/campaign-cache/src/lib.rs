//! The Feature Cache and the generic TTL mechanism it shares
//! with the Campaign Aggregates cache.

pub mod feature;
pub mod ttl;

pub use feature::{FeatureCache, FeatureMap};
pub use ttl::TtlCache;
