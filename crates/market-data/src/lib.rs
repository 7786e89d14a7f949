//! Market Data
//!
//! HTTP clients for Yahoo Finance and FinMind behind the dashboard-core
//! provider traits, plus a market-aware service that caches results with a
//! per-concern time-to-live and degrades failures to empty values.

pub mod cache;
pub mod finmind;
pub mod rate_limit;
pub mod service;
pub mod yahoo;

pub use cache::TtlCache;
pub use finmind::FinMindClient;
pub use rate_limit::RateLimiter;
pub use service::{CacheSettings, MarketDataService, Providers};
pub use yahoo::YahooClient;
