//! NHL Fetcher
//!
//! Thin client over the public NHL web API. It fetches team schedules, cumulative
//! play-by-play feeds, boxscores and team rosters, normalizes them into the shapes the
//! scoring engine works with, and shields callers from an unreliable upstream with a
//! TTL response cache (served stale on failure) and a sliding-window rate limiter.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod rate_limiter;

pub use cache::ResponseCache;
pub use client::NhlApiClient;
pub use config::NhlApiConfig;
pub use error::{FetchError, Result};
pub use models::*;
pub use rate_limiter::RateLimiter;
