//! Betting tools for Manifold prediction markets.
//!
//! The tools compare a market's probability with an externally computed
//! "true" probability and place limit bets when the two diverge by more than
//! a margin:
//!
//! ```text
//! market:   42 %
//! forecast: 50 %   (diff 8 % > margin 2 %)
//! ─────────────────────
//! bet YES with limit 50 %, cancel whatever does not fill
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`pricing`]: Pure decision and pricing math
//! - [`market`]: Market types, API client, snapshots, skip-list
//! - [`cache`]: Expiring cache and caching client wrapper
//! - [`forecast`]: Forecast providers (tables, scraped pages, combinations)
//! - [`registry`]: Tracked markets, groups and pairs
//! - [`trading`]: Bet orders, submission and positions
//! - [`strategy`]: Value, arbitrage and random betting drivers
//! - [`utils`]: Question helpers

pub mod cache;
pub mod config;
pub mod error;
pub mod forecast;
pub mod market;
pub mod pricing;
pub mod registry;
pub mod strategy;
pub mod trading;
pub mod utils;

pub use config::Config;
pub use error::{BotError, Result};
