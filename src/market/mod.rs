//! Market module for Manifold prediction markets.
//!
//! This module handles:
//! - Market types and API records
//! - The `MarketApi` trait and the live Manifold client
//! - Market snapshots and discovery filters
//! - The resolved-markets skip-list
//! - Mock client for testing

pub mod client;
pub mod discovery;
pub mod mock;
pub mod resolved;
pub mod types;

pub use client::{ManifoldClient, MarketApi};
pub use discovery::{MarketFilter, SnapshotStore};
pub use mock::{MockConfig, MockManifoldClient};
pub use resolved::ResolvedMarkets;
pub use types::{Answer, Bet, Market, MarketKind, Outcome};
