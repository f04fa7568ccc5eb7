//! Mock Manifold client for unit testing.
//!
//! This module provides a mock client that can be used in tests
//! without making real network requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;

use crate::error::{MarketError, TradingError};
use crate::trading::order::BetOrder;

use super::client::MarketApi;
use super::types::{Bet, Market};

/// Configuration for mock client behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Starting balance.
    pub balance: Decimal,
    /// Whether to fail market requests.
    pub fail_market: bool,
    /// Whether to fail balance requests.
    pub fail_balance: bool,
    /// Whether to fail bet lookups.
    pub fail_bets: bool,
    /// Whether to fail bet placement.
    pub fail_place: bool,
    /// Whether to fail cancellations.
    pub fail_cancel: bool,
    /// Simulated latency in milliseconds.
    pub latency_ms: u64,
}

/// Mock Manifold client for testing.
///
/// Placed bets are recorded and their amount is deducted from the balance.
#[derive(Debug, Clone)]
pub struct MockManifoldClient {
    config: MockConfig,
    balance: Arc<Mutex<Decimal>>,
    markets: Arc<Mutex<HashMap<String, Market>>>,
    bets: Arc<Mutex<HashMap<String, Vec<Bet>>>>,
    placed: Arc<Mutex<Vec<BetOrder>>>,
    cancelled: Arc<Mutex<Vec<String>>>,
    market_requests: Arc<Mutex<usize>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockManifoldClient {
    /// Create a new mock client with default configuration.
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a mock client with custom configuration.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            balance: Arc::new(Mutex::new(config.balance)),
            config,
            markets: Arc::new(Mutex::new(HashMap::new())),
            bets: Arc::new(Mutex::new(HashMap::new())),
            placed: Arc::new(Mutex::new(Vec::new())),
            cancelled: Arc::new(Mutex::new(Vec::new())),
            market_requests: Arc::new(Mutex::new(0)),
        }
    }

    /// Set the mock balance.
    pub fn set_balance(&self, balance: Decimal) {
        *lock(&self.balance) = balance;
    }

    /// Add or replace a market.
    pub fn add_market(&self, market: Market) {
        lock(&self.markets).insert(market.id.clone(), market);
    }

    /// Add a bet of the configured user on a market.
    pub fn add_bet(&self, market_id: &str, bet: Bet) {
        lock(&self.bets)
            .entry(market_id.to_string())
            .or_default()
            .push(bet);
    }

    /// Bets submitted so far.
    pub fn placed_bets(&self) -> Vec<BetOrder> {
        lock(&self.placed).clone()
    }

    /// Bet ids cancelled so far.
    pub fn cancelled_bets(&self) -> Vec<String> {
        lock(&self.cancelled).clone()
    }

    /// Number of `get_market` calls served.
    pub fn market_requests(&self) -> usize {
        *lock(&self.market_requests)
    }

    /// Clear all mock data.
    pub fn clear(&self) {
        lock(&self.markets).clear();
        lock(&self.bets).clear();
        lock(&self.placed).clear();
        lock(&self.cancelled).clear();
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.latency_ms)).await;
        }
    }
}

impl Default for MockManifoldClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketApi for MockManifoldClient {
    async fn get_market(&self, id: &str) -> Result<Market, MarketError> {
        self.simulate_latency().await;
        *lock(&self.market_requests) += 1;

        if self.config.fail_market {
            return Err(MarketError::FetchFailed {
                id: id.to_string(),
                reason: "Mock market failure".to_string(),
            });
        }

        lock(&self.markets)
            .get(id)
            .cloned()
            .ok_or_else(|| MarketError::NotFound(id.to_string()))
    }

    async fn get_balance(&self) -> Result<Decimal, TradingError> {
        self.simulate_latency().await;

        if self.config.fail_balance {
            return Err(TradingError::BalanceFailed("Mock balance failure".to_string()));
        }

        Ok(*lock(&self.balance))
    }

    async fn get_user_bets(&self, market_id: &str) -> Result<Vec<Bet>, MarketError> {
        self.simulate_latency().await;

        if self.config.fail_bets {
            return Err(MarketError::FetchFailed {
                id: market_id.to_string(),
                reason: "Mock bets failure".to_string(),
            });
        }

        Ok(lock(&self.bets).get(market_id).cloned().unwrap_or_default())
    }

    async fn place_bet(&self, order: &BetOrder) -> Result<String, TradingError> {
        self.simulate_latency().await;
        order.validate().map_err(TradingError::InvalidParams)?;

        if self.config.fail_place {
            return Err(TradingError::SubmissionFailed("Mock submission failure".to_string()));
        }

        let mut placed = lock(&self.placed);
        placed.push(order.clone());
        *lock(&self.balance) -= order.amount;
        Ok(format!("mock-bet-{}", placed.len()))
    }

    async fn cancel_bet(&self, bet_id: &str) -> Result<(), TradingError> {
        self.simulate_latency().await;

        if self.config.fail_cancel {
            return Err(TradingError::CancelFailed {
                bet_id: bet_id.to_string(),
                reason: "Mock cancel failure".to_string(),
            });
        }

        lock(&self.cancelled).push(bet_id.to_string());
        Ok(())
    }
}
