//! Time-bounded memoisation for external lookups.

use std::future::Future;
use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{MarketError, TradingError};
use crate::market::{Bet, Market, MarketApi};
use crate::trading::BetOrder;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Concurrent key/value cache whose entries expire after a fixed lifetime.
#[derive(Debug)]
pub struct ExpiringCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, Entry<V>>,
    ttl: Duration,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Empty cache with entries living for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, dropping it if expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    /// Store `value` under `key` for one lifetime.
    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop `key`.
    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    /// Cached value for `key`, or the result of `load` which is cached only
    /// when it succeeds.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = load().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// [`MarketApi`] wrapper caching market and bet lookups.
///
/// Balance lookups and bet submission always reach the inner client. Placing
/// a bet drops the cached bets of that market.
#[derive(Debug)]
pub struct CachedClient<C> {
    inner: C,
    markets: ExpiringCache<String, Market>,
    bets: ExpiringCache<String, Vec<Bet>>,
}

impl<C: MarketApi> CachedClient<C> {
    /// Wrap `inner`, caching lookups for `ttl`.
    pub fn new(inner: C, ttl: Duration) -> Self {
        Self {
            inner,
            markets: ExpiringCache::new(ttl),
            bets: ExpiringCache::new(ttl),
        }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: MarketApi> MarketApi for CachedClient<C> {
    async fn get_market(&self, id: &str) -> Result<Market, MarketError> {
        let key = id.to_string();
        if let Some(market) = self.markets.get(&key) {
            debug!(market_id = %id, "Market cache hit");
            return Ok(market);
        }
        self.markets
            .get_or_try_insert_with(key, || self.inner.get_market(id))
            .await
    }

    async fn get_balance(&self) -> Result<Decimal, TradingError> {
        self.inner.get_balance().await
    }

    async fn get_user_bets(&self, market_id: &str) -> Result<Vec<Bet>, MarketError> {
        self.bets
            .get_or_try_insert_with(market_id.to_string(), || {
                self.inner.get_user_bets(market_id)
            })
            .await
    }

    async fn place_bet(&self, order: &BetOrder) -> Result<String, TradingError> {
        let result = self.inner.place_bet(order).await;
        self.bets.invalidate(&order.contract_id);
        result
    }

    async fn cancel_bet(&self, bet_id: &str) -> Result<(), TradingError> {
        self.inner.cancel_bet(bet_id).await
    }
}
