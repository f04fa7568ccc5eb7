//! Manifold API client.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::{MarketError, TradingError};
use crate::trading::order::{BetOrder, BetResponse};

use super::types::{ApiMarket, ApiUser, Bet, Market};

/// Page size of the list endpoints.
pub const PAGE_SIZE: usize = 1000;

/// Operations the betting drivers need from the market.
///
/// Implemented by [`ManifoldClient`] for the live API, by
/// [`super::MockManifoldClient`] for tests and by
/// [`crate::cache::CachedClient`] as a memoising wrapper.
#[allow(async_fn_in_trait)]
pub trait MarketApi {
    /// Current state of a market.
    async fn get_market(&self, id: &str) -> Result<Market, MarketError>;

    /// Play-money balance of the configured user.
    async fn get_balance(&self) -> Result<Decimal, TradingError>;

    /// All bets of the configured user on one market.
    async fn get_user_bets(&self, market_id: &str) -> Result<Vec<Bet>, MarketError>;

    /// Submit a bet, returning its id.
    async fn place_bet(&self, order: &BetOrder) -> Result<String, TradingError>;

    /// Cancel the unfilled part of a limit bet.
    async fn cancel_bet(&self, bet_id: &str) -> Result<(), TradingError>;
}

/// Live Manifold client.
#[derive(Debug, Clone)]
pub struct ManifoldClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// API base URL.
    api_url: String,
    /// API key for authenticated calls.
    api_key: Option<String>,
    /// Betting user id.
    user_id: Option<String>,
    /// Betting username.
    username: Option<String>,
}

impl ManifoldClient {
    /// Create a new client from config.
    pub fn new(config: &Config) -> Result<Self, MarketError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(std::time::Duration::from_secs(5))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http,
            api_url: config.manifold_api_url.trim_end_matches('/').to_string(),
            api_key: config.manifold_api_key.clone(),
            user_id: config.manifold_user_id.clone(),
            username: config.manifold_username.clone(),
        })
    }

    /// Get the HTTP client reference.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Get the API base URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn auth_header(&self) -> Result<String, TradingError> {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(format!("Key {key}")),
            _ => Err(TradingError::MissingApiKey),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        id: &str,
    ) -> Result<T, MarketError> {
        let url = format!("{}/{}", self.api_url, path);
        let response = self.http.get(&url).query(query).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketError::NotFound(id.to_string()));
        }
        if !response.status().is_success() {
            return Err(MarketError::FetchFailed {
                id: id.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        response
            .json()
            .await
            .map_err(|e| MarketError::ParseError(format!("{path}: {e}")))
    }

    /// One page of the market list, newest first, starting after `before`.
    #[instrument(skip(self))]
    pub async fn list_markets(
        &self,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ApiMarket>, MarketError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }
        self.get_json("markets", &query, "markets").await
    }

    /// Every market, following the `before` cursor until a short page.
    ///
    /// Records of unsupported kinds are skipped.
    #[instrument(skip(self))]
    pub async fn all_markets(&self) -> Result<Vec<Market>, MarketError> {
        let mut markets = Vec::new();
        let mut before: Option<String> = None;
        let mut skipped = 0usize;

        loop {
            let page = self.list_markets(before.as_deref(), PAGE_SIZE).await?;
            let page_len = page.len();
            before = page.last().map(|m| m.id.clone());

            for api in page {
                match Market::try_from(api) {
                    Ok(market) => markets.push(market),
                    Err(_) => skipped += 1,
                }
            }

            debug!(fetched = markets.len(), skipped, "Fetched market page");
            if page_len < PAGE_SIZE {
                break;
            }
        }

        Ok(markets)
    }
}

impl MarketApi for ManifoldClient {
    #[instrument(skip(self), fields(market_id = %id))]
    async fn get_market(&self, id: &str) -> Result<Market, MarketError> {
        let api: ApiMarket = self.get_json(&format!("market/{id}"), &[], id).await?;
        Market::try_from(api)
    }

    #[instrument(skip(self))]
    async fn get_balance(&self) -> Result<Decimal, TradingError> {
        let username = self
            .username
            .as_deref()
            .ok_or_else(|| TradingError::BalanceFailed("MANIFOLD_USERNAME is not set".to_string()))?;

        let user: ApiUser = self
            .get_json(&format!("user/{username}"), &[], username)
            .await
            .map_err(|e| TradingError::BalanceFailed(e.to_string()))?;

        debug!(balance = %user.balance, "Retrieved balance");
        Ok(user.balance)
    }

    #[instrument(skip(self), fields(market_id = %market_id))]
    async fn get_user_bets(&self, market_id: &str) -> Result<Vec<Bet>, MarketError> {
        let user_id = self
            .user_id
            .as_deref()
            .ok_or_else(|| MarketError::ParseError("MANIFOLD_USER_ID is not set".to_string()))?;

        let mut bets: Vec<Bet> = Vec::new();
        let mut before: Option<String> = None;

        loop {
            let mut query = vec![
                ("userId", user_id.to_string()),
                ("contractId", market_id.to_string()),
                ("limit", PAGE_SIZE.to_string()),
            ];
            if let Some(before) = &before {
                query.push(("before", before.clone()));
            }

            let page: Vec<Bet> = self.get_json("bets", &query, market_id).await?;
            let page_len = page.len();
            before = page.last().map(|b| b.id.clone());
            bets.extend(page);

            if page_len < PAGE_SIZE {
                break;
            }
        }

        debug!(count = bets.len(), "Retrieved user bets");
        Ok(bets)
    }

    #[instrument(skip(self, order), fields(market_id = %order.contract_id, outcome = %order.outcome))]
    async fn place_bet(&self, order: &BetOrder) -> Result<String, TradingError> {
        order.validate().map_err(TradingError::InvalidParams)?;
        let auth = self.auth_header()?;

        let url = format!("{}/bet", self.api_url);
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(&order.to_request())
            .send()
            .await
            .map_err(|e| TradingError::SubmissionFailed(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TradingError::Rejected { status, body });
        }

        let result: BetResponse = response
            .json()
            .await
            .map_err(|e| TradingError::SubmissionFailed(format!("Failed to parse response: {e}")))?;

        debug!(bet_id = %result.bet_id, filled = ?result.is_filled, "Bet placed");
        Ok(result.bet_id)
    }

    #[instrument(skip(self))]
    async fn cancel_bet(&self, bet_id: &str) -> Result<(), TradingError> {
        let auth = self.auth_header()?;
        let url = format!("{}/bet/cancel/{}", self.api_url, bet_id);

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .send()
            .await
            .map_err(|e| TradingError::CancelFailed {
                bet_id: bet_id.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(bet_id = %bet_id, status = %status, "Cancel rejected");
            return Err(TradingError::CancelFailed {
                bet_id: bet_id.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            manifold_api_key: Some("secret".to_string()),
            manifold_user_id: Some("uid".to_string()),
            manifold_username: Some("bettor".to_string()),
            manifold_api_url: "https://api.example.com/v0/".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn client_creation_works() {
        let client = ManifoldClient::new(&test_config()).unwrap();
        assert_eq!(client.api_url(), "https://api.example.com/v0");
    }

    #[test]
    fn auth_header_uses_key_scheme() {
        let client = ManifoldClient::new(&test_config()).unwrap();
        assert_eq!(client.auth_header().unwrap(), "Key secret");
    }

    #[test]
    fn missing_key_is_an_error() {
        let config = Config {
            manifold_api_key: None,
            ..test_config()
        };
        let client = ManifoldClient::new(&config).unwrap();
        assert!(matches!(client.auth_header(), Err(TradingError::MissingApiKey)));
    }

    #[tokio::test]
    async fn place_bet_without_key_fails_before_network() {
        let config = Config {
            manifold_api_key: None,
            ..test_config()
        };
        let client = ManifoldClient::new(&config).unwrap();
        let order = BetOrder::market("m", crate::market::Outcome::Up, rust_decimal_macros::dec!(5));
        assert!(matches!(
            client.place_bet(&order).await,
            Err(TradingError::MissingApiKey)
        ));
    }
}
