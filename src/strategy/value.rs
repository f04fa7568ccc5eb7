//! Value betting: bet registry markets toward their forecast probability.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use strum::Display;
use tracing::{debug, info, instrument, warn};

use crate::error::{BotError, MarketError};
use crate::forecast::{ForecastEngine, ForecastSpec, PageFetcher};
use crate::market::{MarketApi, Outcome, ResolvedMarkets};
use crate::pricing::{
    classify, kelly_fraction, limit_price, limit_price_is_between, BetThresholds,
    DEFAULT_PRECISION,
};
use crate::registry::{sample_gate, Registry, RegistryEntry};
use crate::trading::{
    group_shares, is_liquidating, place_and_cancel, position_value, shares_from_bets,
    should_bet_position, BetOrder, Placement, DEFAULT_MAX_SHARES,
};
use crate::utils::{compress_sentence, filter_question, DEFAULT_COMPRESSED_LEN};

/// A limit this close to the market price would not move it.
const LIMIT_AT_MARKET: Decimal = dec!(0.001);

/// How much to bet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sizing {
    /// Fixed amount, capped at the whole balance.
    Fixed(Decimal),
    /// Kelly fraction of the balance, times `scale`.
    Kelly {
        /// Multiplier on the Kelly fraction.
        scale: Decimal,
    },
}

/// Decision parameters, validated at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueParams {
    /// Margin and tail.
    pub thresholds: BetThresholds,
    /// Bet sizing.
    pub sizing: Sizing,
    /// Smallest bet worth placing.
    pub min_bet: Decimal,
    /// Cap on the group position.
    pub max_shares: Decimal,
    /// Only bets that shrink the position.
    pub liquidation_only: bool,
    /// Digits of the limit price.
    pub precision: u32,
}

impl ValueParams {
    /// Fixed-amount parameters with default caps.
    pub fn new(thresholds: BetThresholds, sizing: Sizing) -> Self {
        Self {
            thresholds,
            sizing,
            min_bet: Decimal::ONE,
            max_shares: DEFAULT_MAX_SHARES,
            liquidation_only: false,
            precision: DEFAULT_PRECISION,
        }
    }
}

/// What the decision looks at for one market.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketState {
    /// Market probability.
    pub market_p: Decimal,
    /// Forecast probability.
    pub true_p: Decimal,
    /// Own position in this market.
    pub shares: Decimal,
    /// Own position over the market's group.
    pub group_shares: Decimal,
    /// Current balance.
    pub balance: Decimal,
}

/// A bet to place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetPlan {
    /// Side.
    pub outcome: Outcome,
    /// Limit probability.
    pub limit: Decimal,
    /// Amount.
    pub amount: Decimal,
    /// Whether the bet shrinks the current position.
    pub is_liquidating: bool,
}

/// Why no bet was planned.
#[derive(Debug, Clone, Copy, PartialEq, Display)]
pub enum SkipReason {
    /// Only liquidating bets were requested.
    #[strum(to_string = "not a liquidating bet")]
    NotLiquidating,
    /// Limit price equals the market price.
    #[strum(to_string = "limit price at market price")]
    LimitAtMarket,
    /// Limit price is not strictly between market and forecast.
    #[strum(to_string = "limit price not between market and forecast")]
    LimitNotBetween,
    /// Difference below margin or inside the tails.
    #[strum(to_string = "no edge")]
    NoEdge,
    /// Group position already at the cap.
    #[strum(to_string = "position cap reached")]
    PositionCap,
    /// Sized amount below the minimum bet.
    #[strum(to_string = "bet amount below minimum")]
    BelowMinimum(Decimal),
}

/// Decide whether and how to bet on one market.
pub fn plan_bet(params: &ValueParams, state: &MarketState) -> Result<BetPlan, SkipReason> {
    let MarketState {
        market_p,
        true_p,
        shares,
        group_shares,
        balance,
    } = *state;

    let outcome = classify(market_p, true_p);
    let liquidating = is_liquidating(outcome, shares);
    if params.liquidation_only && !liquidating {
        return Err(SkipReason::NotLiquidating);
    }

    let limit = limit_price(market_p, true_p, params.thresholds.tail(), params.precision);
    if (market_p - limit).abs() < LIMIT_AT_MARKET {
        return Err(SkipReason::LimitAtMarket);
    }
    if !limit_price_is_between(market_p, true_p, limit) {
        return Err(SkipReason::LimitNotBetween);
    }

    if !(params.thresholds.should_bet(market_p, true_p) || liquidating) {
        return Err(SkipReason::NoEdge);
    }
    if !should_bet_position(outcome, group_shares, params.max_shares) {
        return Err(SkipReason::PositionCap);
    }

    let amount = match params.sizing {
        Sizing::Kelly { scale } => {
            (kelly_fraction(market_p, true_p, Decimal::ONE) * balance * scale).round()
        }
        Sizing::Fixed(amount) => amount.min(balance.floor()),
    };
    if amount < params.min_bet {
        return Err(SkipReason::BelowMinimum(amount));
    }

    Ok(BetPlan {
        outcome,
        limit,
        amount,
        is_liquidating: liquidating,
    })
}

/// Run settings besides the decision parameters.
#[derive(Debug, Clone)]
pub struct ValueSettings {
    /// Decision parameters.
    pub params: ValueParams,
    /// Log bets instead of placing them.
    pub dry_run: bool,
    /// Question filter.
    pub question_filter: Option<String>,
    /// Pause after each bet.
    pub sleep: Duration,
}

/// Result of one pass over the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundSummary {
    /// Bets placed (or logged, in dry-run mode).
    pub bets_made: u32,
    /// Balance ran out.
    pub balance_exhausted: bool,
}

/// Value-betting driver.
pub struct ValueBetter<'a, C, F> {
    client: &'a C,
    engine: &'a ForecastEngine<F>,
    registry: &'a Registry,
    resolved: &'a mut ResolvedMarkets,
    settings: ValueSettings,
}

impl<'a, C: MarketApi, F: PageFetcher> ValueBetter<'a, C, F> {
    /// Driver over `registry`, marking finished markets in `resolved`.
    pub fn new(
        client: &'a C,
        engine: &'a ForecastEngine<F>,
        registry: &'a Registry,
        resolved: &'a mut ResolvedMarkets,
        settings: ValueSettings,
    ) -> Self {
        Self {
            client,
            engine,
            registry,
            resolved,
            settings,
        }
    }

    /// Run up to `repeat` rounds, stopping early when the balance runs out.
    /// Returns the number of bets made.
    pub async fn run<R: Rng + ?Sized>(&mut self, repeat: u32, rng: &mut R) -> Result<u32, BotError> {
        let mut bets_made = 0;
        for round in 1..=repeat {
            info!(round, repeat, "Starting value betting round");
            let summary = self.run_round(rng).await?;
            bets_made += summary.bets_made;
            if summary.balance_exhausted {
                break;
            }
        }
        Ok(bets_made)
    }

    /// One pass over the registry's forecast markets in random order.
    pub async fn run_round<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<RoundSummary, BotError> {
        let mut summary = RoundSummary::default();

        let mut balance = self.client.get_balance().await?;
        info!(balance = %balance.round(), "Balance");
        if balance < Decimal::ONE && !self.settings.dry_run {
            warn!("Balance too low");
            summary.balance_exhausted = true;
            return Ok(summary);
        }

        let registry = self.registry;
        let mut candidates: Vec<(&str, &RegistryEntry, &ForecastSpec)> = registry
            .forecasts()
            .filter(|(id, _, _)| !self.resolved.contains(id))
            .collect();
        candidates.shuffle(rng);
        info!(markets = candidates.len(), "Found markets");

        for (id, entry, spec) in candidates {
            if !sample_gate(rng, entry.bet_p) {
                continue;
            }

            let (placement, amount) = match self.consider(id, spec, balance).await {
                Ok(Some(placed)) => placed,
                Ok(None) => continue,
                Err(e) => {
                    warn!(market_id = %id, error = %e, "Error processing market");
                    continue;
                }
            };

            summary.bets_made += 1;
            if let Placement::Placed { .. } = placement {
                balance = match self.client.get_balance().await {
                    Ok(b) => b,
                    Err(e) => {
                        warn!(error = %e, "Balance refresh failed");
                        balance - amount
                    }
                };
                info!(balance = %balance.round(), "New balance");
                if balance < Decimal::ONE {
                    warn!("Balance too low");
                    summary.balance_exhausted = true;
                    return Ok(summary);
                }
            }

            if !self.settings.sleep.is_zero() {
                tokio::time::sleep(self.settings.sleep).await;
            }
        }

        Ok(summary)
    }

    async fn position(&self, id: &str) -> Result<(Decimal, Decimal), BotError> {
        let shares = shares_from_bets(&self.client.get_user_bets(id).await?);
        let (same, opposite) = self.registry.group_members(id)?;
        if same.len() == 1 && opposite.is_empty() {
            return Ok((shares, shares));
        }

        let mut same_shares = vec![shares];
        for other in same.iter().filter(|m| m.as_str() != id) {
            same_shares.push(shares_from_bets(&self.client.get_user_bets(other).await?));
        }
        let mut opposite_shares = Vec::with_capacity(opposite.len());
        for other in &opposite {
            opposite_shares.push(shares_from_bets(&self.client.get_user_bets(other).await?));
        }
        Ok((shares, group_shares(&same_shares, &opposite_shares)))
    }

    #[instrument(skip(self, spec, balance))]
    async fn consider(
        &mut self,
        id: &str,
        spec: &ForecastSpec,
        balance: Decimal,
    ) -> Result<Option<(Placement, Decimal)>, BotError> {
        let market = self.client.get_market(id).await?;
        if let Some(filter) = self.settings.question_filter.as_deref() {
            if !filter_question(&market.question, filter) {
                return Ok(None);
            }
        }
        let question = compress_sentence(&market.question, DEFAULT_COMPRESSED_LEN);

        if market.is_finished() {
            info!(%question, "Market closed or resolved, adding to resolved list");
            self.resolved.append(id)?;
            return Ok(None);
        }

        let market_p = market.probability().ok_or_else(|| {
            MarketError::ParseError(format!("{} market has no single probability", market.kind_name()))
        })?;
        let true_p = self.engine.evaluate(spec).await?;
        let (shares, group) = self.position(id).await?;

        let state = MarketState {
            market_p,
            true_p,
            shares,
            group_shares: group,
            balance,
        };
        let plan = match plan_bet(&self.settings.params, &state) {
            Ok(plan) => plan,
            Err(reason) => {
                debug!(
                    %question,
                    market_p = %market_p,
                    true_p = %true_p,
                    %reason,
                    "No bet"
                );
                return Ok(None);
            }
        };

        info!(
            %question,
            market_p = %market_p,
            true_p = %true_p,
            shares = %shares.round(),
            group_shares = %group.round(),
            ev_market = %position_value(shares, market_p).round(),
            ev_true = %position_value(shares, true_p).round(),
            "Value bet"
        );

        let order = BetOrder::limit(id, plan.outcome, plan.amount, plan.limit);
        let placement = place_and_cancel(self.client, &order, self.settings.dry_run).await?;

        if plan.is_liquidating && shares.abs() > dec!(10) && (market_p - true_p).abs() > dec!(0.005) {
            info!(true_p = %true_p, "Position is liquidating, sell down to the forecast");
        }
        Ok(Some((placement, plan.amount)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::StaticFetcher;
    use crate::market::mock::fixtures;
    use crate::market::MockManifoldClient;
    use crate::trading::BetSide;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> ValueParams {
        ValueParams::new(
            BetThresholds::new(dec!(0.02), dec!(0.05)).unwrap(),
            Sizing::Fixed(dec!(10)),
        )
    }

    fn state(market_p: Decimal, true_p: Decimal) -> MarketState {
        MarketState {
            market_p,
            true_p,
            shares: Decimal::ZERO,
            group_shares: Decimal::ZERO,
            balance: dec!(100),
        }
    }

    #[test]
    fn plans_a_down_bet() {
        let plan = plan_bet(&params(), &state(dec!(0.60), dec!(0.503))).unwrap();
        assert_eq!(
            plan,
            BetPlan {
                outcome: Outcome::Down,
                limit: dec!(0.51),
                amount: dec!(10),
                is_liquidating: false,
            }
        );
    }

    #[test]
    fn plans_an_up_bet_with_kelly() {
        let mut params = params();
        params.sizing = Sizing::Kelly { scale: dec!(0.1) };
        let mut state = state(dec!(0.40), dec!(0.503));
        state.balance = dec!(1000);

        // f = 0.503 - 0.497 * 0.4515 = 0.2786, times 100 -> 27.86
        let plan = plan_bet(&params, &state).unwrap();
        assert_eq!(plan.outcome, Outcome::Up);
        assert_eq!(plan.limit, dec!(0.50));
        assert_eq!(plan.amount, dec!(28));
    }

    /// Holding YES, so another YES bet grows the position.
    fn long_state(market_p: Decimal, true_p: Decimal) -> MarketState {
        MarketState {
            shares: dec!(5),
            ..state(market_p, true_p)
        }
    }

    #[test]
    fn small_difference_has_no_edge() {
        assert_eq!(
            plan_bet(&params(), &long_state(dec!(0.50), dec!(0.515))),
            Err(SkipReason::NoEdge)
        );
    }

    #[test]
    fn liquidating_bets_skip_the_margin() {
        for shares in [dec!(-50), dec!(0)] {
            let state = MarketState {
                shares,
                ..long_state(dec!(0.50), dec!(0.515))
            };
            let plan = plan_bet(&params(), &state).unwrap();
            assert!(plan.is_liquidating, "{shares}");
            assert_eq!(plan.outcome, Outcome::Up);
            assert_eq!(plan.limit, dec!(0.51));
        }
    }

    #[test]
    fn limit_below_the_tail_is_not_between() {
        // floor(0.015) = 0.01 is lifted to the 0.05 tail, past the forecast
        assert_eq!(
            plan_bet(&params(), &state(dec!(0.01), dec!(0.015))),
            Err(SkipReason::LimitNotBetween)
        );
    }

    #[test]
    fn liquidation_only_skips_growing_bets() {
        let mut params = params();
        params.liquidation_only = true;
        let mut state = state(dec!(0.40), dec!(0.503));
        state.shares = dec!(5);
        assert_eq!(plan_bet(&params, &state), Err(SkipReason::NotLiquidating));
    }

    #[test]
    fn limit_clamped_to_market_is_skipped() {
        // Limit clamps to 1 - tail = 0.95, which is the market price.
        assert_eq!(
            plan_bet(&params(), &state(dec!(0.95), dec!(0.99))),
            Err(SkipReason::LimitAtMarket)
        );
    }

    #[test]
    fn limit_beyond_forecast_is_skipped() {
        // Rounds up to 0.41, past the market price.
        assert_eq!(
            plan_bet(&params(), &state(dec!(0.405), dec!(0.4001))),
            Err(SkipReason::LimitNotBetween)
        );
    }

    #[test]
    fn group_position_cap() {
        let mut state = state(dec!(0.40), dec!(0.503));
        state.group_shares = dec!(1500);
        assert_eq!(plan_bet(&params(), &state), Err(SkipReason::PositionCap));
    }

    #[test]
    fn fixed_amount_capped_by_balance() {
        let mut state = state(dec!(0.40), dec!(0.503));
        state.balance = dec!(0.7);
        assert_eq!(
            plan_bet(&params(), &state),
            Err(SkipReason::BelowMinimum(dec!(0)))
        );
        state.balance = dec!(4.9);
        assert_eq!(plan_bet(&params(), &state).unwrap().amount, dec!(4));
    }

    const REGISTRY: &str = r#"{
        "up": {"question": "Up?", "group": "g",
               "forecast": {"kind": "fixed", "probability": "0.503"}},
        "twin": {"question": "Twin?", "group": "g"},
        "flat": {"question": "Flat?", "forecast": {"kind": "fixed", "probability": "0.3"}},
        "done": {"question": "Done?", "forecast": {"kind": "fixed", "probability": "0.9"}},
        "never": {"question": "Never?", "bet_p": "0",
                  "forecast": {"kind": "fixed", "probability": "0.9"}}
    }"#;

    struct Fixture {
        client: MockManifoldClient,
        engine: ForecastEngine<StaticFetcher>,
        registry: Registry,
        resolved: ResolvedMarkets,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let client = MockManifoldClient::new();
        client.set_balance(dec!(100));
        client.add_market(fixtures::binary("up", "Up?", dec!(0.40)));
        client.add_market(fixtures::binary("twin", "Twin?", dec!(0.45)));
        client.add_market(fixtures::binary("flat", "Flat?", dec!(0.30)));
        let mut done = fixtures::binary("done", "Done?", dec!(0.50));
        done.is_resolved = true;
        client.add_market(done);
        client.add_market(fixtures::binary("never", "Never?", dec!(0.10)));

        let dir = tempfile::tempdir().unwrap();
        let resolved = ResolvedMarkets::load(dir.path().join("resolved.txt")).unwrap();
        Fixture {
            client,
            engine: ForecastEngine::new(StaticFetcher::new()),
            registry: Registry::from_json(REGISTRY).unwrap(),
            resolved,
            _dir: dir,
        }
    }

    fn settings(dry_run: bool) -> ValueSettings {
        ValueSettings {
            params: params(),
            dry_run,
            question_filter: None,
            sleep: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn round_bets_and_marks_resolved() {
        let mut f = fixture();
        let mut rng = StdRng::seed_from_u64(42);
        let mut better = ValueBetter::new(&f.client, &f.engine, &f.registry, &mut f.resolved, settings(false));
        let summary = better.run_round(&mut rng).await.unwrap();

        assert_eq!(summary.bets_made, 1);
        assert!(!summary.balance_exhausted);

        let placed = f.client.placed_bets();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].contract_id, "up");
        assert_eq!(placed[0].outcome, BetSide::Binary(Outcome::Up));
        assert_eq!(placed[0].limit_prob, Some(dec!(0.50)));
        assert_eq!(f.client.cancelled_bets(), vec!["mock-bet-1".to_string()]);
        assert!(f.resolved.contains("done"));
        assert!(!f.resolved.contains("never"));
    }

    #[tokio::test]
    async fn group_position_blocks_bet() {
        let mut f = fixture();
        f.client.add_bet("twin", fixtures::bet("b1", dec!(2000), "YES"));
        let mut rng = StdRng::seed_from_u64(42);
        let mut better = ValueBetter::new(&f.client, &f.engine, &f.registry, &mut f.resolved, settings(false));
        let summary = better.run_round(&mut rng).await.unwrap();
        assert_eq!(summary.bets_made, 0);
        assert!(f.client.placed_bets().is_empty());
    }

    #[tokio::test]
    async fn dry_run_places_nothing() {
        let mut f = fixture();
        let mut rng = StdRng::seed_from_u64(1);
        let mut better = ValueBetter::new(&f.client, &f.engine, &f.registry, &mut f.resolved, settings(true));
        let made = better.run(2, &mut rng).await.unwrap();
        assert_eq!(made, 2);
        assert!(f.client.placed_bets().is_empty());
    }

    #[tokio::test]
    async fn low_balance_stops_the_run() {
        let mut f = fixture();
        f.client.set_balance(dec!(0.5));
        let mut rng = StdRng::seed_from_u64(1);
        let mut better = ValueBetter::new(&f.client, &f.engine, &f.registry, &mut f.resolved, settings(false));
        assert_eq!(better.run(3, &mut rng).await.unwrap(), 0);
        assert_eq!(f.client.market_requests(), 0);
    }

    #[tokio::test]
    async fn question_filter_limits_markets() {
        let mut f = fixture();
        let mut settings = settings(false);
        settings.question_filter = Some("flat".to_string());
        let mut rng = StdRng::seed_from_u64(3);
        let mut better = ValueBetter::new(&f.client, &f.engine, &f.registry, &mut f.resolved, settings);
        assert_eq!(better.run_round(&mut rng).await.unwrap().bets_made, 0);
        assert!(f.client.placed_bets().is_empty());
        assert!(!f.resolved.contains("done"));
    }
}
