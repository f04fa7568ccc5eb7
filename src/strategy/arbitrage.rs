//! Two-market arbitrage: bet two markets on the same event toward each other.

use std::time::Duration;

use rust_decimal::Decimal;
use strum::Display;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{BotError, MarketError, PricingError, TradingError};
use crate::market::{Market, MarketApi, Outcome, ResolvedMarkets};
use crate::pricing::{
    arb_limit_price, classify, limit_price_is_between, pair_leg_amount, DEFAULT_LEAN, DEFAULT_PRECISION,
    MIN_MARGIN,
};
use crate::registry::MarketPair;
use crate::trading::{place_and_cancel, BetOrder, Placement};
use crate::utils::{compress_sentence, filter_question, DEFAULT_COMPRESSED_LEN};

/// Pair decision parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ArbParams {
    margin: Decimal,
    /// Base amount per leg before scaling by the leg's win probability.
    pub amount: Decimal,
    /// Smallest leg worth placing.
    pub min_bet: Decimal,
    /// Digits of the limit price.
    pub precision: u32,
    /// Weight toward the end of the pair closer to 50 %.
    pub lean: Decimal,
}

impl ArbParams {
    /// Validate the margin.
    pub fn new(margin: Decimal, amount: Decimal) -> Result<Self, PricingError> {
        if margin < MIN_MARGIN {
            return Err(PricingError::InvalidConfig {
                name: "margin",
                value: margin,
                minimum: MIN_MARGIN,
            });
        }
        Ok(Self {
            margin,
            amount,
            min_bet: Decimal::ONE,
            precision: DEFAULT_PRECISION,
            lean: DEFAULT_LEAN,
        })
    }

    /// Smallest probability gap worth betting.
    pub fn margin(&self) -> Decimal {
        self.margin
    }
}

/// One side of a pair bet.
#[derive(Debug, Clone, PartialEq)]
pub struct LegPlan {
    /// Market id.
    pub market_id: String,
    /// Side, from the market's own probability and limit.
    pub outcome: Outcome,
    /// Limit in the market's own probability space.
    pub limit: Decimal,
    /// Amount.
    pub amount: Decimal,
}

impl LegPlan {
    fn order(&self) -> BetOrder {
        BetOrder::limit(self.market_id.clone(), self.outcome, self.amount, self.limit)
    }
}

/// Both legs of a pair bet.
#[derive(Debug, Clone, PartialEq)]
pub struct PairPlan {
    /// Leg on the first market.
    pub first: LegPlan,
    /// Leg on the second market.
    pub second: LegPlan,
    /// Probability gap in the first market's space.
    pub diff: Decimal,
}

/// Why a pair was not bet.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum PairSkip {
    /// Gap below margin.
    #[strum(to_string = "difference below margin")]
    NoMargin,
    /// Rounded limit falls outside the gap.
    #[strum(to_string = "limit price not between the two markets")]
    NotBetween,
    /// A leg sized below the minimum bet.
    #[strum(to_string = "leg amount below minimum")]
    BelowMinimum,
    /// Limit price could not be computed.
    #[strum(to_string = "invalid limit price")]
    InvalidPrice(PricingError),
}

/// Decide how to bet a pair with YES probabilities `p_1` and `p_2`.
///
/// The limit is computed in the first market's probability space and
/// mapped back to the second market's space for complementary pairs.
pub fn plan_pair(
    params: &ArbParams,
    pair: &MarketPair,
    p_1: Decimal,
    p_2: Decimal,
    balance: Decimal,
) -> Result<PairPlan, PairSkip> {
    let to_first = |p: Decimal| if pair.is_complementary { Decimal::ONE - p } else { p };

    let p_2_in_1 = to_first(p_2);
    let diff = (p_1 - p_2_in_1).abs();
    let (lo, hi) = if p_1 > p_2_in_1 { (p_2_in_1, p_1) } else { (p_1, p_2_in_1) };

    let limit_1 = arb_limit_price(lo, hi, params.precision, params.lean).map_err(PairSkip::InvalidPrice)?;
    let limit_2 = to_first(limit_1);

    if diff < params.margin {
        return Err(PairSkip::NoMargin);
    }
    if !limit_price_is_between(lo, hi, limit_1) {
        return Err(PairSkip::NotBetween);
    }

    let cap = (balance / Decimal::TWO).floor();
    let leg = |market_id: &str, p: Decimal, limit: Decimal| {
        let outcome = classify(p, limit);
        LegPlan {
            market_id: market_id.to_string(),
            outcome,
            limit,
            amount: pair_leg_amount(params.amount, p, outcome).min(cap),
        }
    };
    let first = leg(&pair.markets.0, p_1, limit_1);
    let second = leg(&pair.markets.1, p_2, limit_2);

    if first.amount < params.min_bet || second.amount < params.min_bet {
        return Err(PairSkip::BelowMinimum);
    }
    Ok(PairPlan { first, second, diff })
}

/// Run settings besides the decision parameters.
#[derive(Debug, Clone)]
pub struct ArbSettings {
    /// Decision parameters.
    pub params: ArbParams,
    /// Log bets instead of placing them.
    pub dry_run: bool,
    /// Question filter; either market may match.
    pub question_filter: Option<String>,
    /// Pause after each pair bet.
    pub sleep: Duration,
}

/// Result of a pass over the pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArbSummary {
    /// Pairs with at least one leg placed (or logged, in dry-run mode).
    pub pairs_bet: u32,
    /// Balance ran out.
    pub balance_exhausted: bool,
}

/// Pair-betting driver.
pub struct ArbBetter<'a, C> {
    client: &'a C,
    resolved: &'a mut ResolvedMarkets,
    settings: ArbSettings,
}

impl<'a, C: MarketApi> ArbBetter<'a, C> {
    /// Driver marking finished markets in `resolved`.
    pub fn new(client: &'a C, resolved: &'a mut ResolvedMarkets, settings: ArbSettings) -> Self {
        Self {
            client,
            resolved,
            settings,
        }
    }

    /// Bet every pair in order, stopping when the balance runs out.
    pub async fn run(&mut self, pairs: &[MarketPair]) -> Result<ArbSummary, BotError> {
        let mut summary = ArbSummary::default();

        let mut balance = self.client.get_balance().await?;
        info!(balance = %balance.round(), pairs = pairs.len(), "Starting arbitrage");
        if balance < Decimal::ONE && !self.settings.dry_run {
            warn!("Balance too low");
            summary.balance_exhausted = true;
            return Ok(summary);
        }

        for pair in pairs {
            let placed = match self.consider(pair, balance).await {
                Ok(Some(placed)) => placed,
                Ok(None) => continue,
                Err(e) => {
                    warn!(group = %pair.name, error = %e, "Error processing pair");
                    continue;
                }
            };

            summary.pairs_bet += 1;
            if placed {
                match self.client.get_balance().await {
                    Ok(b) => balance = b,
                    Err(e) => warn!(error = %e, "Balance refresh failed"),
                }
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

    fn mark_finished(&mut self, market: &Market) -> Result<(), MarketError> {
        if market.is_finished() {
            info!(
                market_id = %market.id,
                question = %compress_sentence(&market.question, DEFAULT_COMPRESSED_LEN),
                "Market closed or resolved, adding to resolved list"
            );
            self.resolved.append(&market.id)?;
        }
        Ok(())
    }

    /// Returns `None` when the pair was skipped, otherwise whether a real
    /// bet went through on either leg.
    #[instrument(skip(self, pair, balance), fields(group = %pair.name))]
    async fn consider(&mut self, pair: &MarketPair, balance: Decimal) -> Result<Option<bool>, BotError> {
        let (id_1, id_2) = (&pair.markets.0, &pair.markets.1);
        if self.resolved.contains(id_1) || self.resolved.contains(id_2) {
            return Ok(None);
        }

        let (market_1, market_2) =
            tokio::try_join!(self.client.get_market(id_1), self.client.get_market(id_2))?;
        if market_1.is_finished() || market_2.is_finished() {
            self.mark_finished(&market_1)?;
            self.mark_finished(&market_2)?;
            return Ok(None);
        }

        if let Some(filter) = self.settings.question_filter.as_deref() {
            if !(filter_question(&market_1.question, filter) || filter_question(&market_2.question, filter)) {
                return Ok(None);
            }
        }

        let probability = |m: &Market| {
            m.probability().ok_or_else(|| {
                MarketError::ParseError(format!("{} market {} has no single probability", m.kind_name(), m.id))
            })
        };
        let (p_1, p_2) = (probability(&market_1)?, probability(&market_2)?);

        let plan = match plan_pair(&self.settings.params, pair, p_1, p_2, balance) {
            Ok(plan) => plan,
            Err(reason) => {
                debug!(p_1 = %p_1, p_2 = %p_2, %reason, "No pair bet");
                return Ok(None);
            }
        };

        info!(
            question_1 = %compress_sentence(&market_1.question, DEFAULT_COMPRESSED_LEN),
            question_2 = %compress_sentence(&market_2.question, DEFAULT_COMPRESSED_LEN),
            p_1 = %p_1,
            p_2 = %p_2,
            diff = %plan.diff,
            limit_1 = %plan.first.limit,
            limit_2 = %plan.second.limit,
            complementary = pair.is_complementary,
            "Pair bet"
        );

        let (first, second) = (plan.first.order(), plan.second.order());
        let dry_run = self.settings.dry_run;
        let (result_1, result_2) = tokio::join!(
            place_and_cancel(self.client, &first, dry_run),
            place_and_cancel(self.client, &second, dry_run),
        );

        let placed = |result: &Result<Placement, TradingError>, leg: &BetOrder| match result {
            Ok(placement) => placement.is_placed(),
            Err(e) => {
                error!(market_id = %leg.contract_id, error = %e, "Leg failed");
                false
            }
        };
        let placed_1 = placed(&result_1, &first);
        let placed_2 = placed(&result_2, &second);

        if result_1.is_err() && result_2.is_err() {
            return Ok(None);
        }
        Ok(Some(placed_1 || placed_2))
    }
}
