//! Random betting: small market orders with outcomes drawn from the
//! market's own odds.

use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::error::{BotError, MarketError};
use crate::market::{Answer, Market, MarketApi, MarketKind, Outcome};
use crate::pricing::normalize;
use crate::trading::{place_and_cancel, BetOrder, BetSide, Placement};
use crate::utils::{compress_sentence, DEFAULT_COMPRESSED_LEN};

/// Free-response answer holding the initial liquidity.
const LIQUIDITY_ANSWER_ID: &str = "0";

fn sample_answer<'a, R: Rng + ?Sized>(
    market_id: &str,
    answers: impl Iterator<Item = &'a Answer>,
    rng: &mut R,
) -> Result<BetSide, MarketError> {
    let answers: Vec<&Answer> = answers.collect();
    let no_answers = || MarketError::ParseError(format!("market {market_id} has no answers to bet on"));

    let weights = normalize(&answers.iter().map(|a| a.probability).collect::<Vec<_>>())
        .ok_or_else(no_answers)?
        .iter()
        .map(|w| w.to_f64().unwrap_or(0.0))
        .collect::<Vec<_>>();
    let index = WeightedIndex::new(&weights).map_err(|_| no_answers())?;
    Ok(BetSide::Answer(answers[index.sample(rng)].id.clone()))
}

/// Outcome drawn from the market's odds.
///
/// Binary markets bet YES with the market probability, pseudo-numeric
/// markets 50/50, and multi-answer markets pick an answer with its
/// normalised probability.
pub fn choose_outcome<R: Rng + ?Sized>(market: &Market, rng: &mut R) -> Result<BetSide, MarketError> {
    match &market.kind {
        MarketKind::Binary { probability } => {
            let p = probability.to_f64().unwrap_or(0.5);
            let outcome = if rng.gen::<f64>() < p { Outcome::Up } else { Outcome::Down };
            Ok(BetSide::Binary(outcome))
        }
        MarketKind::PseudoNumeric { .. } => {
            let outcome = if rng.gen_bool(0.5) { Outcome::Up } else { Outcome::Down };
            Ok(BetSide::Binary(outcome))
        }
        MarketKind::FreeResponse { answers } => sample_answer(
            &market.id,
            answers.iter().filter(|a| a.id != LIQUIDITY_ANSWER_ID),
            rng,
        ),
        MarketKind::MultipleChoice { answers } => sample_answer(&market.id, answers.iter(), rng),
    }
}

/// Market order for a random outcome on `market`.
pub fn random_order<R: Rng + ?Sized>(
    market: &Market,
    amount: Decimal,
    rng: &mut R,
) -> Result<BetOrder, MarketError> {
    Ok(BetOrder {
        amount,
        contract_id: market.id.clone(),
        outcome: choose_outcome(market, rng)?,
        limit_prob: None,
    })
}

/// Random betting settings.
#[derive(Debug, Clone)]
pub struct RandomSettings {
    /// Amount per bet.
    pub amount: Decimal,
    /// Most markets to bet on.
    pub limit: usize,
    /// Log bets instead of placing them.
    pub dry_run: bool,
    /// Pause after each bet.
    pub sleep: Duration,
}

/// Bet on up to `settings.limit` of `markets`, picked at random. Returns
/// the number of successful bets.
pub async fn bet_random<C: MarketApi, R: Rng + ?Sized>(
    client: &C,
    markets: &[&Market],
    settings: &RandomSettings,
    rng: &mut R,
) -> Result<u32, BotError> {
    let mut markets = markets.to_vec();
    markets.shuffle(rng);
    info!(candidates = markets.len(), limit = settings.limit, "Random betting");

    let mut count = 0;
    for market in markets.into_iter().take(settings.limit) {
        let order = match random_order(market, settings.amount, rng) {
            Ok(order) => order,
            Err(e) => {
                warn!(market_id = %market.id, error = %e, "No outcome to bet on");
                continue;
            }
        };
        match place_and_cancel(client, &order, settings.dry_run).await {
            Ok(_) => {
                count += 1;
                info!(
                    market_id = %market.id,
                    question = %compress_sentence(&market.question, DEFAULT_COMPRESSED_LEN),
                    outcome = %order.outcome,
                    probability = ?market.probability(),
                    "Random bet"
                );
                if !settings.sleep.is_zero() {
                    tokio::time::sleep(settings.sleep).await;
                }
            }
            Err(e) => warn!(market_id = %market.id, error = %e, "Random bet failed"),
        }
    }

    info!(count, "Random betting finished");
    Ok(count)
}

/// Bet `amount` on one market with an outcome drawn from its current odds.
#[instrument(skip(client, rng))]
pub async fn bet_single<C: MarketApi, R: Rng + ?Sized>(
    client: &C,
    market_id: &str,
    amount: Decimal,
    dry_run: bool,
    rng: &mut R,
) -> Result<Placement, BotError> {
    let market = client.get_market(market_id).await?;
    let order = random_order(&market, amount, rng)?;
    Ok(place_and_cancel(client, &order, dry_run).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::mock::fixtures;
    use crate::market::{MockConfig, MockManifoldClient};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;

    fn free_response(id: &str, answers: &[(&str, Decimal)]) -> Market {
        let mut market = fixtures::multiple_choice(id, answers);
        if let MarketKind::MultipleChoice { answers } = market.kind {
            market.kind = MarketKind::FreeResponse { answers };
        }
        market
    }

    #[test]
    fn binary_outcome_follows_probability() {
        let mut rng = StdRng::seed_from_u64(7);
        let sure = fixtures::binary("m", "Sure?", dec!(1));
        let never = fixtures::binary("m", "Never?", dec!(0));
        for _ in 0..50 {
            assert_eq!(choose_outcome(&sure, &mut rng).unwrap(), BetSide::Binary(Outcome::Up));
            assert_eq!(choose_outcome(&never, &mut rng).unwrap(), BetSide::Binary(Outcome::Down));
        }
    }

    #[test]
    fn pseudo_numeric_is_a_coin_flip() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut market = fixtures::binary("m", "How many?", dec!(0.99));
        market.kind = MarketKind::PseudoNumeric { probability: dec!(0.99) };
        let ups = (0..2000)
            .filter(|_| choose_outcome(&market, &mut rng).unwrap() == BetSide::Binary(Outcome::Up))
            .count();
        assert!((800..1200).contains(&ups), "{ups}");
    }

    #[test]
    fn answers_sampled_by_weight() {
        let mut rng = StdRng::seed_from_u64(11);
        let market = fixtures::multiple_choice("m", &[("a", dec!(0)), ("b", dec!(2)), ("c", dec!(0))]);
        for _ in 0..20 {
            assert_eq!(choose_outcome(&market, &mut rng).unwrap(), BetSide::Answer("b".to_string()));
        }
    }

    #[test]
    fn free_response_skips_liquidity_answer() {
        let mut rng = StdRng::seed_from_u64(11);
        let market = free_response("m", &[("0", dec!(0.9)), ("x", dec!(0.1))]);
        for _ in 0..20 {
            assert_eq!(choose_outcome(&market, &mut rng).unwrap(), BetSide::Answer("x".to_string()));
        }

        let only_liquidity = free_response("m", &[("0", dec!(1))]);
        assert!(choose_outcome(&only_liquidity, &mut rng).is_err());
    }

    fn settings(limit: usize) -> RandomSettings {
        RandomSettings {
            amount: dec!(1),
            limit,
            dry_run: false,
            sleep: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn bets_up_to_the_limit_without_cancelling() {
        let client = MockManifoldClient::new();
        client.set_balance(dec!(100));
        let markets: Vec<Market> = (0..5)
            .map(|i| fixtures::binary(&format!("m{i}"), "Random?", dec!(0.5)))
            .collect();
        let refs: Vec<&Market> = markets.iter().collect();

        let mut rng = StdRng::seed_from_u64(3);
        let count = bet_random(&client, &refs, &settings(3), &mut rng).await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(client.placed_bets().len(), 3);
        assert!(client.placed_bets().iter().all(|o| o.limit_prob.is_none()));
        assert!(client.cancelled_bets().is_empty());
    }

    #[tokio::test]
    async fn failures_are_not_counted() {
        let client = MockManifoldClient::with_config(MockConfig {
            balance: dec!(100),
            fail_place: true,
            ..Default::default()
        });
        let market = fixtures::binary("m", "Random?", dec!(0.5));
        let mut rng = StdRng::seed_from_u64(3);
        let count = bet_random(&client, &[&market], &settings(10), &mut rng).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn single_market_bet() {
        let client = MockManifoldClient::new();
        client.set_balance(dec!(100));
        client.add_market(fixtures::multiple_choice("mc", &[("a", dec!(1))]));
        let mut rng = StdRng::seed_from_u64(3);

        let placement = bet_single(&client, "mc", dec!(1), false, &mut rng).await.unwrap();
        assert!(placement.is_placed());
        assert_eq!(client.placed_bets()[0].outcome, BetSide::Answer("a".to_string()));

        assert!(matches!(
            bet_single(&client, "missing", dec!(1), false, &mut rng).await,
            Err(BotError::Market(MarketError::NotFound(_)))
        ));
    }
}
