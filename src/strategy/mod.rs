//! Betting drivers.
//!
//! Each driver keeps its decision in a pure `plan_*` function and wraps it
//! in an async loop that fetches markets, logs, and submits bets.
//!
//! - [`value`]: registry markets against their forecast
//! - [`arbitrage`]: pairs of registry markets against each other
//! - [`random`]: random outcomes on snapshot markets

pub mod arbitrage;
pub mod random;
pub mod value;

pub use arbitrage::{plan_pair, ArbBetter, ArbParams, ArbSettings, ArbSummary, PairPlan, PairSkip};
pub use random::{bet_random, bet_single, choose_outcome, RandomSettings};
pub use value::{plan_bet, BetPlan, MarketState, SkipReason, Sizing, ValueBetter, ValueParams, ValueSettings};
