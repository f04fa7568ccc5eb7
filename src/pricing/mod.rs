//! Betting decision and pricing math.
//!
//! Everything in here is a pure function of decimal probabilities: no I/O,
//! no clocks, no shared state. Drivers fetch market and forecast data and
//! call into this module to decide the side, the limit price and the size.
//!
//! - [`limit`]: outcome classifier and limit-price selection
//! - [`trigger`]: margin and tail gating
//! - [`kelly`]: bankroll fraction from a probability edge
//! - [`arb`]: single limit price for a pair of correlated markets

pub mod arb;
pub mod kelly;
pub mod limit;
pub mod trigger;

use rust_decimal::Decimal;

pub use arb::{arb_limit_price, pair_leg_amount, DEFAULT_LEAN};
pub use kelly::kelly_fraction;
pub use limit::{classify, limit_price, limit_price_is_between, DEFAULT_PRECISION};
pub use trigger::{should_bet, BetThresholds, DEFAULT_TAIL_ADJUSTMENT, MIN_MARGIN, MIN_TAIL};

/// `10^precision` as a decimal step divisor.
pub(crate) fn precision_scale(precision: u32) -> Decimal {
    Decimal::from(10u64.pow(precision))
}

/// Scale non-negative weights so they sum to one.
///
/// Returns `None` when the weights do not have a positive sum.
pub fn normalize(weights: &[Decimal]) -> Option<Vec<Decimal>> {
    let total: Decimal = weights.iter().copied().sum();
    if total <= Decimal::ZERO {
        return None;
    }
    Some(weights.iter().map(|w| *w / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn normalize_scales_to_one() {
        let weights = normalize(&[dec!(1), dec!(3)]).unwrap();
        assert_eq!(weights, vec![dec!(0.25), dec!(0.75)]);
    }

    #[test]
    fn normalize_rejects_zero_sum() {
        assert!(normalize(&[]).is_none());
        assert!(normalize(&[dec!(0), dec!(0)]).is_none());
    }

    #[test]
    fn precision_scale_powers_of_ten() {
        assert_eq!(precision_scale(0), dec!(1));
        assert_eq!(precision_scale(2), dec!(100));
    }
}
