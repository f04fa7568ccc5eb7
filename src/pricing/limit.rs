//! Outcome classification and limit-price selection.

use rust_decimal::Decimal;

use super::precision_scale;
use crate::market::Outcome;

/// Digits after the decimal point accepted by the bet endpoint.
pub const DEFAULT_PRECISION: u32 = 2;

/// Side to bet given the market price and the believed probability.
///
/// Ties go to [`Outcome::Up`].
pub fn classify(market_p: Decimal, true_p: Decimal) -> Outcome {
    if true_p < market_p {
        Outcome::Down
    } else {
        Outcome::Up
    }
}

/// Conservative limit price for a bet from `market_p` towards `true_p`.
///
/// `true_p` is rounded towards the market (up when betting down, down when
/// betting up) and clamped into `[tail, 1 - tail]` on both sides.
pub fn limit_price(market_p: Decimal, true_p: Decimal, tail: Decimal, precision: u32) -> Decimal {
    let scale = precision_scale(precision);
    let rounded = match classify(market_p, true_p) {
        Outcome::Down => (true_p * scale).ceil() / scale,
        Outcome::Up => (true_p * scale).floor() / scale,
    };
    rounded.max(tail).min(Decimal::ONE - tail)
}

/// Whether `limit` lies strictly between `market_p` and `true_p`.
pub fn limit_price_is_between(market_p: Decimal, true_p: Decimal, limit: Decimal) -> bool {
    match classify(market_p, true_p) {
        Outcome::Down => true_p < limit && limit < market_p,
        Outcome::Up => market_p < limit && limit < true_p,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn classify_picks_side() {
        assert_eq!(classify(dec!(0.6), dec!(0.4)), Outcome::Down);
        assert_eq!(classify(dec!(0.4), dec!(0.6)), Outcome::Up);
        assert_eq!(classify(dec!(0.5), dec!(0.5)), Outcome::Up);
    }

    #[test]
    fn limit_rounds_towards_market() {
        // betting down: round true_p up
        assert_eq!(limit_price(dec!(0.60), dec!(0.423), dec!(0.05), 2), dec!(0.43));
        // betting up: round true_p down
        assert_eq!(limit_price(dec!(0.30), dec!(0.457), dec!(0.05), 2), dec!(0.45));
    }

    #[test]
    fn limit_is_clamped_to_tails() {
        assert_eq!(limit_price(dec!(0.20), dec!(0.011), dec!(0.05), 2), dec!(0.05));
        assert_eq!(limit_price(dec!(0.80), dec!(0.993), dec!(0.05), 2), dec!(0.95));
    }

    #[test]
    fn limit_inside_the_far_tail() {
        // betting up towards a forecast below the tail
        assert_eq!(limit_price(dec!(0.01), dec!(0.015), dec!(0.02), 2), dec!(0.02));
        // betting down towards a forecast above 1 - tail
        assert_eq!(limit_price(dec!(0.99), dec!(0.985), dec!(0.02), 2), dec!(0.98));
    }

    #[test]
    fn limit_stays_inside_tails() {
        let tail = dec!(0.03);
        let grid = [
            dec!(0), dec!(0.001), dec!(0.02), dec!(0.25), dec!(0.5), dec!(0.777), dec!(0.98),
            dec!(0.999), dec!(1),
        ];
        for market_p in grid {
            for true_p in grid {
                let l = limit_price(market_p, true_p, tail, 2);
                assert!(l >= tail && l <= Decimal::ONE - tail, "{market_p} {true_p} -> {l}");
            }
        }
    }

    #[test]
    fn limit_with_zero_precision() {
        // floor(0.7) = 0 and ceil(0.3) = 1, both pulled back inside the tails
        assert_eq!(limit_price(dec!(0.2), dec!(0.7), dec!(0.05), 0), dec!(0.05));
        assert_eq!(limit_price(dec!(0.9), dec!(0.3), dec!(0.05), 0), dec!(0.95));
    }

    #[test]
    fn between_checks_correct_side() {
        assert!(limit_price_is_between(dec!(0.60), dec!(0.40), dec!(0.41)));
        assert!(!limit_price_is_between(dec!(0.60), dec!(0.40), dec!(0.40)));
        assert!(!limit_price_is_between(dec!(0.60), dec!(0.40), dec!(0.60)));
        assert!(limit_price_is_between(dec!(0.30), dec!(0.50), dec!(0.49)));
        assert!(!limit_price_is_between(dec!(0.30), dec!(0.50), dec!(0.55)));
    }

    #[test]
    fn degenerate_rounding_fails_between_check() {
        // market 0.401, true 0.409: floor(40.9)/100 = 0.40 is not above the market
        let l = limit_price(dec!(0.401), dec!(0.409), dec!(0.05), 2);
        assert_eq!(l, dec!(0.40));
        assert!(!limit_price_is_between(dec!(0.401), dec!(0.409), l));
    }
}
