//! Kelly bet sizing.

use rust_decimal::Decimal;

/// Fraction of the bankroll to bet, capped at `max_fraction`.
///
/// Betting down is treated as betting up on the complement. The payout of a
/// win is approximated by the midpoint of the pre-trade and post-trade
/// prices, since the bet itself moves the market:
///
/// ```text
/// f = p / b - q / a,   a = 1 / ((market_p + true_p) / 2),   b = 1
/// ```
///
/// There is no lower clamp. A non-positive result means "do not bet".
/// A zero edge returns exactly zero.
pub fn kelly_fraction(market_p: Decimal, true_p: Decimal, max_fraction: Decimal) -> Decimal {
    if market_p == true_p {
        return Decimal::ZERO;
    }
    let (market_p, true_p) = if market_p > true_p {
        (Decimal::ONE - market_p, Decimal::ONE - true_p)
    } else {
        (market_p, true_p)
    };
    let p = true_p;
    let q = Decimal::ONE - true_p;
    // q / a with a = 1 / midpoint
    let midpoint = (market_p + true_p) / Decimal::TWO;
    let b = Decimal::ONE;
    let f = p / b - q * midpoint;
    max_fraction.min(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_edge_is_zero() {
        assert_eq!(kelly_fraction(dec!(0.5), dec!(0.5), Decimal::ONE), Decimal::ZERO);
        assert_eq!(kelly_fraction(dec!(0.13), dec!(0.13), Decimal::ONE), Decimal::ZERO);
    }

    #[test]
    fn midpoint_payout() {
        // p = 0.6, q = 0.4, midpoint = 0.5
        assert_eq!(kelly_fraction(dec!(0.4), dec!(0.6), Decimal::ONE), dec!(0.4));
        // p = 0.3, q = 0.7, midpoint = 0.25
        assert_eq!(kelly_fraction(dec!(0.2), dec!(0.3), Decimal::ONE), dec!(0.125));
    }

    #[test]
    fn down_bets_use_the_complement() {
        assert_eq!(
            kelly_fraction(dec!(0.6), dec!(0.4), Decimal::ONE),
            kelly_fraction(dec!(0.4), dec!(0.6), Decimal::ONE)
        );
    }

    #[test]
    fn symmetric_under_complement() {
        let grid = [dec!(0.05), dec!(0.2), dec!(0.5), dec!(0.63), dec!(0.9)];
        for p in grid {
            for q in grid {
                assert_eq!(
                    kelly_fraction(p, q, Decimal::ONE),
                    kelly_fraction(Decimal::ONE - p, Decimal::ONE - q, Decimal::ONE),
                    "{p} {q}"
                );
            }
        }
    }

    #[test]
    fn capped_by_max_fraction() {
        assert_eq!(kelly_fraction(dec!(0.4), dec!(0.6), dec!(0.1)), dec!(0.1));
    }

    #[test]
    fn small_edge_small_fraction() {
        // p = 0.12, q = 0.88, midpoint = 0.11
        assert_eq!(kelly_fraction(dec!(0.1), dec!(0.12), Decimal::ONE), dec!(0.0232));
    }
}
