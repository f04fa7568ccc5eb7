//! Position tracking.
//!
//! A position is a signed share count: positive means net YES, negative
//! means net NO.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::market::{Bet, Outcome};

/// Default cap on the group position before only liquidating bets are allowed.
pub const DEFAULT_MAX_SHARES: Decimal = dec!(1000);

/// Expected value of a signed share position at `probability`.
pub fn position_value(shares: Decimal, probability: Decimal) -> Decimal {
    let yes = shares.max(Decimal::ZERO);
    let no = (-shares).max(Decimal::ZERO);
    probability * yes + (Decimal::ONE - probability) * no
}

/// Whether betting `outcome` reduces the position instead of growing it.
pub fn is_liquidating(outcome: Outcome, shares: Decimal) -> bool {
    match outcome {
        Outcome::Up => shares < Decimal::ONE,
        Outcome::Down => shares > Decimal::ONE,
    }
}

/// Whether the position leaves room for another bet on `outcome`.
pub fn should_bet_position(outcome: Outcome, shares: Decimal, max_shares: Decimal) -> bool {
    match outcome {
        Outcome::Up => shares <= max_shares,
        Outcome::Down => shares >= -max_shares,
    }
}

/// Net position (YES minus NO shares) from a user's bets on one market.
pub fn shares_from_bets(bets: &[Bet]) -> Decimal {
    bets.iter()
        .map(|bet| match bet.outcome.as_str() {
            "YES" => bet.shares,
            "NO" => -bet.shares,
            _ => Decimal::ZERO,
        })
        .sum()
}

/// Position over a group: shares in same-outcome markets minus shares in
/// complementary markets.
pub fn group_shares(same: &[Decimal], opposite: &[Decimal]) -> Decimal {
    let same: Decimal = same.iter().copied().sum();
    let opposite: Decimal = opposite.iter().copied().sum();
    same - opposite
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bet(shares: Decimal, outcome: &str) -> Bet {
        Bet {
            id: format!("{outcome}-{shares}"),
            shares,
            outcome: outcome.to_string(),
            created_time: 0,
        }
    }

    #[test]
    fn position_value_by_side() {
        assert_eq!(position_value(dec!(10), dec!(0.6)), dec!(6.0));
        assert_eq!(position_value(dec!(-10), dec!(0.6)), dec!(4.0));
        assert_eq!(position_value(dec!(0), dec!(0.6)), dec!(0));
    }

    #[test]
    fn liquidation() {
        assert!(is_liquidating(Outcome::Up, dec!(0.5)));
        assert!(!is_liquidating(Outcome::Up, dec!(5)));
        assert!(is_liquidating(Outcome::Down, dec!(5)));
        assert!(!is_liquidating(Outcome::Down, dec!(-3)));
    }

    #[test]
    fn position_cap() {
        assert!(should_bet_position(Outcome::Up, dec!(1000), DEFAULT_MAX_SHARES));
        assert!(!should_bet_position(Outcome::Up, dec!(1000.5), DEFAULT_MAX_SHARES));
        assert!(should_bet_position(Outcome::Down, dec!(1500), DEFAULT_MAX_SHARES));
        assert!(!should_bet_position(Outcome::Down, dec!(-1001), DEFAULT_MAX_SHARES));
    }

    #[test]
    fn net_shares_from_bets() {
        let bets = vec![
            bet(dec!(20), "YES"),
            bet(dec!(5), "NO"),
            bet(dec!(-4), "YES"),
            bet(dec!(3), "answer-1"),
        ];
        assert_eq!(shares_from_bets(&bets), dec!(11));
        assert_eq!(shares_from_bets(&[]), dec!(0));
    }

    #[test]
    fn group_position() {
        assert_eq!(group_shares(&[dec!(10), dec!(5)], &[dec!(20)]), dec!(-5));
        assert_eq!(group_shares(&[dec!(7)], &[]), dec!(7));
    }
}
