//! Limit price and leg sizing for two correlated markets.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::PricingError;
use crate::market::Outcome;

/// Default weight towards the end of the pair closest to 50 %.
pub const DEFAULT_LEAN: Decimal = dec!(0.56);

const HALF: Decimal = dec!(0.5);

/// Single limit price for both legs of a paired bet.
///
/// `lo_p <= hi_p` are the two probabilities in the same outcome space. A pair
/// straddling 50 % gets the midpoint. Otherwise the price leans towards the
/// end closer to 50 %. The result is rounded half-to-even to `precision`
/// digits.
pub fn arb_limit_price(
    lo_p: Decimal,
    hi_p: Decimal,
    precision: u32,
    lean: Decimal,
) -> Result<Decimal, PricingError> {
    if precision > 2 {
        return Err(PricingError::InvalidInput(format!(
            "precision must be at most 2, got {precision}"
        )));
    }
    if lean < Decimal::ZERO || lean > Decimal::ONE {
        return Err(PricingError::InvalidInput(format!(
            "lean must be between 0 and 1, got {lean}"
        )));
    }

    let spread = hi_p - lo_p;
    let price = if lo_p < HALF && HALF < hi_p {
        lo_p + spread / Decimal::TWO
    } else if lo_p <= hi_p && hi_p <= HALF {
        lo_p + lean * spread
    } else if HALF <= lo_p && lo_p <= hi_p {
        lo_p + (Decimal::ONE - lean) * spread
    } else {
        return Err(PricingError::InvalidOrdering { lo: lo_p, hi: hi_p });
    };

    Ok(price.round_dp(precision))
}

/// Stake for one leg of a pair: the base amount scaled by the leg's win
/// probability, rounded half-to-even to a whole amount.
pub fn pair_leg_amount(base_amount: Decimal, p: Decimal, outcome: Outcome) -> Decimal {
    let p_win = match outcome {
        Outcome::Up => p,
        Outcome::Down => Decimal::ONE - p,
    };
    (base_amount * p_win).round()
}
