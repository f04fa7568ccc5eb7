//! Margin and tail gating for bets.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::limit::classify;
use crate::error::PricingError;
use crate::market::Outcome;

/// Smallest accepted margin (1 %).
pub const MIN_MARGIN: Decimal = dec!(0.01);

/// Smallest accepted tail (2 %).
pub const MIN_TAIL: Decimal = dec!(0.02);

/// Slack added to the tail so a market sitting just above the tail
/// (e.g. 0.05001 with a 0.05 tail) is not traded for nothing.
pub const DEFAULT_TAIL_ADJUSTMENT: Decimal = dec!(0.001);

/// Validated margin/tail configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetThresholds {
    margin: Decimal,
    tail: Decimal,
    tail_adjustment: Decimal,
}

impl BetThresholds {
    /// Validate thresholds with the default tail adjustment.
    pub fn new(margin: Decimal, tail: Decimal) -> Result<Self, PricingError> {
        Self::with_tail_adjustment(margin, tail, DEFAULT_TAIL_ADJUSTMENT)
    }

    /// Validate thresholds with an explicit tail adjustment.
    pub fn with_tail_adjustment(
        margin: Decimal,
        tail: Decimal,
        tail_adjustment: Decimal,
    ) -> Result<Self, PricingError> {
        if margin < MIN_MARGIN {
            return Err(PricingError::InvalidConfig {
                name: "margin",
                value: margin,
                minimum: MIN_MARGIN,
            });
        }
        if tail < MIN_TAIL {
            return Err(PricingError::InvalidConfig {
                name: "tail",
                value: tail,
                minimum: MIN_TAIL,
            });
        }
        if tail_adjustment < Decimal::ZERO {
            return Err(PricingError::InvalidConfig {
                name: "tail_adjustment",
                value: tail_adjustment,
                minimum: Decimal::ZERO,
            });
        }
        Ok(Self {
            margin,
            tail,
            tail_adjustment,
        })
    }

    /// Minimum probability gap.
    pub fn margin(&self) -> Decimal {
        self.margin
    }

    /// Distance from 0 and 1 that is not traded into.
    pub fn tail(&self) -> Decimal {
        self.tail
    }

    /// Whether the gap is large enough and the trade does not push further
    /// into a tail.
    pub fn should_bet(&self, market_p: Decimal, true_p: Decimal) -> bool {
        if (market_p - true_p).abs() < self.margin {
            return false;
        }
        let edge = self.tail + self.tail_adjustment;
        match classify(market_p, true_p) {
            Outcome::Down => market_p > edge,
            Outcome::Up => market_p < Decimal::ONE - edge,
        }
    }
}

/// One-shot form of [`BetThresholds::should_bet`].
///
/// Returns a configuration error when `margin < 0.01` or `tail < 0.02`.
pub fn should_bet(
    market_p: Decimal,
    true_p: Decimal,
    margin: Decimal,
    tail: Decimal,
) -> Result<bool, PricingError> {
    Ok(BetThresholds::new(margin, tail)?.should_bet(market_p, true_p))
}
