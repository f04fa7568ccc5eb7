//! Bet submission.

use tracing::{info, instrument, warn};

use super::order::BetOrder;
use crate::error::TradingError;
use crate::market::MarketApi;

/// Outcome of [`place_and_cancel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Nothing was sent.
    DryRun,
    /// The bet was accepted with this id.
    Placed {
        /// Bet id.
        bet_id: String,
    },
}

impl Placement {
    /// Whether a real bet went through.
    pub fn is_placed(&self) -> bool {
        matches!(self, Placement::Placed { .. })
    }
}

/// Place a bet and immediately cancel whatever part of it did not fill.
///
/// The limit only caps the execution price; nothing is left resting on the
/// book. A failed cancel is logged and the placement still counts.
#[instrument(skip(client, order), fields(market_id = %order.contract_id))]
pub async fn place_and_cancel<C: MarketApi>(
    client: &C,
    order: &BetOrder,
    dry_run: bool,
) -> Result<Placement, TradingError> {
    order.validate().map_err(TradingError::InvalidParams)?;

    let limit = order
        .limit_prob
        .map(|p| format!("{:.1} %", p * rust_decimal::Decimal::ONE_HUNDRED))
        .unwrap_or_else(|| "market".to_string());
    info!(
        amount = %order.amount,
        outcome = %order.outcome,
        limit = %limit,
        dry_run,
        "Placing bet"
    );

    if dry_run {
        return Ok(Placement::DryRun);
    }

    let bet_id = client.place_bet(order).await?;

    if order.limit_prob.is_some() {
        if let Err(e) = client.cancel_bet(&bet_id).await {
            warn!(bet_id = %bet_id, error = %e, "Failed to cancel unfilled remainder");
        }
    }

    info!(bet_id = %bet_id, "Bet placed");
    Ok(Placement::Placed { bet_id })
}
