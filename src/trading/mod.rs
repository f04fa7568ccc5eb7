//! Trading module for bet creation and submission.
//!
//! This module handles:
//! - Bet orders and their request bodies
//! - Place-then-cancel submission
//! - Position helpers over a user's shares

pub mod execution;
pub mod order;
pub mod position;

pub use execution::{place_and_cancel, Placement};
pub use order::{BetOrder, BetSide};
pub use position::{
    group_shares, is_liquidating, position_value, shares_from_bets, should_bet_position,
    DEFAULT_MAX_SHARES,
};
