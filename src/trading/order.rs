//! Bet orders and their wire form.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market::Outcome;

/// What a bet is placed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BetSide {
    /// YES/NO on a binary or pseudo-numeric market.
    Binary(Outcome),
    /// One answer of a free-response or multiple-choice market.
    Answer(String),
}

impl fmt::Display for BetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetSide::Binary(outcome) => write!(f, "{outcome}"),
            BetSide::Answer(id) => write!(f, "answer {id}"),
        }
    }
}

/// A bet to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct BetOrder {
    /// Amount of play money to spend.
    pub amount: Decimal,
    /// Market id.
    pub contract_id: String,
    /// Outcome or answer.
    pub outcome: BetSide,
    /// Limit probability; `None` for a market order.
    pub limit_prob: Option<Decimal>,
}

impl BetOrder {
    /// Limit order on a binary market.
    pub fn limit(
        contract_id: impl Into<String>,
        outcome: Outcome,
        amount: Decimal,
        limit_prob: Decimal,
    ) -> Self {
        Self {
            amount,
            contract_id: contract_id.into(),
            outcome: BetSide::Binary(outcome),
            limit_prob: Some(limit_prob),
        }
    }

    /// Market order on a binary market.
    pub fn market(contract_id: impl Into<String>, outcome: Outcome, amount: Decimal) -> Self {
        Self {
            amount,
            contract_id: contract_id.into(),
            outcome: BetSide::Binary(outcome),
            limit_prob: None,
        }
    }

    /// Market order on one answer of a multi-outcome market.
    pub fn answer(
        contract_id: impl Into<String>,
        answer_id: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            amount,
            contract_id: contract_id.into(),
            outcome: BetSide::Answer(answer_id.into()),
            limit_prob: None,
        }
    }

    /// Validate order parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.contract_id.is_empty() {
            return Err("contract_id is required".to_string());
        }
        if self.amount < Decimal::ONE {
            return Err(format!("amount must be at least 1, got {}", self.amount));
        }
        if self.amount.fract() != Decimal::ZERO {
            return Err(format!("amount must be a whole number, got {}", self.amount));
        }
        if let Some(limit) = self.limit_prob {
            if limit <= Decimal::ZERO || limit >= Decimal::ONE {
                return Err(format!("limit_prob must be inside (0, 1), got {limit}"));
            }
        }
        Ok(())
    }

    /// Request body for the bet endpoint.
    pub fn to_request(&self) -> BetRequest {
        let (outcome, answer_id) = match &self.outcome {
            BetSide::Binary(outcome) => (*outcome, None),
            BetSide::Answer(id) => (Outcome::Up, Some(id.clone())),
        };
        BetRequest {
            amount: self.amount,
            contract_id: self.contract_id.clone(),
            outcome,
            answer_id,
            limit_prob: self.limit_prob,
        }
    }
}

/// Bet submission request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRequest {
    /// Amount to spend.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Market id.
    pub contract_id: String,
    /// YES or NO.
    pub outcome: Outcome,
    /// Answer id for multi-outcome markets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_id: Option<String>,
    /// Limit probability.
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit_prob: Option<Decimal>,
}

/// Bet submission result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetResponse {
    /// Id of the created bet.
    #[serde(alias = "id")]
    pub bet_id: String,
    /// Whether the order rests unfilled on the book.
    #[serde(default)]
    pub is_filled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn limit_order_request_body() {
        let order = BetOrder::limit("m1", Outcome::Down, dec!(10), dec!(0.43));
        let body = serde_json::to_value(order.to_request()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "amount": 10.0,
                "contractId": "m1",
                "outcome": "NO",
                "limitProb": 0.43
            })
        );
    }

    #[test]
    fn answer_order_request_body() {
        let order = BetOrder::answer("mc", "a7", dec!(1));
        let body = serde_json::to_value(order.to_request()).unwrap();
        assert_eq!(body["outcome"], "YES");
        assert_eq!(body["answerId"], "a7");
        assert!(body.get("limitProb").is_none());
    }

    #[test]
    fn validation() {
        assert!(BetOrder::market("m", Outcome::Up, dec!(5)).validate().is_ok());
        assert!(BetOrder::market("", Outcome::Up, dec!(5)).validate().is_err());
        assert!(BetOrder::market("m", Outcome::Up, dec!(0)).validate().is_err());
        assert!(BetOrder::market("m", Outcome::Up, dec!(2.5)).validate().is_err());
        assert!(BetOrder::limit("m", Outcome::Up, dec!(5), dec!(1)).validate().is_err());
    }

    #[test]
    fn side_display() {
        assert_eq!(BetSide::Binary(Outcome::Up).to_string(), "YES");
        assert_eq!(BetSide::Answer("x".into()).to_string(), "answer x");
    }

    #[test]
    fn parses_response() {
        let resp: BetResponse = serde_json::from_str(r#"{"betId": "b1", "isFilled": false}"#).unwrap();
        assert_eq!(resp.bet_id, "b1");
        assert_eq!(resp.is_filled, Some(false));
    }
}
