//! Market-related types for Manifold prediction markets.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

use crate::error::MarketError;

/// Side of a binary market.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
pub enum Outcome {
    /// Probability goes up (YES shares).
    #[serde(rename = "YES", alias = "UP")]
    #[strum(to_string = "YES", serialize = "yes", serialize = "UP", serialize = "up")]
    #[default]
    Up,
    /// Probability goes down (NO shares).
    #[serde(rename = "NO", alias = "DOWN")]
    #[strum(to_string = "NO", serialize = "no", serialize = "DOWN", serialize = "down")]
    Down,
}

impl Outcome {
    /// Get the opposite outcome.
    pub fn opposite(&self) -> Self {
        match self {
            Outcome::Up => Outcome::Down,
            Outcome::Down => Outcome::Up,
        }
    }
}

/// One answer of a multi-outcome market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Answer id as accepted by the bet endpoint.
    pub id: String,
    /// Answer text.
    pub text: String,
    /// Current probability of this answer.
    pub probability: Decimal,
}

/// The closed set of market kinds the tools know how to bet on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketKind {
    /// YES/NO market.
    Binary {
        /// Current probability of YES.
        probability: Decimal,
    },
    /// Numeric market traded as a YES/NO probability.
    PseudoNumeric {
        /// Current probability of YES ("higher").
        probability: Decimal,
    },
    /// Open-ended answers added by users.
    FreeResponse {
        /// Answers with their probabilities.
        answers: Vec<Answer>,
    },
    /// Fixed answer list.
    MultipleChoice {
        /// Answers with their probabilities.
        answers: Vec<Answer>,
    },
}

/// Market information as used by the betting drivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    /// Unique market identifier.
    pub id: String,
    /// Market question text.
    pub question: String,
    /// Kind-specific odds.
    pub kind: MarketKind,
    /// Whether the market has resolved.
    pub is_resolved: bool,
    /// When trading closes.
    #[serde(with = "time::serde::rfc3339::option")]
    pub close_time: Option<OffsetDateTime>,
    /// Last time the market changed.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_updated: Option<OffsetDateTime>,
    /// Creator handle.
    pub creator_username: String,
    /// Creator display name.
    pub creator_name: String,
}

impl Market {
    /// Probability of YES for binary-like markets.
    pub fn probability(&self) -> Option<Decimal> {
        match &self.kind {
            MarketKind::Binary { probability } | MarketKind::PseudoNumeric { probability } => {
                Some(*probability)
            }
            MarketKind::FreeResponse { .. } | MarketKind::MultipleChoice { .. } => None,
        }
    }

    /// Probability of a YES/NO market, or an error for other kinds.
    pub fn binary_probability(&self) -> Result<Decimal, MarketError> {
        match &self.kind {
            MarketKind::Binary { probability } => Ok(*probability),
            _ => Err(MarketError::ParseError(format!(
                "market {} is not a binary market",
                self.id
            ))),
        }
    }

    /// Check if the market closed before `now`.
    pub fn is_closed_at(&self, now: OffsetDateTime) -> bool {
        self.close_time.is_some_and(|close| close < now)
    }

    /// Resolved, or past its close time.
    pub fn is_finished(&self) -> bool {
        self.is_resolved || self.is_closed_at(OffsetDateTime::now_utc())
    }

    /// Short name of the market kind for log lines.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            MarketKind::Binary { .. } => "binary",
            MarketKind::PseudoNumeric { .. } => "pseudo-numeric",
            MarketKind::FreeResponse { .. } => "free-response",
            MarketKind::MultipleChoice { .. } => "multiple-choice",
        }
    }
}

/// A bet as returned by the bets endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    /// Bet id.
    pub id: String,
    /// Shares bought (negative when sold).
    pub shares: Decimal,
    /// Outcome the shares belong to.
    pub outcome: String,
    /// Creation time in milliseconds.
    #[serde(default)]
    pub created_time: i64,
}

/// User record from the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
    /// User id.
    pub id: String,
    /// Username.
    pub username: String,
    /// Play-money balance.
    pub balance: Decimal,
}

/// Answer record from the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiAnswer {
    /// Answer id (current API).
    pub id: Option<String>,
    /// Answer number (older API).
    pub number: Option<i64>,
    /// Answer text.
    #[serde(default)]
    pub text: String,
    /// Answer probability.
    pub probability: Option<Decimal>,
}

/// Market record from the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMarket {
    /// Market id.
    pub id: String,
    /// Market question.
    #[serde(default)]
    pub question: String,
    /// Outcome type, e.g. "BINARY".
    pub outcome_type: String,
    /// Probability for binary-like markets.
    pub probability: Option<Decimal>,
    /// Resolution flag.
    #[serde(default)]
    pub is_resolved: bool,
    /// Close time in milliseconds.
    pub close_time: Option<i64>,
    /// Last update time in milliseconds.
    pub last_updated_time: Option<i64>,
    /// Creator handle.
    #[serde(default)]
    pub creator_username: String,
    /// Creator display name.
    #[serde(default)]
    pub creator_name: String,
    /// Answers for multi-outcome markets (full market endpoint only).
    #[serde(default)]
    pub answers: Vec<ApiAnswer>,
}

fn from_millis(ms: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000).ok()
}

fn convert_answers(answers: Vec<ApiAnswer>) -> Vec<Answer> {
    answers
        .into_iter()
        .filter_map(|a| {
            let id = a.id.or_else(|| a.number.map(|n| n.to_string()))?;
            Some(Answer {
                id,
                text: a.text,
                probability: a.probability.unwrap_or(Decimal::ZERO),
            })
        })
        .collect()
}

impl TryFrom<ApiMarket> for Market {
    type Error = MarketError;

    fn try_from(api: ApiMarket) -> Result<Self, Self::Error> {
        let missing_probability =
            || MarketError::ParseError(format!("market {} has no probability", api.id));

        let kind = match api.outcome_type.as_str() {
            "BINARY" => MarketKind::Binary {
                probability: api.probability.ok_or_else(missing_probability)?,
            },
            "PSEUDO_NUMERIC" => MarketKind::PseudoNumeric {
                probability: api.probability.ok_or_else(missing_probability)?,
            },
            "FREE_RESPONSE" => MarketKind::FreeResponse {
                answers: convert_answers(api.answers),
            },
            "MULTIPLE_CHOICE" => MarketKind::MultipleChoice {
                answers: convert_answers(api.answers),
            },
            other => {
                return Err(MarketError::ParseError(format!(
                    "unsupported outcome type {other} for market {}",
                    api.id
                )))
            }
        };

        Ok(Market {
            id: api.id,
            question: api.question,
            kind,
            is_resolved: api.is_resolved,
            close_time: api.close_time.and_then(from_millis),
            last_updated: api.last_updated_time.and_then(from_millis),
            creator_username: api.creator_username,
            creator_name: api.creator_name,
        })
    }
}
