//! Registry of tracked markets.
//!
//! A JSON object keyed by market id. Each entry may carry a forecast
//! definition (for value betting) and a group name (for arbitrage and group
//! positions). Markets in group `"g"` resolve the same way; markets in
//! `"!g"` resolve the opposite way.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RegistryError;
use crate::forecast::ForecastSpec;
use crate::market::{Market, ResolvedMarkets};

fn default_bet_p() -> Decimal {
    Decimal::ONE
}

fn is_default_bet_p(p: &Decimal) -> bool {
    *p == Decimal::ONE
}

/// One tracked market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Question text, for humans editing the file.
    pub question: String,
    /// Where the believed probability comes from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<ForecastSpec>,
    /// Chance the market is looked at in a given round.
    #[serde(default = "default_bet_p", skip_serializing_if = "is_default_bet_p")]
    pub bet_p: Decimal,
    /// Group name, `!`-prefixed for the complementary side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RegistryEntry {
    /// Entry for a market without forecast or group.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            forecast: None,
            bet_p: Decimal::ONE,
            group: None,
            notes: None,
        }
    }

    /// Group name without the `!` marker, and whether the marker was set.
    pub fn base_group(&self) -> Option<(&str, bool)> {
        self.group.as_deref().map(|g| match g.strip_prefix('!') {
            Some(base) => (base, true),
            None => (g, false),
        })
    }
}

/// Draw `r` uniformly from `[0, 1)` and pass when `r <= p`.
pub fn sample_gate<R: Rng + ?Sized>(rng: &mut R, p: Decimal) -> bool {
    Decimal::from_f64(rng.gen::<f64>()).is_some_and(|r| r <= p)
}

/// Two registry markets betting on the same event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketPair {
    /// Group name, with `(combo i)` appended for groups of more than two.
    pub name: String,
    /// Market ids in registry order.
    pub markets: (String, String),
    /// Whether the second market resolves opposite to the first.
    pub is_complementary: bool,
}

/// All tracked markets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl Registry {
    /// Read a registry file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let registry = Self::from_json(&text)?;
        debug!(path = %path.display(), markets = registry.len(), "Loaded registry");
        Ok(registry)
    }

    /// Parse a registry document.
    pub fn from_json(text: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, id: impl Into<String>, entry: RegistryEntry) {
        self.entries.insert(id.into(), entry);
    }

    /// Entry for `id`.
    pub fn get(&self, id: &str) -> Result<&RegistryEntry, RegistryError> {
        self.entries
            .get(id)
            .ok_or_else(|| RegistryError::UnknownMarket(id.to_string()))
    }

    /// Whether `id` is tracked.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of tracked markets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tracked market ids.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Markets with a forecast definition.
    pub fn forecasts(&self) -> impl Iterator<Item = (&str, &RegistryEntry, &ForecastSpec)> {
        self.entries
            .iter()
            .filter_map(|(id, e)| e.forecast.as_ref().map(|f| (id.as_str(), e, f)))
    }

    /// Markets resolving like `id` (including `id`) and markets resolving
    /// the opposite way. Ungrouped markets are alone in their group.
    pub fn group_members(&self, id: &str) -> Result<(Vec<String>, Vec<String>), RegistryError> {
        let entry = self.get(id)?;
        let Some(group) = entry.group.as_deref() else {
            return Ok((vec![id.to_string()], Vec::new()));
        };
        let opposite = match group.strip_prefix('!') {
            Some(base) => base.to_string(),
            None => format!("!{group}"),
        };

        let members = |name: &str| {
            self.entries
                .iter()
                .filter(|(_, e)| e.group.as_deref() == Some(name))
                .map(|(id, _)| id.clone())
                .collect::<Vec<_>>()
        };
        Ok((members(group), members(&opposite)))
    }

    /// Every two-market combination of each group.
    ///
    /// Resolved markets are left out. One random draw per group is compared
    /// with each member's `bet_p`, so low-`bet_p` members drop out of the
    /// round together.
    pub fn pairs<R: Rng + ?Sized>(&self, resolved: &ResolvedMarkets, rng: &mut R) -> Vec<MarketPair> {
        let groups: BTreeSet<&str> = self
            .entries
            .values()
            .filter_map(|e| e.base_group().map(|(g, _)| g))
            .collect();

        let mut pairs = Vec::new();
        for group in groups {
            let r = Decimal::from_f64(rng.gen::<f64>()).unwrap_or(Decimal::ZERO);
            let members: Vec<(&str, bool)> = self
                .entries
                .iter()
                .filter(|(id, e)| !resolved.contains(id) && r <= e.bet_p)
                .filter_map(|(id, e)| match e.base_group() {
                    Some((g, negated)) if g == group => Some((id.as_str(), negated)),
                    _ => None,
                })
                .collect();

            let mut combos = Vec::new();
            for (i, a) in members.iter().enumerate() {
                for b in &members[i + 1..] {
                    combos.push((*a, *b));
                }
            }

            if combos.len() == 1 {
                let ((id_1, neg_1), (id_2, neg_2)) = combos[0];
                pairs.push(MarketPair {
                    name: group.to_string(),
                    markets: (id_1.to_string(), id_2.to_string()),
                    is_complementary: neg_1 != neg_2,
                });
                continue;
            }

            combos.shuffle(rng);
            for (i, ((id_1, neg_1), (id_2, neg_2))) in combos.into_iter().enumerate() {
                pairs.push(MarketPair {
                    name: format!("{group} (combo {})", i + 1),
                    markets: (id_1.to_string(), id_2.to_string()),
                    is_complementary: neg_1 != neg_2,
                });
            }
        }
        pairs
    }
}

/// Registry stub for a newly found market, ready to be filled in.
pub fn registry_stub(market: &Market) -> (String, RegistryEntry) {
    let mut entry = RegistryEntry::new(market.question.clone());
    entry.notes = Some(format!("{} by @{}", market.kind_name(), market.creator_username));
    (market.id.clone(), entry)
}
