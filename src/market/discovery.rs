//! Market discovery over dated snapshots of the whole market list.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument, warn};

use super::types::{Market, MarketKind};
use crate::error::MarketError;
use crate::utils::filter_question;

const SNAPSHOT_PREFIX: &str = "markets_";
const SNAPSHOT_SUFFIX: &str = ".json";

/// Snapshots kept besides the oldest one.
const KEEP_RECENT: usize = 3;

/// How long a market must be untouched to count as old.
pub const OLD_MARKET_AGE: Duration = Duration::days(93);

/// Criteria for picking markets out of a snapshot.
#[derive(Debug, Clone, Default)]
pub struct MarketFilter {
    /// Only YES/NO markets.
    pub binary_only: bool,
    /// Comma-separated terms that must all appear in the question
    /// (or, with a leading `-`, none of them).
    pub question: Option<String>,
    /// Comma-separated terms none of which may appear in the question.
    pub neg_question: Option<String>,
    /// Substring of the creator's username or display name.
    pub creator: Option<String>,
    /// Creators to leave out.
    pub neg_creator: Option<String>,
    /// Market ids to leave out (e.g. those already in the registry).
    pub exclude_ids: HashSet<String>,
    /// Only markets not updated for [`OLD_MARKET_AGE`].
    pub old: bool,
}

fn creator_matches(market: &Market, creator: &str) -> bool {
    let creator = creator.to_lowercase();
    market.creator_username.to_lowercase().contains(&creator)
        || market.creator_name.to_lowercase().contains(&creator)
}

impl MarketFilter {
    /// Whether `market` passes every criterion at time `now`.
    pub fn matches(&self, market: &Market, now: OffsetDateTime) -> bool {
        if market.is_resolved || market.is_closed_at(now) {
            return false;
        }
        if self.binary_only && !matches!(market.kind, MarketKind::Binary { .. }) {
            return false;
        }
        if self.exclude_ids.contains(&market.id) {
            return false;
        }
        if self.old {
            let cutoff = now - OLD_MARKET_AGE;
            if !market.last_updated.is_some_and(|t| t < cutoff) {
                return false;
            }
        }
        if let Some(q) = self.question.as_deref().filter(|q| !q.is_empty()) {
            if !filter_question(&market.question, q) {
                return false;
            }
        }
        if let Some(q) = self.neg_question.as_deref().filter(|q| !q.is_empty()) {
            if !filter_question(&market.question, &format!("-{q}")) {
                return false;
            }
        }
        if let Some(c) = self.creator.as_deref().filter(|c| !c.is_empty()) {
            if !creator_matches(market, c) {
                return false;
            }
        }
        if let Some(c) = self.neg_creator.as_deref().filter(|c| !c.is_empty()) {
            if creator_matches(market, c) {
                return false;
            }
        }
        true
    }

    /// Markets passing the filter, in input order.
    pub fn apply<'a>(&self, markets: &'a [Market], now: OffsetDateTime) -> Vec<&'a Market> {
        markets.iter().filter(|m| self.matches(m, now)).collect()
    }
}

/// Directory of `markets_YYYY_MM_DD.json` files.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Snapshot directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name of the snapshot taken on `date`.
    pub fn file_name(date: NaiveDate) -> String {
        format!("{SNAPSHOT_PREFIX}{}{SNAPSHOT_SUFFIX}", date.format("%Y_%m_%d"))
    }

    /// Snapshot files, oldest first.
    pub fn list(&self) -> Result<Vec<PathBuf>, MarketError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(SNAPSHOT_SUFFIX))
            .collect();
        names.sort();
        Ok(names.into_iter().map(|name| self.dir.join(name)).collect())
    }

    /// Write `markets` as the snapshot of `date` and check that it reads
    /// back unchanged.
    #[instrument(skip(self, markets), fields(count = markets.len()))]
    pub fn save(&self, markets: &[Market], date: NaiveDate) -> Result<PathBuf, MarketError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(Self::file_name(date));

        let json = serde_json::to_vec(markets)
            .map_err(|e| MarketError::ParseError(format!("failed to encode snapshot: {e}")))?;
        fs::write(&path, json)?;

        let reloaded = Self::read(&path)?;
        if reloaded.as_slice() != markets {
            return Err(MarketError::ParseError(format!(
                "snapshot {} does not read back unchanged",
                path.display()
            )));
        }

        info!(path = %path.display(), "Saved market snapshot");
        Ok(path)
    }

    /// Keep the oldest snapshot and the three most recent ones.
    pub fn clean_up(&self) -> Result<Vec<PathBuf>, MarketError> {
        let files = self.list()?;
        if files.len() <= KEEP_RECENT + 1 {
            return Ok(Vec::new());
        }
        let removed: Vec<PathBuf> = files[1..files.len() - KEEP_RECENT].to_vec();
        for path in &removed {
            debug!(path = %path.display(), "Removing old snapshot");
            fs::remove_file(path)?;
        }
        Ok(removed)
    }

    /// Markets from the most recent snapshot.
    pub fn latest(&self) -> Result<Vec<Market>, MarketError> {
        let path = self
            .list()?
            .pop()
            .ok_or_else(|| MarketError::NoSnapshot(self.dir.display().to_string()))?;
        info!(path = %path.display(), "Using market snapshot");
        Self::read(&path)
    }

    fn read(path: &Path) -> Result<Vec<Market>, MarketError> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Unreadable snapshot");
            MarketError::ParseError(format!("failed to decode snapshot: {e}"))
        })
    }
}
