//! Monte-Carlo simulation of best-of-n series.

use std::collections::BTreeMap;

use rand::Rng;

/// Final score of one simulated series.
pub type Score = (u32, u32);

/// Distribution of simulated series results.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeriesResults {
    /// Number of series ending with each score, team 1 first.
    pub scores: BTreeMap<Score, u64>,
}

impl SeriesResults {
    /// Number of simulated series.
    pub fn total(&self) -> u64 {
        self.scores.values().sum()
    }

    /// Share of series won by team 1.
    pub fn team_1_share(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let won: u64 = self
            .scores
            .iter()
            .filter(|((w1, w2), _)| w1 > w2)
            .map(|(_, n)| n)
            .sum();
        won as f64 / total as f64
    }
}

/// Simulate `n_series` series of `n_games` games, team 1 winning each game
/// with probability `p_game`.
///
/// All games are played out and each side's wins are capped at
/// `n_games / 2 + 1`, the number needed to take the series.
pub fn simulate_series<R: Rng + ?Sized>(
    p_game: f64,
    n_series: u64,
    n_games: u32,
    rng: &mut R,
) -> SeriesResults {
    let needed = n_games / 2 + 1;
    let mut results = SeriesResults::default();

    for _ in 0..n_series {
        let wins_1 = (0..n_games).filter(|_| rng.gen::<f64>() < p_game).count() as u32;
        let wins_2 = n_games - wins_1;
        *results
            .scores
            .entry((wins_1.min(needed), wins_2.min(needed)))
            .or_insert(0) += 1;
    }

    results
}
