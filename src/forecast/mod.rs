//! "True probability" providers.
//!
//! A registry market carries a [`ForecastSpec`] describing where its
//! probability comes from: a fixed number, a CSV forecast table, a scraped
//! HTML table cell, or a combination of independent events. The
//! [`ForecastEngine`] evaluates specs against a [`PageFetcher`].

pub mod fetch;
pub mod scrape;
pub mod series;
pub mod table;

use futures::future::{FutureExt, LocalBoxFuture};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::ForecastError;

pub use fetch::{HttpFetcher, PageFetcher, StaticFetcher};
pub use series::{simulate_series, SeriesResults};
pub use table::{ColumnFilter, Table, TableQuery};

fn default_cell_attr() -> String {
    "class".to_string()
}

fn default_team_attr() -> String {
    "data-str".to_string()
}

/// Where a market's believed probability comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastSpec {
    /// A constant.
    Fixed {
        /// The probability.
        probability: Decimal,
    },
    /// Sum of a column over some rows of a CSV table.
    Table {
        /// CSV download URL.
        url: String,
        /// Column identifying rows.
        key_column: String,
        /// Column holding probabilities.
        value_column: String,
        /// Rows to sum.
        keys: Vec<String>,
        /// Optional equality filter.
        #[serde(default)]
        filter: Option<ColumnFilter>,
        /// Date column; only the latest date is used.
        #[serde(default)]
        date_column: Option<String>,
    },
    /// One cell of an HTML table.
    Cell {
        /// Page URL.
        url: String,
        /// Attribute identifying the row, e.g. `data-team`.
        row_attr: String,
        /// Value of that attribute.
        row: String,
        /// Attribute identifying the cell.
        #[serde(default = "default_cell_attr")]
        cell_attr: String,
        /// Value of that attribute.
        cell: String,
        /// Which of the matching cells; negative counts from the end.
        #[serde(default)]
        nth: i64,
        /// Factor applied to `data-val`.
        #[serde(default)]
        scale: Option<Decimal>,
    },
    /// Chance a team finishes in one of `positions`.
    Positions {
        /// League table URL.
        url: String,
        /// Team name.
        team: String,
        /// Finishing positions (1 = top).
        positions: Vec<u32>,
        /// Attribute identifying team rows.
        #[serde(default = "default_team_attr")]
        row_attr: String,
    },
    /// Chance `team_hi` finishes above `team_lo`.
    Higher {
        /// League table URL.
        url: String,
        /// Team expected higher.
        team_hi: String,
        /// Team expected lower.
        team_lo: String,
        /// Attribute identifying team rows.
        #[serde(default = "default_team_attr")]
        row_attr: String,
    },
    /// Complement of an event.
    Not {
        /// The event.
        of: Box<ForecastSpec>,
    },
    /// All independent events happen.
    All {
        /// The events.
        of: Vec<ForecastSpec>,
    },
    /// Sum of mutually exclusive events.
    Sum {
        /// The events.
        of: Vec<ForecastSpec>,
    },
    /// Exactly `k` independent events happen.
    Exactly {
        /// Number of events.
        k: usize,
        /// The events.
        of: Vec<ForecastSpec>,
    },
    /// At least `k` independent events happen.
    AtLeast {
        /// Number of events.
        k: usize,
        /// The events.
        of: Vec<ForecastSpec>,
    },
}

/// Reject values outside `[0, 1]`.
pub fn validate_probability(p: Decimal) -> Result<Decimal, ForecastError> {
    if p < Decimal::ZERO || p > Decimal::ONE {
        return Err(ForecastError::OutOfRange(p));
    }
    Ok(p)
}

/// Distribution of the number of independent events that happen:
/// element `j` is the chance that exactly `j` of them do.
pub fn count_distribution(probabilities: &[Decimal]) -> Vec<Decimal> {
    let mut dist = vec![Decimal::ONE];
    for &p in probabilities {
        let mut next = vec![Decimal::ZERO; dist.len() + 1];
        for (j, &q) in dist.iter().enumerate() {
            next[j] += q * (Decimal::ONE - p);
            next[j + 1] += q * p;
        }
        dist = next;
    }
    dist
}

/// Evaluates [`ForecastSpec`]s.
#[derive(Debug)]
pub struct ForecastEngine<F> {
    fetcher: F,
}

impl<F: PageFetcher> ForecastEngine<F> {
    /// Engine reading documents through `fetcher`.
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// The document source.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Probability described by `spec`, validated into `[0, 1]`.
    #[instrument(skip(self, spec))]
    pub async fn evaluate(&self, spec: &ForecastSpec) -> Result<Decimal, ForecastError> {
        let p = self.eval(spec).await?;
        debug!(probability = %p, "Evaluated forecast");
        validate_probability(p)
    }

    async fn rows(&self, url: &str) -> Result<Vec<scrape::Row>, ForecastError> {
        let html = self.fetcher.fetch_text(url).await?;
        Ok(scrape::parse_rows(&html))
    }

    async fn distribution(
        &self,
        url: &str,
        row_attr: &str,
        team: &str,
    ) -> Result<std::collections::BTreeMap<u32, Decimal>, ForecastError> {
        let rows = self.rows(url).await?;
        let row = scrape::find_row(&rows, row_attr, team)?;
        scrape::position_distribution(row)
    }

    async fn eval_all(&self, specs: &[ForecastSpec]) -> Result<Vec<Decimal>, ForecastError> {
        let mut values = Vec::with_capacity(specs.len());
        for spec in specs {
            values.push(validate_probability(self.eval(spec).await?)?);
        }
        Ok(values)
    }

    fn eval<'a>(&'a self, spec: &'a ForecastSpec) -> LocalBoxFuture<'a, Result<Decimal, ForecastError>> {
        async move {
            match spec {
                ForecastSpec::Fixed { probability } => Ok(*probability),
                ForecastSpec::Table {
                    url,
                    key_column,
                    value_column,
                    keys,
                    filter,
                    date_column,
                } => {
                    let text = self.fetcher.fetch_text(url).await?;
                    let table = Table::parse(&text)?;
                    table.lookup(&TableQuery {
                        key_column,
                        value_column,
                        keys,
                        filter: filter.as_ref(),
                        date_column: date_column.as_deref(),
                    })
                }
                ForecastSpec::Cell {
                    url,
                    row_attr,
                    row,
                    cell_attr,
                    cell,
                    nth,
                    scale,
                } => {
                    let rows = self.rows(url).await?;
                    let found = scrape::find_row(&rows, row_attr, row)?;
                    let found = scrape::find_cell(found, cell_attr, cell, *nth)?;
                    scrape::cell_probability(found, scale.unwrap_or(Decimal::ONE))
                }
                ForecastSpec::Positions {
                    url,
                    team,
                    positions,
                    row_attr,
                } => {
                    let dist = self.distribution(url, row_attr, team).await?;
                    Ok(positions
                        .iter()
                        .filter_map(|p| dist.get(p))
                        .copied()
                        .sum())
                }
                ForecastSpec::Higher {
                    url,
                    team_hi,
                    team_lo,
                    row_attr,
                } => {
                    let hi = self.distribution(url, row_attr, team_hi).await?;
                    let lo = self.distribution(url, row_attr, team_lo).await?;
                    scrape::finishes_higher(&hi, &lo)
                }
                ForecastSpec::Not { of } => {
                    let p = validate_probability(self.eval(of).await?)?;
                    Ok(Decimal::ONE - p)
                }
                ForecastSpec::All { of } => {
                    Ok(self.eval_all(of).await?.into_iter().product())
                }
                ForecastSpec::Sum { of } => Ok(self.eval_all(of).await?.into_iter().sum()),
                ForecastSpec::Exactly { k, of } => {
                    let dist = count_distribution(&self.eval_all(of).await?);
                    Ok(dist.get(*k).copied().unwrap_or(Decimal::ZERO))
                }
                ForecastSpec::AtLeast { k, of } => {
                    let dist = count_distribution(&self.eval_all(of).await?);
                    Ok(dist.iter().skip(*k).copied().sum())
                }
            }
        }
        .boxed_local()
    }
}
