//! Forecast values from downloaded CSV tables.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::scrape::parse_decimal;
use crate::error::ForecastError;

/// Date format of forecast tables.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Keep only rows where `column` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFilter {
    /// Column name.
    pub column: String,
    /// Required value.
    pub value: String,
}

/// How to read a value out of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery<'a> {
    /// Column identifying rows.
    pub key_column: &'a str,
    /// Column holding the probability.
    pub value_column: &'a str,
    /// Row keys whose values are summed.
    pub keys: &'a [String],
    /// Optional row filter.
    pub filter: Option<&'a ColumnFilter>,
    /// Column with the forecast date; only the latest date is used.
    pub date_column: Option<&'a str>,
}

/// A parsed CSV table.
#[derive(Debug, Clone)]
pub struct Table {
    headers: csv::StringRecord,
    rows: Vec<csv::StringRecord>,
}

impl Table {
    /// Parse a CSV document with a header line.
    pub fn parse(text: &str) -> Result<Self, ForecastError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        let headers = reader.headers()?.clone();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column(&self, name: &str) -> Result<usize, ForecastError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ForecastError::Missing(format!("column {name:?}")))
    }

    /// Sum of `value_column` over the rows matching `keys`.
    pub fn lookup(&self, query: &TableQuery<'_>) -> Result<Decimal, ForecastError> {
        let key_idx = self.column(query.key_column)?;
        let value_idx = self.column(query.value_column)?;

        let mut rows: Vec<&csv::StringRecord> = match query.filter {
            Some(filter) => {
                let idx = self.column(&filter.column)?;
                self.rows
                    .iter()
                    .filter(|r| r.get(idx) == Some(filter.value.as_str()))
                    .collect()
            }
            None => self.rows.iter().collect(),
        };

        if let Some(date_column) = query.date_column {
            let idx = self.column(date_column)?;
            let dated = rows
                .iter()
                .map(|r| {
                    let raw = r.get(idx).unwrap_or_default();
                    NaiveDate::parse_from_str(raw, DATE_FORMAT)
                        .map(|d| (d, *r))
                        .map_err(|_| ForecastError::Parse(format!("date {raw:?}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(latest) = dated.iter().map(|(d, _)| *d).max() {
                debug!(%latest, "Using latest forecast date");
                rows = dated
                    .into_iter()
                    .filter(|(d, _)| *d == latest)
                    .map(|(_, r)| r)
                    .collect();
            }
        }

        query.keys.iter().try_fold(Decimal::ZERO, |total, key| {
            let row = rows
                .iter()
                .find(|r| r.get(key_idx) == Some(key.as_str()))
                .ok_or_else(|| ForecastError::Missing(format!("row {key:?}")))?;
            let raw = row.get(value_idx).unwrap_or_default();
            Ok(total + parse_decimal(raw)?)
        })
    }
}
