//! Reading forecast values out of HTML tables.
//!
//! The pages are server-rendered tables where each row carries an
//! identifying attribute (`data-str="Arsenal"`, `data-team="BOS"`) and each
//! cell a machine-readable `data-val`.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::error::ForecastError;

static ROW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<tr\b([^>]*)>(.*?)</tr>").expect("valid regex"));
static CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<td\b([^>]*)>(.*?)</td>").expect("valid regex"));
static ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([\w:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

/// A table row: its attributes and cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Attributes of the `<tr>` tag.
    pub attrs: HashMap<String, String>,
    /// Cells in document order.
    pub cells: Vec<Cell>,
}

/// A table cell: its attributes and text content.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Attributes of the `<td>` tag.
    pub attrs: HashMap<String, String>,
    /// Text with tags removed and common entities decoded.
    pub text: String,
}

fn parse_attrs(raw: &str) -> HashMap<String, String> {
    ATTR_RE
        .captures_iter(raw)
        .map(|c| {
            let value = c.get(2).or_else(|| c.get(3)).map_or("", |m| m.as_str());
            (c[1].to_lowercase(), decode_entities(value))
        })
        .collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&mdash;", "—")
        .replace("&#8212;", "—")
        .replace("&#10003;", "✓")
        .replace("&#37;", "%")
        .replace("&amp;", "&")
}

/// Every `<tr>` of the document.
pub fn parse_rows(html: &str) -> Vec<Row> {
    ROW_RE
        .captures_iter(html)
        .map(|row| Row {
            attrs: parse_attrs(&row[1]),
            cells: CELL_RE
                .captures_iter(&row[2])
                .map(|cell| Cell {
                    attrs: parse_attrs(&cell[1]),
                    text: decode_entities(TAG_RE.replace_all(&cell[2], "").trim()),
                })
                .collect(),
        })
        .collect()
}

fn attr_matches(attrs: &HashMap<String, String>, name: &str, wanted: &str) -> bool {
    match attrs.get(name) {
        Some(value) if name == "class" && !wanted.contains(char::is_whitespace) => {
            value.split_whitespace().any(|class| class == wanted)
        }
        Some(value) => value.trim() == wanted,
        None => false,
    }
}

/// Row whose `attr` equals `value`. Rows without a `class` attribute win
/// over styled duplicates (e.g. live-game rows).
pub fn find_row<'a>(rows: &'a [Row], attr: &str, value: &str) -> Result<&'a Row, ForecastError> {
    let mut candidates = rows.iter().filter(|r| attr_matches(&r.attrs, attr, value));
    let first = candidates
        .next()
        .ok_or_else(|| ForecastError::Missing(format!("row {attr}={value:?}")))?;
    if !first.attrs.contains_key("class") {
        return Ok(first);
    }
    Ok(candidates
        .find(|r| !r.attrs.contains_key("class"))
        .unwrap_or(first))
}

/// The `nth` cell of `row` whose `attr` matches `value`; negative `nth`
/// counts from the end.
pub fn find_cell<'a>(row: &'a Row, attr: &str, value: &str, nth: i64) -> Result<&'a Cell, ForecastError> {
    let cells: Vec<&Cell> = row
        .cells
        .iter()
        .filter(|c| attr_matches(&c.attrs, attr, value))
        .collect();
    let index = if nth < 0 {
        cells.len() as i64 + nth
    } else {
        nth
    };
    usize::try_from(index)
        .ok()
        .and_then(|i| cells.get(i).copied())
        .ok_or_else(|| ForecastError::Missing(format!("cell {attr}={value:?} #{nth}")))
}

/// Decimal from plain or scientific notation.
pub fn parse_decimal(raw: &str) -> Result<Decimal, ForecastError> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| ForecastError::Parse(raw.to_string()))
}

/// Probability shown in a cell.
///
/// `✓` or `>…` reads as certain, `—` or `<…` as impossible. Otherwise the
/// `data-val` attribute is used, multiplied by `scale`; a `null` data value
/// falls back to the percentage text.
pub fn cell_probability(cell: &Cell, scale: Decimal) -> Result<Decimal, ForecastError> {
    let text = cell.text.trim();
    if text == "✓" || text.starts_with('>') {
        return Ok(Decimal::ONE);
    }
    if text == "—" || text.starts_with('<') {
        return Ok(Decimal::ZERO);
    }

    match cell.attrs.get("data-val").map(|v| v.trim()) {
        Some("null") | None => {
            let percent = parse_decimal(text.trim_end_matches('%'))?;
            Ok(percent / Decimal::ONE_HUNDRED)
        }
        Some(value) => Ok(parse_decimal(value)? * scale),
    }
}

/// Finishing-position distribution from a `data-dist="1:0.3 2:0.2"` cell.
pub fn position_distribution(row: &Row) -> Result<BTreeMap<u32, Decimal>, ForecastError> {
    let raw = row
        .cells
        .iter()
        .find_map(|c| c.attrs.get("data-dist"))
        .ok_or_else(|| ForecastError::Missing("position distribution".to_string()))?;

    raw.split_whitespace()
        .map(|pair| {
            let (position, p) = pair
                .split_once(':')
                .ok_or_else(|| ForecastError::Parse(pair.to_string()))?;
            let position = position
                .parse::<u32>()
                .map_err(|_| ForecastError::Parse(pair.to_string()))?;
            Ok((position, parse_decimal(p)?))
        })
        .collect()
}

/// Probability that a team with distribution `hi` finishes above (lower
/// position number than) a team with distribution `lo`, ignoring ties.
pub fn finishes_higher(
    hi: &BTreeMap<u32, Decimal>,
    lo: &BTreeMap<u32, Decimal>,
) -> Result<Decimal, ForecastError> {
    let mut higher = Decimal::ZERO;
    let mut lower = Decimal::ZERO;
    for (pos_hi, p_hi) in hi {
        for (pos_lo, p_lo) in lo {
            if pos_hi < pos_lo {
                higher += *p_hi * *p_lo;
            } else if pos_lo < pos_hi {
                lower += *p_hi * *p_lo;
            }
        }
    }
    let total = higher + lower;
    if total <= Decimal::ZERO {
        return Err(ForecastError::Parse("position distributions never differ".to_string()));
    }
    Ok(higher / total)
}
