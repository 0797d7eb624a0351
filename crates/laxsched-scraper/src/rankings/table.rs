//! Generic poll-table parsing.
//!
//! Poll pages change markup often and carry decorative tables, so the table
//! is chosen by content (most rows with a positive integer rank) and columns
//! by header text, falling back to position when there are no headers.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use laxsched_core::rankings::TOP_N;
use laxsched_core::RankingEntry;

use crate::text::normalize_whitespace;

static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid selector"));
static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, th").expect("valid selector"));
static DATA_CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("valid selector"));

const MISSING: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Rank,
    Team,
    Record,
    Points,
    Change,
    Previous,
}

/// Map a header label to the column it names. `previous` and `change` are
/// checked before `rank` so "Previous Rank" is not read as the rank.
fn classify_header(label: &str) -> Option<Column> {
    let h = label.to_lowercase();
    let h = h.trim();
    if h.is_empty() {
        None
    } else if h.contains("prev") || h.contains("last week") {
        Some(Column::Previous)
    } else if h == "+/-" || h.contains("change") || h.contains("delta") || h == "chg" {
        Some(Column::Change)
    } else if h.contains("rank") || h == "rk" || h == "#" {
        Some(Column::Rank)
    } else if h.contains("team") || h.contains("school") || h.contains("institution") {
        Some(Column::Team)
    } else if h.contains("record") || h.contains("w-l") {
        Some(Column::Record)
    } else if h.contains("point") || h.contains("vote") || h == "pts" {
        Some(Column::Points)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    rank: usize,
    team: usize,
    record: Option<usize>,
    points: Option<usize>,
    change: Option<usize>,
    previous: Option<usize>,
}

impl ColumnMap {
    /// Positional layout: rank, team, record, points, change.
    fn positional(width: usize) -> Self {
        Self {
            rank: 0,
            team: 1,
            record: (width > 2).then_some(2),
            points: if width > 3 { Some(3) } else { (width > 2).then_some(2) },
            change: (width > 4).then_some(4),
            previous: None,
        }
    }

    /// Header-driven layout. Requires at least a team column; the rank
    /// column defaults to the first.
    fn from_headers(headers: &[String]) -> Option<Self> {
        let mut found: [Option<usize>; 6] = [None; 6];
        for (i, label) in headers.iter().enumerate() {
            let Some(column) = classify_header(label) else {
                continue;
            };
            let slot = &mut found[column as usize];
            if slot.is_none() {
                *slot = Some(i);
            }
        }
        Some(Self {
            rank: found[Column::Rank as usize].unwrap_or(0),
            team: found[Column::Team as usize]?,
            record: found[Column::Record as usize],
            points: found[Column::Points as usize],
            change: found[Column::Change as usize],
            previous: found[Column::Previous as usize],
        })
    }
}

fn cell_texts(row: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    row.select(selector)
        .map(|cell| normalize_whitespace(&cell.text().collect::<String>()))
        .collect()
}

/// `"T-3"` → 3, `"1."` → 1. Zero and blanks are not ranks.
pub(crate) fn parse_rank(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse::<u32>().ok().filter(|r| *r > 0)
}

fn is_new_marker(text: &str) -> bool {
    let upper = text.trim().to_ascii_uppercase();
    upper == "NEW" || upper == "NR" || upper == "NEW!"
}

fn format_delta(delta: i64) -> String {
    if delta > 0 {
        format!("+{delta}")
    } else {
        delta.to_string()
    }
}

/// Explicit signed integer, tolerating arrows and a leading `+`.
fn parse_signed(text: &str) -> Option<i64> {
    let t = text.trim();
    let (sign, rest) = if let Some(rest) = t.strip_prefix('+').or_else(|| t.strip_prefix('▲')) {
        (1, rest)
    } else if let Some(rest) = t
        .strip_prefix('-')
        .or_else(|| t.strip_prefix('▼'))
        .or_else(|| t.strip_prefix('−'))
    {
        (-1, rest)
    } else {
        (1, t)
    };
    rest.trim().parse::<i64>().ok().map(|n| sign * n)
}

/// Movement since the previous poll: explicit value, new-entrant marker,
/// or derived from a previous-rank column; `"0"` otherwise.
pub(crate) fn derive_change(explicit: Option<&str>, previous: Option<&str>, rank: u32) -> String {
    if let Some(text) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        if is_new_marker(text) {
            return "NEW".to_owned();
        }
        if let Some(delta) = parse_signed(text) {
            return format_delta(delta);
        }
    }
    if let Some(text) = previous.map(str::trim).filter(|t| !t.is_empty()) {
        if is_new_marker(text) || text == MISSING || text == "-" {
            return "NEW".to_owned();
        }
        if let Some(prev) = parse_rank(text) {
            return format_delta(i64::from(prev) - i64::from(rank));
        }
    }
    "0".to_owned()
}

fn row_to_entry(cells: &[String], columns: &ColumnMap) -> Option<RankingEntry> {
    let get = |i: Option<usize>| i.and_then(|i| cells.get(i)).map(String::as_str);
    let rank = parse_rank(get(Some(columns.rank))?)?;
    let team = get(Some(columns.team)).filter(|t| !t.is_empty())?;
    let or_missing = |v: Option<&str>| match v {
        Some(v) if !v.is_empty() => v.to_owned(),
        _ => MISSING.to_owned(),
    };
    Some(RankingEntry {
        rank,
        team: team.to_owned(),
        record: or_missing(get(columns.record)),
        points_votes: or_missing(get(columns.points)),
        change: derive_change(get(columns.change), get(columns.previous), rank),
    })
}

struct ParsedTable {
    columns: ColumnMap,
    rows: Vec<Vec<String>>,
}

impl ParsedTable {
    fn from_element(table: ElementRef<'_>) -> Self {
        let mut headers: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<String>> = Vec::new();
        for row in table.select(&ROW_SEL) {
            if row.select(&DATA_CELL_SEL).next().is_none() {
                if headers.is_empty() {
                    headers = cell_texts(row, &CELL_SEL);
                }
                continue;
            }
            rows.push(cell_texts(row, &CELL_SEL));
        }
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let columns =
            ColumnMap::from_headers(&headers).unwrap_or_else(|| ColumnMap::positional(width));
        Self { columns, rows }
    }

    /// Rows whose rank cell holds a positive integer.
    fn score(&self) -> usize {
        self.rows
            .iter()
            .filter(|cells| {
                cells
                    .get(self.columns.rank)
                    .and_then(|c| parse_rank(c))
                    .is_some()
            })
            .count()
    }
}

/// Extract the top-25 poll from an HTML page. Empty when no table holds
/// rankable rows.
#[must_use]
pub fn parse_rankings_table(html: &str) -> Vec<RankingEntry> {
    let document = Html::parse_document(html);
    let mut best: Option<ParsedTable> = None;
    let mut best_score = 0;
    for table in document.select(&TABLE_SEL).map(ParsedTable::from_element) {
        let score = table.score();
        if score > best_score {
            best_score = score;
            best = Some(table);
        }
    }
    let Some(table) = best else {
        return Vec::new();
    };

    let entries = table
        .rows
        .iter()
        .filter_map(|cells| row_to_entry(cells, &table.columns))
        .collect();
    finalize(entries)
}

/// Deduplicate by rank keeping the first occurrence, sort ascending and
/// truncate to the top 25.
pub(crate) fn finalize(entries: Vec<RankingEntry>) -> Vec<RankingEntry> {
    let mut seen = HashSet::new();
    let mut unique: Vec<RankingEntry> = entries
        .into_iter()
        .filter(|e| seen.insert(e.rank))
        .collect();
    unique.sort_by_key(|e| e.rank);
    unique.truncate(TOP_N);
    unique
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
