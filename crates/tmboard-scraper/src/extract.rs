//! Walks leaderboard table rows into typed records.
//!
//! Every data row is parsed on its own into a `Result`; [`MalformedRowPolicy`]
//! decides whether a short row fails the batch or is dropped. All other row
//! errors fail the batch, so a snapshot is never built from partially
//! understood markup.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use tmboard_core::{BoardTable, LeaderboardRow, MalformedRowPolicy, MapRow, Snapshot};

use crate::error::{ExtractError, TranscodeError};
use crate::richtext::{replace_nbsp, FormattedName};
use crate::transcode::{name_link, parse_runs};

/// Rows of a table nested inside a cell are dropped whatever the selector.
pub const DEFAULT_ROW_SELECTOR: &str = "table tr";

const KARMA_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

/// How rows are located and how short rows are treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// CSS selector matching the `<tr>` elements to walk.
    pub row_selector: String,
    pub malformed_rows: MalformedRowPolicy,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            row_selector: DEFAULT_ROW_SELECTOR.to_string(),
            malformed_rows: MalformedRowPolicy::Abort,
        }
    }
}

impl ExtractOptions {
    #[must_use]
    pub fn with_policy(malformed_rows: MalformedRowPolicy) -> Self {
        Self {
            malformed_rows,
            ..Self::default()
        }
    }
}

/// Typed rows of one table, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRows {
    Results(Vec<LeaderboardRow>),
    Maps(Vec<MapRow>),
}

impl TableRows {
    #[must_use]
    pub fn table(&self) -> BoardTable {
        match self {
            TableRows::Results(_) => BoardTable::Results,
            TableRows::Maps(_) => BoardTable::Maps,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            TableRows::Results(rows) => rows.len(),
            TableRows::Maps(rows) => rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wraps the rows into a cache snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if a row cannot be serialized.
    pub fn to_snapshot(
        &self,
        taken_at: DateTime<Utc>,
        min_refresh_period: u64,
    ) -> Result<Snapshot, serde_json::Error> {
        match self {
            TableRows::Results(rows) => Snapshot::new(rows, taken_at, min_refresh_period),
            TableRows::Maps(rows) => Snapshot::new(rows, taken_at, min_refresh_period),
        }
    }
}

/// Parses a full page and extracts the rows of `table`.
///
/// # Errors
///
/// See [`extract_results`] and [`extract_maps`].
pub fn extract_table(
    table: BoardTable,
    body: &str,
    options: &ExtractOptions,
) -> Result<TableRows, ExtractError> {
    let html = Html::parse_document(body);
    match table {
        BoardTable::Results => extract_results(&html, options).map(TableRows::Results),
        BoardTable::Maps => extract_maps(&html, options).map(TableRows::Maps),
    }
}

/// Extracts results rows: rank, name, finishes, average, average of finished.
///
/// # Errors
///
/// - [`ExtractError::MalformedRow`] for a row with fewer than 3 cells (under
///   [`MalformedRowPolicy::Abort`]).
/// - [`ExtractError::InvalidNumber`] for a non-numeric rank, finishes or
///   average, including `NaN` and infinities.
/// - [`ExtractError::Transcode`] when the name cell cannot be transcoded.
/// - [`ExtractError::InvalidSelector`] when the row selector does not parse.
pub fn extract_results(
    html: &Html,
    options: &ExtractOptions,
) -> Result<Vec<LeaderboardRow>, ExtractError> {
    collect_rows(html, BoardTable::Results, options, results_row)
}

/// Extracts maps rows: map, author, record time, record holder, finishes, karma.
///
/// # Errors
///
/// - [`ExtractError::MalformedRow`] for a row with fewer than 6 cells (under
///   [`MalformedRowPolicy::Abort`]).
/// - [`ExtractError::MissingMapUid`] when no `uid=` link follows the map name.
/// - [`ExtractError::InvalidNumber`] for non-numeric finishes, or karma that
///   is not a finite number from 0 to 100.
/// - [`ExtractError::Transcode`] when a name cell cannot be transcoded.
/// - [`ExtractError::InvalidSelector`] when the row selector does not parse.
pub fn extract_maps(html: &Html, options: &ExtractOptions) -> Result<Vec<MapRow>, ExtractError> {
    collect_rows(html, BoardTable::Maps, options, maps_row)
}

fn collect_rows<T>(
    html: &Html,
    table: BoardTable,
    options: &ExtractOptions,
    parse_row: fn(usize, &[ElementRef<'_>]) -> Result<T, ExtractError>,
) -> Result<Vec<T>, ExtractError> {
    let selector =
        Selector::parse(&options.row_selector).map_err(|e| ExtractError::InvalidSelector {
            selector: options.row_selector.clone(),
            reason: e.to_string(),
        })?;

    let mut rows = Vec::new();
    let rows_in_order = html.select(&selector).filter(|tr| !is_nested_row(*tr));
    for (index, tr) in rows_in_order.enumerate() {
        let cells = data_cells(tr);
        // Header rows are made of <th> only.
        if cells.is_empty() {
            continue;
        }

        let parsed =
            check_cell_count(table, index, &cells).and_then(|()| parse_row(index, &cells));
        match parsed {
            Ok(row) => rows.push(row),
            Err(ExtractError::MalformedRow {
                cells: found,
                expected,
                ..
            }) if options.malformed_rows == MalformedRowPolicy::Skip => {
                tracing::warn!(
                    %table,
                    row = index,
                    cells = found,
                    expected,
                    "skipping malformed row"
                );
            }
            Err(e) => return Err(e),
        }
    }

    Ok(rows)
}

/// A `<tr>` that belongs to a table laid out inside another table's cell.
fn is_nested_row(tr: ElementRef<'_>) -> bool {
    tr.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|el| matches!(el.value().name(), "td" | "th"))
}

fn data_cells(tr: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    tr.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .collect()
}

fn check_cell_count(
    table: BoardTable,
    row: usize,
    cells: &[ElementRef<'_>],
) -> Result<(), ExtractError> {
    let expected = table.min_cells();
    if cells.len() < expected {
        return Err(ExtractError::MalformedRow {
            table,
            row,
            cells: cells.len(),
            expected,
        });
    }
    Ok(())
}

fn results_row(row: usize, cells: &[ElementRef<'_>]) -> Result<LeaderboardRow, ExtractError> {
    let table = BoardTable::Results;
    let name = styled_name(table, row, 1, cells)?;
    Ok(LeaderboardRow {
        rank: number(table, row, 0, cells)?,
        nickname: name.plain_text(),
        name_formatted: name.to_markup(),
        finishes: number(table, row, 2, cells)?,
        average: optional_float(table, row, 3, cells)?,
        average_finished: optional_float(table, row, 4, cells)?,
    })
}

fn maps_row(row: usize, cells: &[ElementRef<'_>]) -> Result<MapRow, ExtractError> {
    let table = BoardTable::Maps;
    let karma_text = cell_text(cells[5]);
    let karma_text = karma_text.trim_end_matches('%').trim_end();
    let karma = parse_float(table, row, 5, karma_text)?;
    if !KARMA_RANGE.contains(&karma) {
        return Err(invalid_number(table, row, 5, karma_text));
    }

    let map_name = styled_name(table, row, 0, cells)?;
    let author = styled_name(table, row, 1, cells)?;
    let holder = styled_name(table, row, 3, cells)?;
    Ok(MapRow {
        map_name: map_name.plain_text(),
        map_name_formatted: map_name.to_markup(),
        map_uid: map_uid(cells[0]).ok_or(ExtractError::MissingMapUid { row })?,
        author_name: author.plain_text(),
        author_name_formatted: author.to_markup(),
        record_time: cell_text(cells[2]),
        record_holder: holder.plain_text(),
        record_holder_formatted: holder.to_markup(),
        finishes: number(table, row, 4, cells)?,
        karma,
    })
}

/// Reads the map UID from the first link following the map name link.
///
/// Everything after the literal `uid=` in its `href` is the UID.
fn map_uid(cell: ElementRef<'_>) -> Option<String> {
    let name = name_link(cell)?;
    let href = name
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "a")?
        .value()
        .attr("href")?;
    let (_, uid) = href.split_once("uid=")?;
    (!uid.is_empty()).then(|| uid.to_string())
}

fn styled_name(
    table: BoardTable,
    row: usize,
    column: usize,
    cells: &[ElementRef<'_>],
) -> Result<FormattedName, ExtractError> {
    parse_runs(cells[column]).map_err(|source: TranscodeError| ExtractError::Transcode {
        table,
        row,
        column,
        source,
    })
}

fn cell_text(cell: ElementRef<'_>) -> String {
    let text: String = cell.text().collect();
    replace_nbsp(&text).trim().to_string()
}

fn number<T: FromStr>(
    table: BoardTable,
    row: usize,
    column: usize,
    cells: &[ElementRef<'_>],
) -> Result<T, ExtractError> {
    parse_number(table, row, column, &cell_text(cells[column]))
}

/// Missing cells and the `-` placeholder both read as `None`.
fn optional_float(
    table: BoardTable,
    row: usize,
    column: usize,
    cells: &[ElementRef<'_>],
) -> Result<Option<f64>, ExtractError> {
    let Some(cell) = cells.get(column) else {
        return Ok(None);
    };
    let text = cell_text(*cell);
    if text.is_empty() || text == "-" {
        return Ok(None);
    }
    parse_float(table, row, column, &text).map(Some)
}

fn parse_number<T: FromStr>(
    table: BoardTable,
    row: usize,
    column: usize,
    text: &str,
) -> Result<T, ExtractError> {
    text.parse::<T>().map_err(|_| invalid_number(table, row, column, text))
}

/// `NaN` and infinities parse as `f64` but cannot be cached as JSON.
fn parse_float(
    table: BoardTable,
    row: usize,
    column: usize,
    text: &str,
) -> Result<f64, ExtractError> {
    let value: f64 = parse_number(table, row, column, text)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid_number(table, row, column, text))
    }
}

fn invalid_number(table: BoardTable, row: usize, column: usize, text: &str) -> ExtractError {
    ExtractError::InvalidNumber {
        table,
        row,
        column,
        value: text.to_string(),
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
