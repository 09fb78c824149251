//! Leaderboard records and the cached snapshot envelope.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The two logical tables scraped from the event site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardTable {
    Results,
    Maps,
}

impl BoardTable {
    pub const ALL: [BoardTable; 2] = [BoardTable::Results, BoardTable::Maps];

    /// Name of the snapshot record in the cache. One record per table.
    #[must_use]
    pub fn cache_key(self) -> &'static str {
        match self {
            BoardTable::Results => "cotd_leaderboard_results",
            BoardTable::Maps => "cotd_leaderboard_maps",
        }
    }

    /// Minimum number of `<td>` cells a data row of this table must carry.
    #[must_use]
    pub fn min_cells(self) -> usize {
        match self {
            BoardTable::Results => 3,
            BoardTable::Maps => 6,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BoardTable::Results => "results",
            BoardTable::Maps => "maps",
        }
    }
}

impl fmt::Display for BoardTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoardTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "results" => Ok(BoardTable::Results),
            "maps" => Ok(BoardTable::Maps),
            other => Err(format!("unknown table \"{other}\" (expected results or maps)")),
        }
    }
}

/// What the extractor does with a row that has too few cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedRowPolicy {
    /// Fail the whole batch; nothing is cached for that table this cycle.
    #[default]
    Abort,
    /// Drop the short row and keep going.
    Skip,
}

impl FromStr for MalformedRowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(MalformedRowPolicy::Abort),
            "skip" => Ok(MalformedRowPolicy::Skip),
            other => Err(format!("expected \"abort\" or \"skip\", got \"{other}\"")),
        }
    }
}

/// One player line of the results leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub rank: u32,
    /// Display name with styling stripped.
    pub nickname: String,
    /// Display name in `$`-escape rich-text markup.
    pub name_formatted: String,
    pub finishes: u32,
    pub average: Option<f64>,
    pub average_finished: Option<f64>,
}

/// One line of the maps table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRow {
    pub map_name: String,
    pub map_name_formatted: String,
    pub map_uid: String,
    pub author_name: String,
    pub author_name_formatted: String,
    /// Kept exactly as displayed, e.g. `00:42.117`.
    pub record_time: String,
    pub record_holder: String,
    pub record_holder_formatted: String,
    pub finishes: u32,
    /// 0 to 100.
    pub karma: f64,
}

/// The latest extraction result for one table, as persisted in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Ordered rows exactly as they appeared in the source table.
    pub entries: serde_json::Value,
    /// Unix time in seconds (fractional) when the snapshot was taken.
    pub ts: f64,
    /// Seconds consumers should wait before expecting a newer snapshot.
    pub min_refresh_period: u64,
}

impl Snapshot {
    /// Serializes `entries` and stamps the snapshot with `taken_at`.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if a row cannot be serialized.
    pub fn new<T: Serialize>(
        entries: &[T],
        taken_at: DateTime<Utc>,
        min_refresh_period: u64,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            entries: serde_json::to_value(entries)?,
            ts: unix_seconds(taken_at),
            min_refresh_period,
        })
    }

    /// Number of rows, or 0 when `entries` is not an array.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.as_array().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes the rows back into typed records.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the stored rows do not match `T`.
    pub fn entries_as<T: DeserializeOwned>(&self) -> Result<Vec<T>, serde_json::Error> {
        serde_json::from_value(self.entries.clone())
    }

    #[must_use]
    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        #[allow(clippy::cast_possible_truncation)]
        let millis = (self.ts * 1000.0).round() as i64;
        Utc.timestamp_millis_opt(millis).single()
    }

    #[must_use]
    pub fn age_secs(&self, now: DateTime<Utc>) -> f64 {
        (unix_seconds(now) - self.ts).max(0.0)
    }

    /// A snapshot older than two refresh periods means refreshes are failing.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        #[allow(clippy::cast_precision_loss)]
        let limit = (self.min_refresh_period * 2) as f64;
        self.age_secs(now) > limit
    }
}

#[allow(clippy::cast_precision_loss)]
fn unix_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}
