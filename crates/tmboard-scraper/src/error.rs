use thiserror::Error;
use tmboard_core::BoardTable;

/// Errors raised while converting one styled name cell to `$` markup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscodeError {
    #[error("unexpected <{tag}> inside name link (only <span> and text are allowed)")]
    UnexpectedTagInLink { tag: String },

    #[error("unexpected {kind} node inside name link")]
    UnexpectedNodeType { kind: &'static str },

    #[error("unrecognized style property \"{property}\"")]
    UnrecognizedStyleProperty { property: String },

    #[error("unexpected color format \"{value}\" (expected #rrggbb)")]
    UnexpectedColorFormat { value: String },
}

/// Errors raised while walking table rows into typed records.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed {table} row {row}: {cells} cells, expected at least {expected}")]
    MalformedRow {
        table: BoardTable,
        row: usize,
        cells: usize,
        expected: usize,
    },

    #[error("{table} row {row}, column {column}: \"{value}\" is not a valid number")]
    InvalidNumber {
        table: BoardTable,
        row: usize,
        column: usize,
        value: String,
    },

    #[error("maps row {row}: no link with a uid= parameter next to the map name")]
    MissingMapUid { row: usize },

    #[error("{table} row {row}, column {column}: {source}")]
    Transcode {
        table: BoardTable,
        row: usize,
        column: usize,
        #[source]
        source: TranscodeError,
    },

    #[error("invalid row selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Errors surfaced by the page fetcher.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}
