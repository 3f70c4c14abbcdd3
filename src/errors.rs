//! Error types for the read-along engine
//!
//! Load failures are independent and partial: each asset reports its own
//! failure and none of them aborts the session. Anchor validation failures
//! are plain return values consumed by the editor UI.

use serde::Serialize;
use thiserror::Error;

/// Failure to load one of the three session assets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadFailure {
    /// The text parsed to zero pages or could not be fetched
    #[error("text failed to load: {0}")]
    Text(String),

    /// The audio transport reported a decode or network error
    #[error("audio failed to load: {0}")]
    Audio(String),

    /// The alignment parsed to an empty table or could not be fetched
    #[error("alignment failed to load: {0}")]
    Alignment(String),
}

/// Internal parse errors. Public parsers degrade instead of returning these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Source is not well-formed XML
    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    /// Required structural element is missing
    #[error("Missing required element: {0}")]
    MissingRequiredElement(String),
}

/// Short description of an anchor used in diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorSummary {
    pub anchor_id: String,
    pub unit_id: String,
    pub text: String,
    pub time_ms: u64,
}

/// Reasons an alignment export is refused
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExportError {
    #[error("There is no anchor setup currently.")]
    NoAnchorsDefined,

    #[error(
        "The text \"{}\" is earlier than the previous text \"{}\"",
        offending.text,
        previous.text
    )]
    AnchorOrderingViolation {
        offending: AnchorSummary,
        previous: AnchorSummary,
    },
}

/// Errors from anchor edit operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorEditError {
    #[error("unit '{0}' does not exist in the document")]
    UnknownUnit(String),

    #[error("unit '{0}' is not a word")]
    NotAWord(String),

    #[error("word '{0}' has no alignment entry")]
    Unaligned(String),

    #[error("no anchor with id '{0}'")]
    UnknownAnchor(String),

    #[error("anchor mode is not active")]
    AnchorModeInactive,

    #[error("marker for anchor '{0}' could not be placed in the document")]
    MarkerRejected(String),
}

/// Configuration decoding failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}
