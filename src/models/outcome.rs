//! Consumer-facing result of one ingest.

use std::fmt;

use serde::Serialize;

/// Notification delivered exactly once per ingest call.
///
/// Carries only the classified tag (plus detail for `Unknown`), never a raw
/// transport error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Store replaced with this many articles
    Success(usize),
    /// No reachable network; stored articles left untouched
    NoConnection,
    /// A payload arrived but could not be parsed
    InvalidPayload,
    /// The transport failed before any payload arrived
    NoData,
    /// Anything else, with the original detail for diagnostics
    Unknown(String),
}

impl IngestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, IngestOutcome::Success(_))
    }

    /// Whether a manual refresh alone can fix this outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IngestOutcome::NoConnection | IngestOutcome::NoData)
    }

    /// Short heading for a user-visible notice.
    pub fn title(&self) -> &'static str {
        match self {
            IngestOutcome::Success(_) => "Breaking news",
            IngestOutcome::NoConnection => "No internet connection",
            IngestOutcome::InvalidPayload => "Downloaded data is in wrong format",
            IngestOutcome::NoData => "No data has been downloaded",
            IngestOutcome::Unknown(_) => "Unknown error",
        }
    }

    /// Body text for a user-visible notice.
    pub fn message(&self) -> String {
        match self {
            IngestOutcome::Success(count) => format!("Fetched {count} articles"),
            IngestOutcome::NoConnection => {
                "There is no internet connection, data cannot be downloaded now.".to_string()
            }
            IngestOutcome::InvalidPayload => "Downloaded data is in wrong format therefore \
                cannot be parsed! Check if correct JSON file has been downloaded."
                .to_string(),
            IngestOutcome::NoData => "No data has been downloaded. Check your internet \
                connection and connection parameters!"
                .to_string(),
            IngestOutcome::Unknown(detail) => format!("Error message: {detail}"),
        }
    }
}

impl fmt::Display for IngestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title(), self.message())
    }
}
