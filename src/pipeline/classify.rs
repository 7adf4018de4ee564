// src/pipeline/classify.rs

//! Fetch failure classification.
//!
//! Connectivity is checked before anything else: an offline device gets
//! `NoConnection` whatever the underlying error says, since that is the
//! outcome the caller can act on.

use crate::models::IngestOutcome;
use crate::services::FetchError;

/// Map a fetch failure, and whether the network is reachable, to an outcome.
///
/// Any payload received travels inside `error`.
pub fn classify(error: &FetchError, online: bool) -> IngestOutcome {
    if !online || matches!(error, FetchError::Connect(_)) {
        return IngestOutcome::NoConnection;
    }

    match error {
        FetchError::Decode { .. } => IngestOutcome::InvalidPayload,
        FetchError::Transport(_) => IngestOutcome::NoData,
        FetchError::Status { payload, .. } if payload.is_empty() => IngestOutcome::NoData,
        FetchError::Status { code, .. } => {
            IngestOutcome::Unknown(format!("server answered with status {code}"))
        }
        FetchError::Api { code, message } => IngestOutcome::Unknown(format!("{code}: {message}")),
        FetchError::Other(detail) => IngestOutcome::Unknown(detail.clone()),
        FetchError::Connect(_) => IngestOutcome::NoConnection,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_errors() -> Vec<FetchError> {
        vec![
            FetchError::Connect("refused".into()),
            FetchError::Transport("reset".into()),
            FetchError::Decode {
                payload: b"{".to_vec(),
                message: "EOF while parsing".into(),
            },
            FetchError::Status {
                code: 500,
                payload: b"oops".to_vec(),
            },
            FetchError::Api {
                code: "rateLimited".into(),
                message: "slow down".into(),
            },
            FetchError::Other("weird".into()),
        ]
    }

    #[test]
    fn offline_always_wins() {
        for error in all_errors() {
            assert_eq!(classify(&error, false), IngestOutcome::NoConnection, "{error:?}");
        }
    }

    #[test]
    fn connect_failure_is_no_connection() {
        let error = FetchError::Connect("dns".into());
        assert_eq!(classify(&error, true), IngestOutcome::NoConnection);
    }

    #[test]
    fn parse_failure_is_invalid_payload() {
        let error = FetchError::Decode {
            payload: b"<html>".to_vec(),
            message: "expected value".into(),
        };
        assert_eq!(classify(&error, true), IngestOutcome::InvalidPayload);
    }

    #[test]
    fn transport_without_payload_is_no_data() {
        assert_eq!(
            classify(&FetchError::Transport("timeout".into()), true),
            IngestOutcome::NoData
        );
        let empty = FetchError::Status {
            code: 502,
            payload: Vec::new(),
        };
        assert_eq!(classify(&empty, true), IngestOutcome::NoData);
    }

    #[test]
    fn other_errors_keep_detail() {
        let error = FetchError::Api {
            code: "apiKeyInvalid".into(),
            message: "Your API key is invalid.".into(),
        };
        assert_eq!(
            classify(&error, true),
            IngestOutcome::Unknown("apiKeyInvalid: Your API key is invalid.".into())
        );
    }
}
