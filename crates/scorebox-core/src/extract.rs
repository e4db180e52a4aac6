//! Result extraction from the result channel.

use crate::error::StageError;
use crate::pipeline::StageOutcome;
use std::path::Path;
use tracing::{error, info};

/// Parse the result channel contents and return the score under `key`.
///
/// The contents must be a JSON object whose `key` field is a number. Any
/// other field is ignored.
pub fn parse_score(contents: &str, key: &str) -> Result<f64, StageError> {
    let value: serde_json::Value =
        serde_json::from_str(contents).map_err(|e| StageError::ResultProtocol {
            reason: format!("result is not valid JSON: {}", e),
        })?;

    let object = value.as_object().ok_or_else(|| StageError::ResultProtocol {
        reason: "result is not a JSON object".to_string(),
    })?;

    let field = object.get(key).ok_or_else(|| StageError::ResultProtocol {
        reason: format!("result has no '{}' field", key),
    })?;

    field.as_f64().ok_or_else(|| StageError::ResultProtocol {
        reason: format!("'{}' is not a number: {}", key, field),
    })
}

/// Read the result channel at `path`.
pub async fn extract_score(path: &Path, key: &str) -> StageOutcome<f64> {
    let outcome = match tokio::fs::read_to_string(path).await {
        Ok(contents) => parse_score(&contents, key),
        Err(e) => Err(StageError::ResultProtocol {
            reason: format!("cannot read {}: {}", path.display(), e),
        }),
    };

    match outcome {
        Ok(score) => {
            info!(score, "Got the job results");
            StageOutcome::Continue(score)
        }
        Err(e) => {
            error!(error = %e, "Got an error while fetching the results");
            StageOutcome::Abort(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_score() {
        assert_eq!(parse_score(r#"{"perf": 0.99}"#, "perf").unwrap(), 0.99);
    }

    #[test]
    fn test_parse_integer_score() {
        assert_eq!(parse_score(r#"{"perf": 3}"#, "perf").unwrap(), 3.0);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let score = parse_score(r#"{"perf": -1.5, "notes": "warm cache"}"#, "perf").unwrap();
        assert_eq!(score, -1.5);
    }

    #[test]
    fn test_empty_file_is_protocol_error() {
        let err = parse_score("", "perf").unwrap_err();
        assert!(matches!(err, StageError::ResultProtocol { .. }));
    }

    #[test]
    fn test_missing_field_is_protocol_error() {
        let err = parse_score(r#"{"score": 1.0}"#, "perf").unwrap_err();
        assert!(err.to_string().contains("no 'perf' field"));
    }

    #[test]
    fn test_non_numeric_field_is_protocol_error() {
        let err = parse_score(r#"{"perf": "0.9"}"#, "perf").unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }

    #[test]
    fn test_non_object_is_protocol_error() {
        let err = parse_score("[0.9]", "perf").unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }

    #[tokio::test]
    async fn test_extract_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = extract_score(&dir.path().join("perf.json"), "perf").await;
        assert!(matches!(
            outcome,
            StageOutcome::Abort(StageError::ResultProtocol { .. })
        ));
    }

    #[tokio::test]
    async fn test_extract_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perf.json");
        std::fs::write(&path, r#"{"perf": 0.5}"#).unwrap();

        match extract_score(&path, "perf").await {
            StageOutcome::Continue(score) => assert_eq!(score, 0.5),
            StageOutcome::Abort(e) => panic!("unexpected abort: {e}"),
        }
    }
}
