use serde_json::{json, Value};
use thiserror::Error;

use crate::llm_client::LlmError;

/// Extraction-level error type.
///
/// Only failures that make the whole feature vector impossible live here.
/// Sub-extraction problems (one bad date, one missing section, a grammar
/// service timeout) degrade a single field to its default and never surface.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Document could not be read: {0}")]
    DocumentRead(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ExtractionError {
    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ExtractionError::DocumentRead(_) => "DOCUMENT_READ_ERROR",
            ExtractionError::Validation(_) => "VALIDATION_ERROR",
            ExtractionError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            ExtractionError::Encoder(_) => "ENCODER_ERROR",
            ExtractionError::Classifier(_) => "CLASSIFIER_ERROR",
            ExtractionError::Io(_) => "IO_ERROR",
            ExtractionError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller supplied bad input, as opposed to a broken environment.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ExtractionError::DocumentRead(_) | ExtractionError::Validation(_)
        )
    }

    /// JSON error envelope printed by the CLI.
    pub fn to_envelope(&self) -> Value {
        match self {
            ExtractionError::Internal(e) => tracing::error!("Internal error: {e:?}"),
            ExtractionError::ModelUnavailable(msg) => tracing::error!("Model unavailable: {msg}"),
            _ => {}
        }

        json!({
            "error": {
                "code": self.code(),
                "message": self.to_string()
            }
        })
    }
}

impl From<LlmError> for ExtractionError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::ModelMissing(model) => {
                ExtractionError::ModelUnavailable(format!("model '{model}' is not installed"))
            }
            other => ExtractionError::Encoder(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_read_is_input_error() {
        let err = ExtractionError::DocumentRead("zero pages".to_string());
        assert!(err.is_input_error());
        assert_eq!(err.code(), "DOCUMENT_READ_ERROR");
    }

    #[test]
    fn test_model_missing_maps_to_model_unavailable() {
        let err: ExtractionError = LlmError::ModelMissing("all-minilm".to_string()).into();
        assert!(matches!(err, ExtractionError::ModelUnavailable(_)));
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_envelope_shape() {
        let err = ExtractionError::Validation("job description cannot be empty".to_string());
        let envelope = err.to_envelope();
        assert_eq!(envelope["error"]["code"], "VALIDATION_ERROR");
        assert!(envelope["error"]["message"]
            .as_str()
            .unwrap()
            .contains("job description"));
    }
}
